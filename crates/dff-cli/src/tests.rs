use std::path::PathBuf;

use clap::Parser;

use super::*;
use crate::export::ExportFormat;

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["dff-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli = Cli::try_parse_from(["dff-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["dff-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn sync_prices_defaults_to_all_rows_live() {
    let cli =
        Cli::try_parse_from(["dff-cli", "sync", "prices"]).expect("expected valid cli args");

    let Some(Commands::Sync {
        command:
            SyncCommands::Prices {
                category,
                limit,
                dry_run,
            },
    }) = cli.command
    else {
        panic!("expected sync prices");
    };
    assert!(category.is_none());
    assert!(limit.is_none());
    assert!(!dry_run);
}

#[test]
fn sync_prices_accepts_filters_and_dry_run() {
    let cli = Cli::try_parse_from([
        "dff-cli",
        "sync",
        "prices",
        "--category",
        "Roasters & Turkeys",
        "--limit",
        "5",
        "--dry-run",
    ])
    .expect("expected valid cli args");

    let Some(Commands::Sync {
        command:
            SyncCommands::Prices {
                category,
                limit,
                dry_run,
            },
    }) = cli.command
    else {
        panic!("expected sync prices");
    };
    assert_eq!(category.as_deref(), Some("Roasters & Turkeys"));
    assert_eq!(limit, Some(5));
    assert!(dry_run);
}

#[test]
fn sync_prices_rejects_non_numeric_limit() {
    let result = Cli::try_parse_from(["dff-cli", "sync", "prices", "--limit", "all"]);
    assert!(result.is_err());
}

#[test]
fn export_pricelist_defaults_to_xlsx() {
    let cli =
        Cli::try_parse_from(["dff-cli", "export", "pricelist"]).expect("expected valid cli args");

    let Some(Commands::Export {
        command: ExportCommands::Pricelist { format, output },
    }) = cli.command
    else {
        panic!("expected export pricelist");
    };
    assert_eq!(format, ExportFormat::Xlsx);
    assert!(output.is_none());
}

#[test]
fn export_pricelist_accepts_csv_format_and_output_path() {
    let cli = Cli::try_parse_from([
        "dff-cli",
        "export",
        "pricelist",
        "--format",
        "csv",
        "--output",
        "/tmp/out.csv",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Export {
            command: ExportCommands::Pricelist {
                format: ExportFormat::Csv,
                ref output,
            }
        }) if output.as_deref() == Some(PathBuf::from("/tmp/out.csv").as_path())
    ));
}

#[test]
fn export_pricelist_rejects_unknown_format() {
    let result = Cli::try_parse_from(["dff-cli", "export", "pricelist", "--format", "ods"]);
    assert!(result.is_err());
}

#[test]
fn unknown_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["dff-cli", "db", "seed"]).is_err());
}
