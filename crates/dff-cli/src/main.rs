mod export;
mod sync;

use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::export::ExportCommands;
use crate::sync::SyncCommands;

#[derive(Debug, Parser)]
#[command(name = "dff-cli")]
#[command(about = "Farm price list: LocalLine sync, exports and database tools")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Push computed prices to LocalLine
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
    /// Render database tables to spreadsheet files
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("dff-cli: try `dff-cli --help`");
        return Ok(());
    };

    let config = dff_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = dff_db::PoolConfig::from_app_config(&config);
    let pool = dff_db::connect_pool(&config.database_url, pool_config).await?;

    let shutdown = CancellationToken::new();
    let keepalive = dff_db::spawn_keepalive(
        pool.clone(),
        Duration::from_secs(config.db_keepalive_secs),
        shutdown.clone(),
    );

    let result = match command {
        Commands::Sync {
            command:
                SyncCommands::Prices {
                    category,
                    limit,
                    dry_run,
                },
        } => {
            let cancel = shutdown.child_token();
            spawn_ctrl_c_handler(cancel.clone());
            sync::run_sync_prices(&pool, &config, category.as_deref(), limit, dry_run, &cancel)
                .await
        }
        Commands::Export {
            command: ExportCommands::Pricelist { format, output },
        } => {
            let output = output.unwrap_or_else(|| format.default_output());
            export::run_export_pricelist(&pool, &config, format, &output).await
        }
        Commands::Db {
            command: DbCommands::Ping,
        } => run_db_ping(&pool).await,
        Commands::Db {
            command: DbCommands::Migrate,
        } => run_db_migrate(&pool).await,
    };

    shutdown.cancel();
    if let Err(e) = keepalive.await {
        tracing::warn!(error = %e, "database keep-alive task ended abnormally");
    }
    pool.close().await;
    result
}

/// Cancels `token` on the first Ctrl-C so the current row finishes and the
/// miss log is still written.
fn spawn_ctrl_c_handler(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    tracing::warn!(error = %e, "failed to listen for ctrl-c");
                    return;
                }
                tracing::warn!("ctrl-c received, stopping after the current row");
                token.cancel();
            }
            () = token.cancelled() => {}
        }
    });
}

async fn run_db_ping(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    dff_db::health_check(pool).await?;
    println!("database ok");
    Ok(())
}

async fn run_db_migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let applied = dff_db::run_migrations(pool).await?;
    println!("applied {applied} migration(s)");
    Ok(())
}

#[cfg(test)]
mod tests;
