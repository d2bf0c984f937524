//! `sync` command handlers.

use clap::Subcommand;
use dff_db::CandidateFilter;
use dff_localline::LocalLineClient;
use dff_sync::{SyncOrchestrator, SyncReport, SyncSettings};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Subcommand)]
pub enum SyncCommands {
    /// Recompute prices and update LocalLine price-list entries
    Prices {
        /// Only rows in this category (e.g. "Roasters & Turkeys")
        #[arg(long)]
        category: Option<String>,
        /// Stop after this many rows
        #[arg(long)]
        limit: Option<i64>,
        /// Log the payloads without patching LocalLine
        #[arg(long)]
        dry_run: bool,
    },
}

/// Runs one price sync against the rows selected by `category` and `limit`.
///
/// # Errors
///
/// Returns an error if the LocalLine client cannot be built, authentication
/// fails, the candidate query fails, or the miss log cannot be written.
/// Per-row and per-list failures are logged and counted, not propagated.
pub(crate) async fn run_sync_prices(
    pool: &sqlx::PgPool,
    config: &dff_core::AppConfig,
    category: Option<&str>,
    limit: Option<i64>,
    dry_run: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    if limit.is_some_and(|l| l < 1) {
        anyhow::bail!("--limit must be at least 1");
    }

    let client = LocalLineClient::from_app_config(config)?;
    let settings = SyncSettings::from_app_config(config, dry_run);
    let filter = CandidateFilter { category, limit };

    let mut orchestrator = SyncOrchestrator::new(&client, settings);
    let report = orchestrator.run(pool, filter, cancel).await?;

    println!("{}", summarize(&report, dry_run));
    if report.misses_flushed > 0 {
        println!(
            "missing price-list links written to {}",
            orchestrator.recorder().path().display()
        );
    }
    Ok(())
}

fn summarize(report: &SyncReport, dry_run: bool) -> String {
    let verb = if dry_run { "would update" } else { "updated" };
    let mut line = format!(
        "{} row(s): {verb} {} entr(ies), {} missing link(s), {} remote failure(s), {} row(s) skipped",
        report.rows_seen,
        report.entries_updated,
        report.misses,
        report.remote_failures,
        report.rows_failed,
    );
    if report.cancelled {
        line.push_str(" (cancelled)");
    }
    line
}
