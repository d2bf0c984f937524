//! One price-sync run: authenticate, walk the candidate rows, push each
//! row's price to every configured price list, then flush the miss log.
//!
//! Rows, price lists and remote calls are processed strictly in order. Only
//! a failed credential exchange or candidate query aborts the run; anything
//! that goes wrong for a single row or price list is logged, counted and
//! skipped.

use std::future::Future;
use std::path::PathBuf;

use dff_core::{calculate_prices, AppConfig, MarkupConfig, PriceListTarget};
use dff_db::{CandidateFilter, DbError, PricelistRow};
use dff_localline::{
    build_package_update, build_price_list_entry, AccessToken, LocalLineClient, LocalLineError,
};
use rust_decimal::Decimal;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::recorder::{MissingLinkRecorder, RecorderError};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("LocalLine authentication failed: {0}")]
    Authentication(#[source] LocalLineError),
    #[error("failed to load sync candidates: {0}")]
    Store(#[from] DbError),
    #[error(transparent)]
    Recorder(#[from] RecorderError),
}

/// Where the store side of a run comes from.
///
/// Implemented for [`sqlx::PgPool`]; tests supply rows from memory.
pub trait CandidateSource {
    fn sync_candidates(
        &self,
        filter: CandidateFilter<'_>,
    ) -> impl Future<Output = Result<Vec<PricelistRow>, DbError>> + Send;
}

impl CandidateSource for sqlx::PgPool {
    fn sync_candidates(
        &self,
        filter: CandidateFilter<'_>,
    ) -> impl Future<Output = Result<Vec<PricelistRow>, DbError>> + Send {
        dff_db::list_sync_candidates(self, filter)
    }
}

impl CandidateSource for Vec<PricelistRow> {
    fn sync_candidates(
        &self,
        filter: CandidateFilter<'_>,
    ) -> impl Future<Output = Result<Vec<PricelistRow>, DbError>> + Send {
        let rows: Vec<PricelistRow> = self
            .iter()
            .filter(|r| r.local_line_connected_vendor_product_id.is_some())
            .filter(|r| filter.category.is_none_or(|c| r.category == c))
            .take(filter.limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(0)))
            .cloned()
            .collect();
        std::future::ready(Ok(rows))
    }
}

/// Lifecycle of one [`SyncOrchestrator::run`].
///
/// `Failed` is entered when authentication fails, when the candidate query
/// that follows it fails, or when the miss log cannot be written during
/// `Flushing`. Row and price-list failures never leave `ProcessingRows`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    AuthenticatingCredential,
    ProcessingRows,
    Flushing,
    Done,
    Failed,
}

/// Everything a run needs besides the store and the HTTP client.
#[derive(Clone)]
pub struct SyncSettings {
    pub markups: MarkupConfig,
    pub price_lists: Vec<PriceListTarget>,
    pub username: String,
    pub password: String,
    pub missing_links_path: PathBuf,
    /// Compute and log payloads without patching LocalLine.
    pub dry_run: bool,
}

impl SyncSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig, dry_run: bool) -> Self {
        Self {
            markups: config.markups,
            price_lists: config.price_lists.clone(),
            username: config.ll_username.clone(),
            password: config.ll_password.clone(),
            missing_links_path: config.missing_links_path.clone(),
            dry_run,
        }
    }
}

impl std::fmt::Debug for SyncSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSettings")
            .field("markups", &self.markups)
            .field("price_lists", &self.price_lists)
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("missing_links_path", &self.missing_links_path)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

/// Counters for a finished (or cancelled) run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub rows_seen: usize,
    /// Rows skipped before any remote call (bad unit, weights, missing id).
    pub rows_failed: usize,
    /// Price-list entries patched, or that would have been in a dry run.
    pub entries_updated: usize,
    pub misses: usize,
    pub remote_failures: usize,
    pub misses_flushed: usize,
    pub cancelled: bool,
}

enum TargetOutcome {
    Updated,
    Missed,
    /// The pair was recorded earlier in this run by another row.
    AlreadyMissed,
    RemoteFailure,
}

pub struct SyncOrchestrator<'a> {
    client: &'a LocalLineClient,
    settings: SyncSettings,
    recorder: MissingLinkRecorder,
    state: RunState,
}

impl<'a> SyncOrchestrator<'a> {
    #[must_use]
    pub fn new(client: &'a LocalLineClient, settings: SyncSettings) -> Self {
        let recorder = MissingLinkRecorder::new(settings.missing_links_path.clone());
        Self {
            client,
            settings,
            recorder,
            state: RunState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    #[must_use]
    pub fn recorder(&self) -> &MissingLinkRecorder {
        &self.recorder
    }

    /// Runs one sync over the rows `source` yields for `filter`.
    ///
    /// `cancel` is checked between rows; once it fires the remaining rows are
    /// skipped, the miss log is still flushed, and the report is marked
    /// cancelled.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Authentication`] if no access token can be obtained.
    /// - [`SyncError::Store`] if the candidate query fails.
    /// - [`SyncError::Recorder`] if the miss log cannot be written; the state
    ///   moves from `Flushing` to `Failed` and the counters are discarded.
    pub async fn run<S: CandidateSource>(
        &mut self,
        source: &S,
        filter: CandidateFilter<'_>,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        self.state = RunState::AuthenticatingCredential;
        let token = match self
            .client
            .authenticate(&self.settings.username, &self.settings.password)
            .await
        {
            Ok(token) => token,
            Err(e) => {
                self.state = RunState::Failed;
                return Err(SyncError::Authentication(e));
            }
        };

        let rows = match source.sync_candidates(filter).await {
            Ok(rows) => rows,
            Err(e) => {
                self.state = RunState::Failed;
                return Err(e.into());
            }
        };
        tracing::info!(
            rows = rows.len(),
            price_lists = self.settings.price_lists.len(),
            dry_run = self.settings.dry_run,
            "price sync starting"
        );

        self.state = RunState::ProcessingRows;
        let mut report = SyncReport::default();

        for row in &rows {
            if cancel.is_cancelled() {
                tracing::warn!(
                    processed = report.rows_seen,
                    remaining = rows.len() - report.rows_seen,
                    "price sync cancelled"
                );
                report.cancelled = true;
                break;
            }
            report.rows_seen += 1;
            self.process_row(&token, row, &mut report).await;
        }

        self.state = RunState::Flushing;
        report.misses_flushed = match self.recorder.flush_async().await {
            Ok(n) => n,
            Err(e) => {
                self.state = RunState::Failed;
                return Err(e.into());
            }
        };

        self.state = RunState::Done;
        tracing::info!(
            rows_seen = report.rows_seen,
            rows_failed = report.rows_failed,
            entries_updated = report.entries_updated,
            misses = report.misses,
            remote_failures = report.remote_failures,
            cancelled = report.cancelled,
            "price sync finished"
        );
        Ok(report)
    }

    async fn process_row(
        &mut self,
        token: &AccessToken,
        row: &PricelistRow,
        report: &mut SyncReport,
    ) {
        let Some(product_id) = row.local_line_connected_vendor_product_id else {
            tracing::warn!(row_id = row.id, "row has no LocalLine product id, skipping");
            report.rows_failed += 1;
            return;
        };

        let bundle = match calculate_prices(&row.price_inputs(), &self.settings.markups) {
            Ok(bundle) => bundle,
            Err(e) => {
                tracing::warn!(
                    row_id = row.id,
                    product = %row.product_name,
                    error = %e,
                    "price calculation failed, skipping row"
                );
                report.rows_failed += 1;
                return;
            }
        };

        let targets = self.settings.price_lists.clone();
        for target in &targets {
            match self
                .sync_target(token, product_id, bundle.purchase_price, target)
                .await
            {
                TargetOutcome::Updated => report.entries_updated += 1,
                TargetOutcome::Missed => report.misses += 1,
                TargetOutcome::RemoteFailure => report.remote_failures += 1,
                TargetOutcome::AlreadyMissed => {}
            }
        }
    }

    async fn sync_target(
        &mut self,
        token: &AccessToken,
        product_id: i64,
        basis: Decimal,
        target: &PriceListTarget,
    ) -> TargetOutcome {
        let product = match self.client.get_product(token, product_id).await {
            Ok(product) => product,
            Err(e) => {
                tracing::error!(
                    product_id,
                    price_list_id = target.id,
                    error = %e,
                    "failed to fetch LocalLine product"
                );
                return TargetOutcome::RemoteFailure;
            }
        };

        let Some(package) = product.first_package() else {
            tracing::error!(product_id, "LocalLine product has no package");
            return TargetOutcome::RemoteFailure;
        };

        let Some(entry) = build_price_list_entry(basis, product.entry_for(target.id), target.markup)
        else {
            tracing::warn!(
                product_id,
                product = %product.name,
                price_list = %target.name,
                price_list_id = target.id,
                "product is not on price list"
            );
            let recorded = self.recorder.record(
                product_id,
                &product.name,
                target.id,
                target.missing_description(),
            );
            return if recorded {
                TargetOutcome::Missed
            } else {
                TargetOutcome::AlreadyMissed
            };
        };

        let calculated = entry.calculated_value;
        let patch = build_package_update(package, basis, entry);

        if self.settings.dry_run {
            tracing::info!(
                product_id,
                price_list_id = target.id,
                basis = %basis,
                calculated = %calculated,
                payload = %serde_json::to_string(&patch).unwrap_or_default(),
                "dry run: would update price list entry"
            );
            return TargetOutcome::Updated;
        }

        match self.client.apply_package_update(token, product_id, &patch).await {
            Ok(()) => {
                tracing::info!(
                    product_id,
                    product = %product.name,
                    price_list_id = target.id,
                    basis = %basis,
                    calculated = %calculated,
                    "price list entry updated"
                );
                TargetOutcome::Updated
            }
            Err(e) => {
                tracing::error!(
                    product_id,
                    price_list_id = target.id,
                    error = %e,
                    "price list update failed"
                );
                TargetOutcome::RemoteFailure
            }
        }
    }
}
