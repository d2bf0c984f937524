//! In-memory log of missing price-list links, appended to a CSV at run end.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use thiserror::Error;

/// `MM/DD/YYYY h:mm AM/PM`, local time.
const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %-I:%M %p";

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("failed to write missing-link log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode missing-link row: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing-link writer task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// One row of the missing-link CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingLink {
    pub timestamp: String,
    pub product_id: i64,
    pub product_name: String,
    pub missing_price_list: String,
}

/// Accumulates misses for a run. Owned by the orchestrator.
#[derive(Debug)]
pub struct MissingLinkRecorder {
    path: PathBuf,
    records: Vec<MissingLink>,
    /// `(product_id, price_list_id)` pairs already recorded this run.
    seen: HashSet<(i64, i64)>,
}

impl MissingLinkRecorder {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Vec::new(),
            seen: HashSet::new(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records that `product_id` has no entry on `price_list_id`.
    ///
    /// Returns `false` (and records nothing) if the pair was already recorded
    /// during this run.
    pub fn record(
        &mut self,
        product_id: i64,
        product_name: &str,
        price_list_id: i64,
        missing_price_list: String,
    ) -> bool {
        if !self.seen.insert((product_id, price_list_id)) {
            return false;
        }
        self.records.push(MissingLink {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            product_id,
            product_name: product_name.to_owned(),
            missing_price_list,
        });
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn records(&self) -> &[MissingLink] {
        &self.records
    }

    /// Appends every recorded miss to the CSV and returns the number of rows
    /// written.
    ///
    /// The header row is written only when the file is new or empty. With no
    /// records the file is not touched. Records are kept after flushing.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::Io`] if the directory or file cannot be
    /// created or opened, or [`RecorderError::Csv`] if a row fails to write.
    pub fn flush(&self) -> Result<usize, RecorderError> {
        append_rows(&self.path, &self.records)
    }

    /// [`flush`](Self::flush) on tokio's blocking pool, for callers on the
    /// async runtime.
    ///
    /// # Errors
    ///
    /// As [`flush`](Self::flush), plus [`RecorderError::Join`] if the
    /// blocking task panics.
    pub async fn flush_async(&self) -> Result<usize, RecorderError> {
        if self.records.is_empty() {
            return Ok(0);
        }
        let path = self.path.clone();
        let records = self.records.clone();
        tokio::task::spawn_blocking(move || append_rows(&path, &records)).await?
    }
}

fn append_rows(path: &Path, records: &[MissingLink]) -> Result<usize, RecorderError> {
    if records.is_empty() {
        return Ok(0);
    }

    let io_err = |source| RecorderError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;
    let needs_header = file.metadata().map_err(io_err)?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(file);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush().map_err(io_err)?;

    tracing::info!(
        rows = records.len(),
        path = %path.display(),
        "missing price-list links written"
    );
    Ok(records.len())
}
