//! Append-only CSV audit trail of inventory page edits.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum InventoryLogError {
    #[error("inventory log I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("inventory log encoding error: {0}")]
    Csv(#[from] csv::Error),
    #[error("inventory log writer task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// One row of `inventory_updates_log.csv`.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryLogRecord {
    pub id: i64,
    #[serde(rename = "productName")]
    pub product_name: String,
    #[serde(rename = "packageName")]
    pub package_name: String,
    pub visible: bool,
    pub track_inventory: bool,
    pub stock_inventory: i32,
    pub timestamp: String,
}

impl InventoryLogRecord {
    /// Stamps the record with the current UTC time in RFC 3339 form.
    #[must_use]
    pub fn now(
        id: i64,
        product_name: &str,
        package_name: Option<&str>,
        visible: bool,
        track_inventory: bool,
        stock_inventory: i32,
    ) -> Self {
        Self {
            id,
            product_name: product_name.to_owned(),
            package_name: package_name.unwrap_or_default().to_owned(),
            visible,
            track_inventory,
            stock_inventory,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Serializes appends from concurrent requests.
#[derive(Debug)]
pub struct InventoryLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl InventoryLog {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Appends `record`, writing the header first if the file is new.
    ///
    /// The file work runs on the blocking pool; the lock keeps appends from
    /// concurrent requests in order.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryLogError`] if the file cannot be opened or written.
    pub async fn append(&self, record: &InventoryLogRecord) -> Result<(), InventoryLogError> {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        let record = record.clone();
        tokio::task::spawn_blocking(move || write_row(&path, &record)).await?
    }
}

fn write_row(path: &Path, record: &InventoryLogRecord) -> Result<(), InventoryLogError> {
    let io_err = |source| InventoryLogError::Io {
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
    writer.serialize(record)?;
    writer.flush().map_err(io_err)?;
    Ok(())
}
