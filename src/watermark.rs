//! Persisted "last processed row" counter for the master sheet.
//!
//! The watermark only moves forward: `advance` stores `max(current, row)`.
//! It is process-local state. Two machines, or a store that gets deleted,
//! will re-copy rows.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

pub trait WatermarkStore: Send + Sync {
    /// Last processed row number.
    fn load(&self) -> Result<u64, SyncError>;

    /// Move the watermark to `row` if that is ahead of the stored value.
    /// Returns the value stored afterwards.
    fn advance(&self, row: u64) -> Result<u64, SyncError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WatermarkFile {
    last_processed_row: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

/// JSON file store, written atomically via a temp file in the same directory.
pub struct FileWatermarkStore {
    path: PathBuf,
    initial: u64,
    lock: Mutex<()>,
}

impl FileWatermarkStore {
    /// `initial` is returned while no file exists; normally the header row
    /// count so the first scan starts at the first data row.
    pub fn new(path: impl Into<PathBuf>, initial: u64) -> Self {
        Self {
            path: path.into(),
            initial,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<u64, SyncError> {
        if !self.path.exists() {
            return Ok(self.initial);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let file: WatermarkFile = serde_json::from_str(&content).map_err(|e| {
            SyncError::Storage(format!("{}: {}", self.path.display(), e))
        })?;
        Ok(file.last_processed_row.max(self.initial))
    }

    fn write(&self, row: u64) -> Result<(), SyncError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
        }

        let body = serde_json::to_string_pretty(&WatermarkFile {
            last_processed_row: row,
            updated_at: Some(Utc::now()),
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(body.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| SyncError::Storage(format!("{}: {}", self.path.display(), e)))?;
        Ok(())
    }
}

impl WatermarkStore for FileWatermarkStore {
    fn load(&self) -> Result<u64, SyncError> {
        let _guard = self.lock.lock();
        self.read()
    }

    fn advance(&self, row: u64) -> Result<u64, SyncError> {
        let _guard = self.lock.lock();
        let current = self.read()?;
        if row <= current {
            return Ok(current);
        }
        self.write(row)?;
        Ok(row)
    }
}

/// Non-persistent store.
#[derive(Debug, Default)]
pub struct MemoryWatermarkStore {
    value: Mutex<u64>,
}

impl MemoryWatermarkStore {
    pub fn new(initial: u64) -> Self {
        Self {
            value: Mutex::new(initial),
        }
    }
}

impl WatermarkStore for MemoryWatermarkStore {
    fn load(&self) -> Result<u64, SyncError> {
        Ok(*self.value.lock())
    }

    fn advance(&self, row: u64) -> Result<u64, SyncError> {
        let mut value = self.value.lock();
        if row > *value {
            *value = row;
        }
        Ok(*value)
    }
}
