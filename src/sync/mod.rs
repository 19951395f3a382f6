//! Master → per-user appointment sync.
//!
//! One run: scan master rows below the watermark, load the user directory,
//! append each row to its owner's spreadsheet, and advance the watermark
//! after every row whether or not the append worked. Row failures are
//! counted and logged, never retried. Failing to read the master sheet or
//! the directory aborts the run.
//!
//! Modules:
//! - scanner: reads new master rows
//! - fanout: writes one row to its user's sheet
//! - poller: periodic + on-demand runs

pub mod fanout;
pub mod poller;
pub mod scanner;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::directory;
use crate::error::SyncError;
use crate::sheets_api::SheetsApi;
use crate::types::Config;
use crate::watermark::WatermarkStore;

/// A row the run could not deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowFailure {
    pub row: u64,
    pub reason: String,
}

/// Outcome of one sync run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub watermark_before: u64,
    pub watermark_after: u64,
    pub processed: u32,
    pub synced: u32,
    pub failed: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<RowFailure>,
}

impl SyncReport {
    fn start(watermark: u64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            started_at: now,
            finished_at: now,
            watermark_before: watermark,
            watermark_after: watermark,
            processed: 0,
            synced: 0,
            failed: 0,
            failures: Vec::new(),
        }
    }

    /// Nothing was read or written.
    pub fn is_noop(&self) -> bool {
        self.processed == 0 && self.watermark_after == self.watermark_before
    }

    pub fn summary(&self) -> String {
        format!(
            "processed {}, synced {}, failed {} (rows {} → {})",
            self.processed, self.synced, self.failed, self.watermark_before, self.watermark_after
        )
    }
}

/// Run the sync job once.
pub async fn run_sync_job(
    api: &dyn SheetsApi,
    store: &dyn WatermarkStore,
    config: &Config,
) -> Result<SyncReport, SyncError> {
    let watermark = store.load()?;
    let mut report = SyncReport::start(watermark);

    let batch = scanner::scan_new_rows(
        api,
        &config.master_spreadsheet_id,
        &config.master_sheet,
        watermark,
    )
    .await?;

    let Some(last_row) = batch.last_row else {
        report.finished_at = Utc::now();
        log::debug!("Sheet sync: no new rows after {}", watermark);
        return Ok(report);
    };

    if batch.rows.is_empty() {
        report.watermark_after = store.advance(last_row)?;
        report.finished_at = Utc::now();
        log::debug!("Sheet sync: only blank rows up to {}", last_row);
        return Ok(report);
    }

    let directory =
        directory::load_directory(api, &config.users_spreadsheet_id, &config.users_range).await?;

    for row in &batch.rows {
        report.processed += 1;
        match fanout::deliver_row(api, &directory, row, &config.user_sheet).await {
            Ok(target) => {
                report.synced += 1;
                log::debug!("Sheet sync: row {} → {}", row.number, target);
            }
            Err(e) => {
                report.failed += 1;
                log::warn!("Sheet sync: row {} not delivered: {}", row.number, e);
                report.failures.push(RowFailure {
                    row: row.number,
                    reason: e.to_string(),
                });
            }
        }
        report.watermark_after = store.advance(row.number)?;
    }

    // Trailing blank rows were read too; move past them.
    report.watermark_after = store.advance(last_row)?;
    report.finished_at = Utc::now();

    log::info!("Sheet sync: {}", report.summary());
    Ok(report)
}
