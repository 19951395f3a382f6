//! Reads master-sheet rows below the watermark.

use crate::error::SyncError;
use crate::sheets_api::{range, SheetsApi};
use crate::types::{APPOINTMENT_COLUMNS, EMAIL_COLUMN};

/// A master row with its 1-based sheet row number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedRow {
    pub number: u64,
    pub cells: Vec<String>,
}

impl ScannedRow {
    /// Trimmed email cell, if present.
    pub fn email(&self) -> Option<&str> {
        self.cells
            .get(EMAIL_COLUMN)
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
    }

    fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }
}

/// Rows found after the watermark.
#[derive(Debug, Clone, Default)]
pub struct ScanBatch {
    /// Non-blank rows, in sheet order.
    pub rows: Vec<ScannedRow>,
    /// Highest row number the read covered, blank rows included. `None`
    /// when nothing lies below the watermark.
    pub last_row: Option<u64>,
}

/// Read everything below `watermark` on the master tab.
///
/// Blank rows are dropped from `rows` but still count toward `last_row`,
/// so the watermark moves past them.
pub async fn scan_new_rows(
    api: &dyn SheetsApi,
    spreadsheet_id: &str,
    tab: &str,
    watermark: u64,
) -> Result<ScanBatch, SyncError> {
    let first = watermark + 1;
    let a1 = range::rows_from(tab, first, APPOINTMENT_COLUMNS);
    let raw = api.read_range(spreadsheet_id, &a1).await?;

    if raw.is_empty() {
        return Ok(ScanBatch::default());
    }

    let last_row = first + raw.len() as u64 - 1;
    let rows: Vec<ScannedRow> = raw
        .into_iter()
        .enumerate()
        .map(|(i, cells)| ScannedRow {
            number: first + i as u64,
            cells,
        })
        .filter(|row| !row.is_blank())
        .collect();

    log::debug!(
        "Sheet sync: scanned rows {}..={} ({} with data)",
        first,
        last_row,
        rows.len()
    );

    Ok(ScanBatch {
        rows,
        last_row: Some(last_row),
    })
}
