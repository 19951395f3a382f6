//! Copies one master row into the owning user's spreadsheet.

use crate::directory::{normalize_email, Directory};
use crate::error::SyncError;
use crate::sheets_api::{range, SheetsApi};
use crate::types::APPOINTMENT_COLUMNS;

use super::scanner::ScannedRow;

/// Append `row` to the spreadsheet its email resolves to.
///
/// Returns the target spreadsheet id. Nothing is written when the email is
/// missing or not in the directory.
pub async fn deliver_row(
    api: &dyn SheetsApi,
    directory: &Directory,
    row: &ScannedRow,
    user_tab: &str,
) -> Result<String, SyncError> {
    let email = row
        .email()
        .ok_or(SyncError::MissingEmail { row: row.number })?;
    let spreadsheet_id = directory
        .resolve(email)
        .ok_or_else(|| SyncError::UnknownUser(normalize_email(email)))?;

    let target = range::columns(user_tab, APPOINTMENT_COLUMNS);
    let cells: Vec<String> = row
        .cells
        .iter()
        .take(APPOINTMENT_COLUMNS)
        .cloned()
        .collect();
    api.append_rows(spreadsheet_id, &target, &[cells]).await?;

    Ok(spreadsheet_id.to_string())
}
