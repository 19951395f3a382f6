//! Appointment views and edits on a user's own spreadsheet.
//!
//! Rows are addressed by their 1-based sheet row number, the same way the
//! sync job addresses master rows. Deleting blanks the row's cells rather
//! than removing the row, so the numbers of other rows stay put.

use crate::error::SyncError;
use crate::sheets_api::{range, SheetsApi};
use crate::types::{Appointment, AppointmentStatus, APPOINTMENT_COLUMNS, STATUS_COLUMN};

/// Where a user's appointments live.
#[derive(Debug, Clone, Copy)]
pub struct UserSheet<'a> {
    pub spreadsheet_id: &'a str,
    pub tab: &'a str,
    pub header_rows: u64,
}

/// Reject header rows, and rows that are blank or past the end of the sheet.
async fn ensure_appointment_row(
    api: &dyn SheetsApi,
    sheet: UserSheet<'_>,
    row: u64,
) -> Result<(), SyncError> {
    if row <= sheet.header_rows {
        return Err(SyncError::InvalidRow(row));
    }
    let a1 = range::row(sheet.tab, row, APPOINTMENT_COLUMNS);
    let cells = api.read_range(sheet.spreadsheet_id, &a1).await?;
    let occupied = cells
        .first()
        .is_some_and(|r| r.iter().any(|c| !c.trim().is_empty()));
    if !occupied {
        return Err(SyncError::InvalidRow(row));
    }
    Ok(())
}

/// Every appointment below the header, blank rows skipped.
pub async fn list_appointments(
    api: &dyn SheetsApi,
    sheet: UserSheet<'_>,
) -> Result<Vec<Appointment>, SyncError> {
    let first = sheet.header_rows + 1;
    let a1 = range::rows_from(sheet.tab, first, APPOINTMENT_COLUMNS);
    let rows = api.read_range(sheet.spreadsheet_id, &a1).await?;

    Ok(rows
        .iter()
        .enumerate()
        .filter(|(_, cells)| cells.iter().any(|c| !c.trim().is_empty()))
        .map(|(i, cells)| Appointment::from_cells(first + i as u64, cells))
        .collect())
}

/// Append a new appointment.
pub async fn add_appointment(
    api: &dyn SheetsApi,
    sheet: UserSheet<'_>,
    appointment: &Appointment,
) -> Result<(), SyncError> {
    if appointment.email.trim().is_empty() {
        return Err(SyncError::MissingAppointmentEmail);
    }
    let a1 = range::columns(sheet.tab, APPOINTMENT_COLUMNS);
    api.append_rows(sheet.spreadsheet_id, &a1, &[appointment.to_cells()])
        .await?;
    log::info!(
        "Appointments: added {} on {} {} to {}",
        appointment.patient_name,
        appointment.date,
        appointment.start_time,
        sheet.spreadsheet_id
    );
    Ok(())
}

/// Rewrite the status cell of one row.
pub async fn update_status(
    api: &dyn SheetsApi,
    sheet: UserSheet<'_>,
    row: u64,
    status: AppointmentStatus,
) -> Result<(), SyncError> {
    ensure_appointment_row(api, sheet, row).await?;
    let a1 = range::cell(sheet.tab, row, STATUS_COLUMN);
    api.update_range(
        sheet.spreadsheet_id,
        &a1,
        &[vec![status.as_str().to_string()]],
    )
    .await?;
    log::info!(
        "Appointments: row {} of {} marked {}",
        row,
        sheet.spreadsheet_id,
        status
    );
    Ok(())
}

/// Blank one appointment row.
pub async fn delete_appointment(
    api: &dyn SheetsApi,
    sheet: UserSheet<'_>,
    row: u64,
) -> Result<(), SyncError> {
    ensure_appointment_row(api, sheet, row).await?;
    let a1 = range::row(sheet.tab, row, APPOINTMENT_COLUMNS);
    api.clear_range(sheet.spreadsheet_id, &a1).await?;
    log::info!("Appointments: row {} of {} cleared", row, sheet.spreadsheet_id);
    Ok(())
}
