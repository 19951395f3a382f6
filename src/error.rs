//! Error types for sync runs and sheet operations
//!
//! Errors are classified by recoverability:
//! - Retryable: transient Sheets API failures (timeouts, 429, 5xx)
//! - RequiresUserAction: bad config, rejected key, wrong credentials
//! - Row-level: unmatched or missing email, counted by the job and skipped

use thiserror::Error;

use crate::sheets_api::SheetsApiError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Sheets API: {0}")]
    Sheets(#[from] SheetsApiError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No directory entry for {0}")]
    UnknownUser(String),

    #[error("Row {row} has no email")]
    MissingEmail { row: u64 },

    #[error("Appointment has no email")]
    MissingAppointmentEmail,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Unknown appointment status '{0}'")]
    InvalidStatus(String),

    #[error("Row {0} is not an appointment row")]
    InvalidRow(u64),

    #[error("Watermark storage: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Sheets(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Returns true if this error requires user action to resolve
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            SyncError::Configuration(_)
                | SyncError::InvalidCredentials
                | SyncError::Sheets(SheetsApiError::AuthRejected(_))
                | SyncError::Sheets(SheetsApiError::InvalidUrl(_))
        )
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            SyncError::Sheets(SheetsApiError::AuthRejected(_)) => {
                "Check apiKey/accessToken in ~/.clinicsync/config.json and the sheet's sharing settings."
            }
            SyncError::Sheets(e) if e.is_transient() => {
                "The spreadsheet service is unavailable. The next sync will pick up where this one stopped."
            }
            SyncError::Sheets(_) => "Check the spreadsheet ids and tab names in your configuration.",
            SyncError::Configuration(_) => "Check your configuration in ~/.clinicsync/config.json",
            SyncError::UnknownUser(_) => "Add the email to the users sheet.",
            SyncError::MissingEmail { .. } => "Fill in the email column of the master sheet row.",
            SyncError::MissingAppointmentEmail => "Give the appointment an email address.",
            SyncError::InvalidCredentials => "Check the email and password.",
            SyncError::InvalidStatus(_) => "Use scheduled, completed or cancelled.",
            SyncError::InvalidRow(_) => "Pick a row number from the appointment list.",
            SyncError::Storage(_) | SyncError::Io(_) => {
                "Check permissions and disk space for ~/.clinicsync/"
            }
            SyncError::Json(_) => "Check the file format is correct.",
        }
    }
}
