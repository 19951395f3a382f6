use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::sheets_api::{RetryPolicy, DEFAULT_BASE_URL};

/// Number of columns in an appointment row (A..G).
pub const APPOINTMENT_COLUMNS: usize = 7;

/// Zero-based column holding the patient email (B).
pub const EMAIL_COLUMN: usize = 1;

/// Zero-based column holding the status (G).
pub const STATUS_COLUMN: usize = 6;

/// Configuration (~/.clinicsync/config.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Static API key sent with every request.
    #[serde(default)]
    pub api_key: String,
    /// Optional OAuth bearer token, needed for writes to private sheets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Spreadsheet holding every appointment.
    pub master_spreadsheet_id: String,
    #[serde(default = "default_sheet")]
    pub master_sheet: String,
    /// Spreadsheet holding the user directory.
    pub users_spreadsheet_id: String,
    /// Directory rows: email, password, target spreadsheet id.
    #[serde(default = "default_users_range")]
    pub users_range: String,
    /// Tab that appointments are appended to in each user's spreadsheet.
    #[serde(default = "default_sheet")]
    pub user_sheet: String,
    /// Header rows at the top of the master and user tabs.
    #[serde(default = "default_header_rows")]
    pub header_rows: u64,
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,
    /// Watermark file; defaults to ~/.clinicsync/watermark.json
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_path: Option<String>,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_sheet() -> String {
    "Sheet1".to_string()
}

fn default_users_range() -> String {
    "Users!A2:C".to_string()
}

fn default_header_rows() -> u64 {
    1
}

fn default_sync_interval() -> u64 {
    300
}

impl Config {
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.api_key.trim().is_empty() {
            return Err(SyncError::Configuration(
                "apiKey is empty (set it in config.json or CLINICSYNC_API_KEY)".to_string(),
            ));
        }
        if self.master_spreadsheet_id.trim().is_empty() {
            return Err(SyncError::Configuration(
                "masterSpreadsheetId is empty".to_string(),
            ));
        }
        if self.users_spreadsheet_id.trim().is_empty() {
            return Err(SyncError::Configuration(
                "usersSpreadsheetId is empty".to_string(),
            ));
        }
        if !self.users_range.contains('!') {
            return Err(SyncError::Configuration(format!(
                "usersRange '{}' must name a tab (e.g. Users!A2:C)",
                self.users_range
            )));
        }
        if self.sync_interval_secs == 0 {
            return Err(SyncError::Configuration(
                "syncIntervalSecs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            initial_backoff_ms: self.retry.initial_backoff_ms,
            max_backoff_ms: self.retry.max_backoff_ms,
        }
    }
}

/// Transport-level retry settings. One attempt by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    1
}

fn default_initial_backoff() -> u64 {
    250
}

fn default_max_backoff() -> u64 {
    2_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

/// Appointment lifecycle as written in the status column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "completed" => Ok(AppointmentStatus::Completed),
            // Both spellings show up in hand-edited sheets.
            "cancelled" | "canceled" => Ok(AppointmentStatus::Cancelled),
            other => Err(SyncError::InvalidStatus(other.to_string())),
        }
    }
}

/// One appointment row. `row` is the 1-based sheet row it was read from
/// (0 for rows not yet written).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub row: u64,
    pub patient_name: String,
    pub email: String,
    pub phone: String,
    pub report_ref: String,
    pub date: String,
    pub start_time: String,
    pub status: AppointmentStatus,
}

impl Appointment {
    /// Build from sheet cells. Missing trailing cells read as empty; an
    /// unrecognised status reads as `Scheduled`.
    pub fn from_cells(row: u64, cells: &[String]) -> Self {
        let cell = |i: usize| cells.get(i).map(|c| c.trim().to_string()).unwrap_or_default();
        let status_text = cell(STATUS_COLUMN);
        let status = if status_text.is_empty() {
            AppointmentStatus::default()
        } else {
            status_text.parse::<AppointmentStatus>().unwrap_or_else(|_| {
                log::debug!(
                    "Row {}: unknown status '{}', treating as scheduled",
                    row,
                    status_text
                );
                AppointmentStatus::default()
            })
        };
        Self {
            row,
            patient_name: cell(0),
            email: cell(EMAIL_COLUMN),
            phone: cell(2),
            report_ref: cell(3),
            date: cell(4),
            start_time: cell(5),
            status,
        }
    }

    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.patient_name.clone(),
            self.email.clone(),
            self.phone.clone(),
            self.report_ref.clone(),
            self.date.clone(),
            self.start_time.clone(),
            self.status.as_str().to_string(),
        ]
    }
}
