//! Spreadsheet values API client.
//!
//! Thin wrapper over the Google Sheets v4 `values` endpoints: read, append,
//! update and clear a range addressed by spreadsheet id + A1 notation.
//! Rows travel as ordered arrays of strings.
//!
//! Modules:
//! - client: reqwest-backed `SheetsClient`
//! - range: A1 range builders
//! - memory: in-memory `SheetsApi` used by tests

pub mod client;
#[cfg(test)]
pub(crate) mod memory;
pub mod range;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use client::SheetsClient;

/// Default API root for the Sheets values endpoints.
pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4";

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SheetsApiError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API key or access token rejected ({0})")]
    AuthRejected(u16),
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl SheetsApiError {
    /// Whether a later attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SheetsApiError::Http(e) => e.is_timeout() || e.is_connect(),
            SheetsApiError::ApiError { status, .. } => {
                *status == 429 || *status == 408 || *status >= 500
            }
            _ => false,
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// Body of a values read/write (`ValueRange` in the Sheets API).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_dimension: Option<String>,
    /// Cells come back as strings with the default FORMATTED_VALUE render
    /// option, but numbers and booleans are tolerated.
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

impl ValueRange {
    pub fn rows(rows: &[Vec<String>], range: Option<&str>) -> Self {
        Self {
            range: range.map(str::to_string),
            major_dimension: Some("ROWS".to_string()),
            values: rows
                .iter()
                .map(|row| row.iter().cloned().map(serde_json::Value::String).collect())
                .collect(),
        }
    }

    /// Flatten the returned cells into strings.
    pub fn into_string_rows(self) -> Vec<Vec<String>> {
        self.values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect()
    }
}

fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ============================================================================
// API seam
// ============================================================================

/// Range-level operations the sync job and the appointment views need.
///
/// `SheetsClient` talks HTTP; tests use the in-memory implementation.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Read a range. Trailing empty rows are not returned.
    async fn read_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, SheetsApiError>;

    /// Append rows after the last non-empty row of the table in `range`.
    async fn append_rows(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<(), SheetsApiError>;

    /// Overwrite cells starting at the top-left of `range`.
    async fn update_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<(), SheetsApiError>;

    /// Blank every cell in `range`, keeping the rows in place.
    async fn clear_range(&self, spreadsheet_id: &str, range: &str) -> Result<(), SheetsApiError>;
}

// ============================================================================
// Retry
// ============================================================================

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    /// One attempt: the sync job counts failures instead of retrying them.
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 250,
            max_backoff_ms: 2_000,
        }
    }
}

impl RetryPolicy {
    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Pause after failed attempt `attempt` (1-based). Doubles from
    /// `initial_backoff_ms` up to `max_backoff_ms`; a server-sent
    /// `Retry-After` wins, capped at 30s.
    fn backoff(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        if let Some(secs) = retry_after_secs {
            return Duration::from_secs(secs.min(30));
        }
        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        Duration::from_millis(
            self.initial_backoff_ms
                .saturating_mul(factor)
                .min(self.max_backoff_ms),
        )
    }
}

fn status_is_transient(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

fn retry_after_secs(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Send `request`, repeating it on 429/408/5xx and connect or timeout
/// errors while `policy` allows. The last response or error is returned
/// as is; callers map non-success statuses themselves.
pub async fn send_with_retry(
    request: reqwest::RequestBuilder,
    policy: &RetryPolicy,
) -> Result<reqwest::Response, SheetsApiError> {
    let attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        // Streaming bodies cannot be cloned; those get a single attempt.
        let Some(this_try) = request.try_clone() else {
            return Ok(request.send().await?);
        };

        let outcome = this_try.send().await;
        let pause = match &outcome {
            Ok(resp) if status_is_transient(resp.status()) => {
                Some(policy.backoff(attempt, retry_after_secs(resp)))
            }
            Err(e) if e.is_timeout() || e.is_connect() => Some(policy.backoff(attempt, None)),
            _ => None,
        };

        match pause {
            Some(pause) if attempt < attempts => {
                let cause = match &outcome {
                    Ok(resp) => format!("status {}", resp.status()),
                    Err(e) => e.to_string(),
                };
                log::warn!(
                    "Sheets API: attempt {}/{} failed ({}), retrying in {:?}",
                    attempt,
                    attempts,
                    cause,
                    pause
                );
                tokio::time::sleep(pause).await;
                attempt += 1;
            }
            _ => return Ok(outcome?),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_range_parses_mixed_cells() {
        let json = r#"{
            "range": "Sheet1!A2:G3",
            "majorDimension": "ROWS",
            "values": [
                ["Ana Ruiz", "ana@example.com", 5551234, "R-7", "2026-10-20", "09:30", "scheduled"],
                ["Bo", "", true]
            ]
        }"#;

        let parsed: ValueRange = serde_json::from_str(json).unwrap();
        let rows = parsed.into_string_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][2], "5551234");
        assert_eq!(rows[1], vec!["Bo", "", "true"]);
    }

    #[test]
    fn test_value_range_missing_values_is_empty() {
        // The API omits `values` entirely when the range holds no data.
        let parsed: ValueRange = serde_json::from_str(r#"{"range": "Sheet1!A9:G"}"#).unwrap();
        assert!(parsed.into_string_rows().is_empty());
    }

    #[test]
    fn test_value_range_serializes_rows() {
        let body = ValueRange::rows(&[vec!["a".into(), "b".into()]], Some("Sheet1!A5:B5"));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["majorDimension"], "ROWS");
        assert_eq!(json["range"], "Sheet1!A5:B5");
        assert_eq!(json["values"][0][1], "b");
    }

    #[test]
    fn test_transient_statuses() {
        assert!(status_is_transient(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(status_is_transient(reqwest::StatusCode::REQUEST_TIMEOUT));
        assert!(status_is_transient(reqwest::StatusCode::BAD_GATEWAY));
        assert!(!status_is_transient(reqwest::StatusCode::NOT_FOUND));
        assert!(!status_is_transient(reqwest::StatusCode::FORBIDDEN));
    }

    #[test]
    fn test_backoff_doubles_and_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff_ms: 250,
            max_backoff_ms: 1_000,
        };
        assert_eq!(policy.backoff(1, None), Duration::from_millis(250));
        assert_eq!(policy.backoff(2, None), Duration::from_millis(500));
        assert_eq!(policy.backoff(4, None), Duration::from_millis(1_000));
        assert_eq!(policy.backoff(80, None), Duration::from_millis(1_000));
    }

    #[test]
    fn test_backoff_honors_retry_after() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1, Some(2)), Duration::from_secs(2));
        assert_eq!(policy.backoff(1, Some(120)), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_attempts_still_sends_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.attempts(), 1);
    }

    #[tokio::test]
    async fn test_connect_errors_surface_after_last_attempt() {
        // Bind then drop to get a local port with nothing listening.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
        };
        let request = reqwest::Client::new().get(format!("http://127.0.0.1:{}/", port));

        let result = send_with_retry(request, &policy).await;
        assert!(matches!(result, Err(SheetsApiError::Http(ref e)) if e.is_connect()));
        assert!(result.unwrap_err().is_transient());
    }

    #[test]
    fn test_transient_classification() {
        let unavailable = SheetsApiError::ApiError {
            status: 503,
            message: "backend".into(),
        };
        let missing = SheetsApiError::ApiError {
            status: 404,
            message: "no such sheet".into(),
        };
        assert!(unavailable.is_transient());
        assert!(!missing.is_transient());
        assert!(!SheetsApiError::AuthRejected(403).is_transient());
    }
}
