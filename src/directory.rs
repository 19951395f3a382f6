//! User directory: email → target spreadsheet, loaded from the users sheet.
//!
//! Each directory row is `email, password, spreadsheet id`. Emails are
//! matched trimmed and case-insensitively. Passwords are stored in the sheet
//! in plain text and compared exactly.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::SyncError;
use crate::sheets_api::SheetsApi;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub spreadsheet_id: String,
}

/// Lookup key for an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Clone, Default)]
pub struct Directory {
    entries: HashMap<String, DirectoryEntry>,
}

impl Directory {
    /// Build from raw sheet rows. Rows without an email or a spreadsheet id
    /// are skipped; for duplicate emails the first row wins.
    pub fn from_rows(rows: &[Vec<String>]) -> Self {
        let mut entries = HashMap::new();
        for (i, row) in rows.iter().enumerate() {
            let cell = |n: usize| row.get(n).map(|c| c.trim()).unwrap_or("");
            let key = normalize_email(cell(0));
            let spreadsheet_id = cell(2);
            if key.is_empty() || spreadsheet_id.is_empty() {
                log::debug!("Directory: skipping incomplete row {}", i);
                continue;
            }
            if entries.contains_key(&key) {
                log::warn!("Directory: duplicate entry for {}, keeping the first", key);
                continue;
            }
            entries.insert(
                key.clone(),
                DirectoryEntry {
                    email: key,
                    // Only trailing newlines are stripped; spaces are part of the password.
                    password: row
                        .get(1)
                        .map(|p| p.trim_end_matches(['\r', '\n']).to_string())
                        .unwrap_or_default(),
                    spreadsheet_id: spreadsheet_id.to_string(),
                },
            );
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, email: &str) -> Option<&DirectoryEntry> {
        self.entries.get(&normalize_email(email))
    }

    /// Target spreadsheet for an email.
    pub fn resolve(&self, email: &str) -> Option<&str> {
        self.get(email).map(|e| e.spreadsheet_id.as_str())
    }

    /// Check an email/password pair. Unknown email and wrong password give
    /// the same error.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<&DirectoryEntry, SyncError> {
        match self.get(email) {
            Some(entry) if entry.password == password => Ok(entry),
            _ => Err(SyncError::InvalidCredentials),
        }
    }
}

/// Read the whole directory. Fetch failures propagate.
pub async fn load_directory(
    api: &dyn SheetsApi,
    spreadsheet_id: &str,
    range: &str,
) -> Result<Directory, SyncError> {
    let rows = api.read_range(spreadsheet_id, range).await?;
    let directory = Directory::from_rows(&rows);
    log::debug!(
        "Directory: loaded {} entries from {} rows",
        directory.len(),
        rows.len()
    );
    Ok(directory)
}

/// Load the directory and verify a login.
pub async fn authenticate(
    api: &dyn SheetsApi,
    spreadsheet_id: &str,
    range: &str,
    email: &str,
    password: &str,
) -> Result<DirectoryEntry, SyncError> {
    let directory = load_directory(api, spreadsheet_id, range).await?;
    let entry = directory.authenticate(email, password)?.clone();
    log::info!("Directory: {} signed in", entry.email);
    Ok(entry)
}

/// Resolve an email to its spreadsheet, or `UnknownUser`.
pub async fn resolve_user(
    api: &dyn SheetsApi,
    spreadsheet_id: &str,
    range: &str,
    email: &str,
) -> Result<DirectoryEntry, SyncError> {
    let directory = load_directory(api, spreadsheet_id, range).await?;
    directory
        .get(email)
        .cloned()
        .ok_or_else(|| SyncError::UnknownUser(normalize_email(email)))
}
