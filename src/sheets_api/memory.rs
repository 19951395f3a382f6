//! In-memory `SheetsApi` for tests.
//!
//! Understands the A1 ranges this crate builds (`Tab!A2:G`, `Tab!A:G`,
//! `Tab!A5:G5`, `Tab!G5`, quoted tab names). Spreadsheets can be marked as
//! failing to simulate outages.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{SheetsApi, SheetsApiError};

type Grid = Vec<Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Span {
    tab: String,
    first_col: usize,
    last_col: Option<usize>,
    first_row: usize,
    last_row: Option<usize>,
}

#[derive(Default)]
pub struct MemorySheets {
    // spreadsheet id -> tab -> rows
    books: Mutex<HashMap<String, HashMap<String, Grid>>>,
    failing: Mutex<HashSet<String>>,
    appends: Mutex<Vec<(String, Vec<String>)>>,
}

impl MemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents of a tab.
    pub fn put(&self, spreadsheet_id: &str, tab: &str, rows: Vec<Vec<&str>>) {
        let grid = rows
            .into_iter()
            .map(|r| r.into_iter().map(str::to_string).collect())
            .collect();
        self.books
            .lock()
            .entry(spreadsheet_id.to_string())
            .or_default()
            .insert(tab.to_string(), grid);
    }

    /// Current contents of a tab (empty when absent).
    pub fn rows(&self, spreadsheet_id: &str, tab: &str) -> Grid {
        self.books
            .lock()
            .get(spreadsheet_id)
            .and_then(|b| b.get(tab))
            .cloned()
            .unwrap_or_default()
    }

    /// Every appended row, in order, with its target spreadsheet.
    pub fn appended(&self) -> Vec<(String, Vec<String>)> {
        self.appends.lock().clone()
    }

    pub fn fail(&self, spreadsheet_id: &str) {
        self.failing.lock().insert(spreadsheet_id.to_string());
    }

    pub fn recover(&self, spreadsheet_id: &str) {
        self.failing.lock().remove(spreadsheet_id);
    }

    fn check(&self, spreadsheet_id: &str) -> Result<(), SheetsApiError> {
        if self.failing.lock().contains(spreadsheet_id) {
            return Err(SheetsApiError::ApiError {
                status: 503,
                message: format!("{} unavailable", spreadsheet_id),
            });
        }
        Ok(())
    }
}

fn parse_col(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut n = 0usize;
    for c in letters.chars() {
        n = n * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    Some(n - 1)
}

fn parse_ref(cell: &str) -> (Option<usize>, Option<usize>) {
    let split = cell
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(cell.len());
    let (letters, digits) = cell.split_at(split);
    (parse_col(letters), digits.parse().ok())
}

fn parse_span(range: &str) -> Result<Span, SheetsApiError> {
    let bad = || SheetsApiError::ApiError {
        status: 400,
        message: format!("Unable to parse range: {}", range),
    };
    let (tab, cells) = range.rsplit_once('!').ok_or_else(bad)?;
    let tab = match tab.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')) {
        Some(quoted) => quoted.replace("''", "'"),
        None => tab.to_string(),
    };
    let (start, end) = match cells.split_once(':') {
        Some((s, e)) => (s, Some(e)),
        None => (cells, None),
    };
    let (first_col, first_row) = parse_ref(start);
    let first_col = first_col.ok_or_else(bad)?;
    let (last_col, last_row) = match end {
        Some(e) => parse_ref(e),
        None => (Some(first_col), first_row),
    };
    Ok(Span {
        tab,
        first_col,
        last_col,
        first_row: first_row.unwrap_or(1),
        last_row,
    })
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

#[async_trait]
impl SheetsApi for MemorySheets {
    async fn read_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, SheetsApiError> {
        self.check(spreadsheet_id)?;
        let span = parse_span(range)?;
        let grid = self.rows(spreadsheet_id, &span.tab);

        let last_row = span.last_row.unwrap_or(grid.len()).min(grid.len());
        let mut out: Grid = Vec::new();
        for idx in span.first_row..=last_row {
            let Some(row) = grid.get(idx - 1) else { break };
            let last_col = span.last_col.unwrap_or(usize::MAX);
            let mut cells: Vec<String> = row
                .iter()
                .enumerate()
                .filter(|(c, _)| *c >= span.first_col && *c <= last_col)
                .map(|(_, v)| v.clone())
                .collect();
            while cells.last().is_some_and(|c| c.is_empty()) {
                cells.pop();
            }
            out.push(cells);
        }
        while out.last().is_some_and(|r| r.is_empty()) {
            out.pop();
        }
        Ok(out)
    }

    async fn append_rows(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<(), SheetsApiError> {
        self.check(spreadsheet_id)?;
        let span = parse_span(range)?;
        let mut books = self.books.lock();
        let grid = books
            .entry(spreadsheet_id.to_string())
            .or_default()
            .entry(span.tab)
            .or_default();
        while grid.last().is_some_and(|r| is_blank(r)) {
            grid.pop();
        }
        for row in rows {
            grid.push(row.clone());
            self.appends
                .lock()
                .push((spreadsheet_id.to_string(), row.clone()));
        }
        Ok(())
    }

    async fn update_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<(), SheetsApiError> {
        self.check(spreadsheet_id)?;
        let span = parse_span(range)?;
        let mut books = self.books.lock();
        let grid = books
            .entry(spreadsheet_id.to_string())
            .or_default()
            .entry(span.tab)
            .or_default();
        for (offset, values) in rows.iter().enumerate() {
            let idx = span.first_row - 1 + offset;
            if grid.len() <= idx {
                grid.resize(idx + 1, Vec::new());
            }
            let row = &mut grid[idx];
            for (c, value) in values.iter().enumerate() {
                let col = span.first_col + c;
                if row.len() <= col {
                    row.resize(col + 1, String::new());
                }
                row[col] = value.clone();
            }
        }
        Ok(())
    }

    async fn clear_range(&self, spreadsheet_id: &str, range: &str) -> Result<(), SheetsApiError> {
        self.check(spreadsheet_id)?;
        let span = parse_span(range)?;
        let mut books = self.books.lock();
        let Some(grid) = books
            .get_mut(spreadsheet_id)
            .and_then(|b| b.get_mut(&span.tab))
        else {
            return Ok(());
        };
        let last_row = span.last_row.unwrap_or(grid.len()).min(grid.len());
        for idx in span.first_row..=last_row {
            let Some(row) = grid.get_mut(idx - 1) else { break };
            let last_col = span.last_col.unwrap_or(usize::MAX);
            for (c, cell) in row.iter_mut().enumerate() {
                if c >= span.first_col && c <= last_col {
                    cell.clear();
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_span_forms() {
        let s = parse_span("Sheet1!A2:G").unwrap();
        assert_eq!((s.first_col, s.last_col, s.first_row, s.last_row), (0, Some(6), 2, None));

        let s = parse_span("'My Tab'!G5").unwrap();
        assert_eq!(s.tab, "My Tab");
        assert_eq!((s.first_col, s.last_col, s.first_row, s.last_row), (6, Some(6), 5, Some(5)));

        let s = parse_span("Users!A:C").unwrap();
        assert_eq!((s.first_row, s.last_row), (1, None));

        assert!(parse_span("no-bang").is_err());
    }

    #[tokio::test]
    async fn test_read_append_update_clear() {
        let api = MemorySheets::new();
        api.put("s", "Sheet1", vec![vec!["h1", "h2"], vec!["a", "b"]]);

        api.append_rows("s", "Sheet1!A:B", &[vec!["c".into(), "d".into()]])
            .await
            .unwrap();
        assert_eq!(
            api.read_range("s", "Sheet1!A2:B").await.unwrap(),
            vec![vec!["a", "b"], vec!["c", "d"]]
        );

        api.update_range("s", "Sheet1!B3", &[vec!["z".into()]])
            .await
            .unwrap();
        assert_eq!(api.rows("s", "Sheet1")[2], vec!["c", "z"]);

        api.clear_range("s", "Sheet1!A2:B2").await.unwrap();
        assert_eq!(
            api.read_range("s", "Sheet1!A2:B").await.unwrap(),
            vec![Vec::<String>::new(), vec!["c".to_string(), "z".to_string()]]
        );
    }

    #[tokio::test]
    async fn test_failing_sheet_errors() {
        let api = MemorySheets::new();
        api.fail("s");
        assert!(api.read_range("s", "Sheet1!A1:B").await.is_err());
        api.recover("s");
        assert!(api.read_range("s", "Sheet1!A1:B").await.unwrap().is_empty());
    }
}
