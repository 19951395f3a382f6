//! A1 notation builders.

/// Spreadsheet column letter for a zero-based column index (0 → A, 26 → AA).
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Tab name as it must appear before `!`. Names with anything other than
/// ASCII alphanumerics or `_` are single-quoted, with embedded quotes doubled.
pub fn sheet_prefix(tab: &str) -> String {
    if !tab.is_empty() && tab.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        tab.to_string()
    } else {
        format!("'{}'", tab.replace('\'', "''"))
    }
}

/// Open-ended range from `start_row` down to the end of the sheet, covering
/// `columns` columns from A.
pub fn rows_from(tab: &str, start_row: u64, columns: usize) -> String {
    format!(
        "{}!A{}:{}",
        sheet_prefix(tab),
        start_row,
        column_letter(columns.saturating_sub(1))
    )
}

/// Whole-column range `A:<last>`; used as the table hint for appends.
pub fn columns(tab: &str, columns: usize) -> String {
    format!(
        "{}!A:{}",
        sheet_prefix(tab),
        column_letter(columns.saturating_sub(1))
    )
}

/// Single row `A<row>:<last><row>`.
pub fn row(tab: &str, row: u64, columns: usize) -> String {
    format!(
        "{}!A{}:{}{}",
        sheet_prefix(tab),
        row,
        column_letter(columns.saturating_sub(1)),
        row
    )
}

/// Single cell at a zero-based column.
pub fn cell(tab: &str, row: u64, column: usize) -> String {
    format!("{}!{}{}", sheet_prefix(tab), column_letter(column), row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(6), "G");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn test_sheet_prefix_quotes_when_needed() {
        assert_eq!(sheet_prefix("Sheet1"), "Sheet1");
        assert_eq!(sheet_prefix("My Patients"), "'My Patients'");
        assert_eq!(sheet_prefix("Dr. O'Neil"), "'Dr. O''Neil'");
    }

    #[test]
    fn test_range_builders() {
        assert_eq!(rows_from("Sheet1", 2, 7), "Sheet1!A2:G");
        assert_eq!(columns("Sheet1", 7), "Sheet1!A:G");
        assert_eq!(row("Sheet1", 5, 7), "Sheet1!A5:G5");
        assert_eq!(cell("Sheet1", 5, 6), "Sheet1!G5");
    }
}
