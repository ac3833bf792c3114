//! CSV text to record table

use std::collections::BTreeMap;
use template::TabularSource;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CsvTableError {
    #[error("Failed to parse CSV: {0}")]
    Parse(#[from] csv::Error),

    #[error("Failed to parse CSV: no header row")]
    MissingHeader,
}

/// Parse CSV text whose first row names the columns
///
/// Empty lines are skipped, but a row of empty cells such as `,` is a
/// record. Headers are kept verbatim apart from a leading byte order mark,
/// so they compare with field names exactly. Rows may be ragged: cells
/// past the header are ignored and missing trailing cells read as "".
pub fn parse_csv(text: &str) -> Result<TabularSource, CsvTableError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(CsvTableError::MissingHeader);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: BTreeMap<String, String> = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.clone(), record.get(i).unwrap_or("").to_string()))
            .collect();
        rows.push(row);
    }

    Ok(TabularSource { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_simple() {
        let table = parse_csv("name,course\nAnn,Rust\nBob,Go\n").unwrap();
        assert_eq!(table.headers, vec!["name", "course"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1]["name"], "Bob");
        assert_eq!(table.rows[1]["course"], "Go");
    }

    #[test]
    fn test_quoted_cells() {
        let table = parse_csv("name,note\n\"Doe, Jane\",\"said \"\"hi\"\"\"\n").unwrap();
        assert_eq!(table.rows[0]["name"], "Doe, Jane");
        assert_eq!(table.rows[0]["note"], "said \"hi\"");
    }

    #[test]
    fn test_blank_lines_skipped() {
        let table = parse_csv("name\nAnn\n\n\nBob\n").unwrap();
        let names: Vec<&str> = table.rows.iter().map(|r| r["name"].as_str()).collect();
        assert_eq!(names, vec!["Ann", "Bob"]);
    }

    #[test]
    fn test_rows_of_blank_cells_are_records() {
        let table = parse_csv("name,age\n,\nBob,3\n").unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0]["name"], "");
        assert_eq!(table.rows[0]["age"], "");
        assert_eq!(table.rows[1]["name"], "Bob");
    }

    #[test]
    fn test_short_rows_read_empty() {
        let table = parse_csv("name,age,city\nAnn,30\n").unwrap();
        assert_eq!(table.rows[0]["age"], "30");
        assert_eq!(table.rows[0]["city"], "");
    }

    #[test]
    fn test_header_only() {
        let table = parse_csv("name,age\n").unwrap();
        assert_eq!(table.headers.len(), 2);
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_byte_order_mark_stripped() {
        let table = parse_csv("\u{feff}name,age\nAnn,1\n").unwrap();
        assert_eq!(table.headers, vec!["name", "age"]);
        assert_eq!(table.rows[0]["name"], "Ann");
    }

    #[test]
    fn test_headers_kept_verbatim() {
        let table = parse_csv("name , age\nAnn,1\n").unwrap();
        assert_eq!(table.headers, vec!["name ", " age"]);
        assert_eq!(table.rows[0]["name "], "Ann");
    }

    #[test]
    fn test_empty_text_rejected() {
        let err = parse_csv("").unwrap_err();
        assert_eq!(err.to_string(), "Failed to parse CSV: no header row");
    }
}
