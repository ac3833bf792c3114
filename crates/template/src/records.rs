//! Record tables

use crate::{Result, TemplateError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// An already-parsed table: a header row plus one mapping per data row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabularSource {
    pub headers: Vec<String>,
    pub rows: Vec<BTreeMap<String, String>>,
}

/// One row of substitution values, keyed by column name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    values: BTreeMap<String, String>,
}

impl Record {
    /// Value for a column; absent and blank cells both read as ""
    pub fn get(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or("")
    }
}

impl From<BTreeMap<String, String>> for Record {
    fn from(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }
}

/// Records validated against a set of field names, in table order
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    headers: Vec<String>,
    records: Vec<Record>,
}

impl RecordSet {
    /// Validate a table against the field names it must supply
    ///
    /// Every field name has to appear in the header row; the missing ones
    /// are reported in field order. A table with headers but no rows is
    /// rejected separately.
    pub fn load(source: TabularSource, field_names: &[&str]) -> Result<Self> {
        let missing = missing_columns(&source.headers, field_names);
        if !missing.is_empty() {
            return Err(TemplateError::MissingRequiredColumns(missing));
        }

        if source.rows.is_empty() {
            return Err(TemplateError::EmptyDataSet);
        }

        log::debug!(
            "Loaded {} records with {} columns",
            source.rows.len(),
            source.headers.len()
        );

        Ok(Self {
            headers: source.headers,
            records: source.rows.into_iter().map(Record::from).collect(),
        })
    }

    /// Column names of the source table
    pub fn headers(&self) -> BTreeSet<&str> {
        self.headers.iter().map(String::as_str).collect()
    }

    /// Whether every given field name is a column of this table
    pub fn covers(&self, field_names: &[&str]) -> bool {
        self.missing(field_names).is_empty()
    }

    /// Field names this table has no column for, in field order
    pub fn missing(&self, field_names: &[&str]) -> Vec<String> {
        missing_columns(&self.headers, field_names)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Field names with no matching header, in field order
fn missing_columns(headers: &[String], field_names: &[&str]) -> Vec<String> {
    field_names
        .iter()
        .filter(|name| !headers.iter().any(|h| h.as_str() == **name))
        .map(|name| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn source(headers: &[&str], rows: &[&[(&str, &str)]]) -> TabularSource {
        TabularSource {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect()
                })
                .collect(),
        }
    }

    #[test]
    fn test_load_keeps_order() {
        let table = source(
            &["name"],
            &[&[("name", "Ann")], &[("name", "Bob")], &[("name", "Cy")]],
        );
        let records = RecordSet::load(table, &["name"]).unwrap();

        let names: Vec<&str> = records.records().iter().map(|r| r.get("name")).collect();
        assert_eq!(names, vec!["Ann", "Bob", "Cy"]);
    }

    #[test]
    fn test_missing_columns_reported_in_field_order() {
        let table = source(&["name"], &[&[("name", "Ann")]]);
        match RecordSet::load(table, &["name", "age", "course"]) {
            Err(TemplateError::MissingRequiredColumns(missing)) => {
                assert_eq!(missing, vec!["age".to_string(), "course".to_string()])
            }
            other => panic!("expected missing columns, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_columns_checked_before_empty_body() {
        let table = source(&["name"], &[]);
        assert!(matches!(
            RecordSet::load(table, &["age"]),
            Err(TemplateError::MissingRequiredColumns(_))
        ));
    }

    #[test]
    fn test_empty_body_rejected() {
        let table = source(&["name"], &[]);
        assert!(matches!(
            RecordSet::load(table, &["name"]),
            Err(TemplateError::EmptyDataSet)
        ));
    }

    #[test]
    fn test_extra_columns_are_fine() {
        let table = source(&["name", "email"], &[&[("name", "Ann"), ("email", "a@x")]]);
        let records = RecordSet::load(table, &["name"]).unwrap();
        assert_eq!(records.headers(), BTreeSet::from(["email", "name"]));
    }

    #[test]
    fn test_absent_cell_reads_empty() {
        let table = source(&["name", "age"], &[&[("name", "Ann")]]);
        let records = RecordSet::load(table, &["name", "age"]).unwrap();
        assert_eq!(records.records()[0].get("age"), "");
    }

    #[test]
    fn test_covers() {
        let table = source(&["name", "age"], &[&[("name", "Ann")]]);
        let records = RecordSet::load(table, &["name"]).unwrap();
        assert!(records.covers(&["age", "name"]));
        assert!(!records.covers(&["name", "course"]));
    }
}
