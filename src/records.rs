//! # Input Records
//!
//! Tabular input handling: a [`Table`] of JSON object rows, case-insensitive
//! resolution of the required columns, and conversion to [`PropertyRecord`]s.

use crate::config::ColumnConfig;
use crate::errors::{error_logging, AppError, AppResult};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info};

lazy_static! {
    static ref CURRENCY_NOISE: Regex =
        Regex::new(r"(?i)₹|\binr\b|\brs\.?|[,\s/\-]").expect("Currency pattern should be valid");
}

/// One JSON object per input row
pub type Row = Map<String, Value>;

/// Decoded tabular input
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Column names in first-seen order
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    /// Build a table from rows, collecting the union of their keys
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        Self { columns, rows }
    }

    /// Parse a JSON array of objects
    pub fn from_json_str(json: &str) -> AppResult<Self> {
        let rows: Vec<Row> = serde_json::from_str(json)?;
        Ok(Self::from_rows(rows))
    }

    /// Read a JSON array of objects from disk
    pub fn from_json_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            error_logging::log_filesystem_error(&e, "read_input_table", path.to_str());
            AppError::FileSystem(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let table = Self::from_json_str(&content)?;
        info!(
            path = %path.display(),
            rows = table.rows.len(),
            columns = table.columns.len(),
            "Loaded input table"
        );
        Ok(table)
    }

    /// Find a column by name, ignoring case and surrounding whitespace
    pub fn find_column(&self, wanted: &str) -> Option<&str> {
        let wanted = wanted.trim().to_lowercase();
        self.columns
            .iter()
            .find(|c| c.trim().to_lowercase() == wanted)
            .map(String::as_str)
    }

    /// Resolve the description, consideration and property columns
    ///
    /// Fails with [`AppError::MissingColumn`] listing the columns actually present
    /// when any of them is absent.
    pub fn resolve_columns(&self, config: &ColumnConfig) -> AppResult<ResolvedColumns> {
        let description = self.find_column(&config.description);
        let consideration = self.find_column(&config.consideration);
        let property = self.find_column(&config.property);

        match (description, consideration, property) {
            (Some(description), Some(consideration), Some(property)) => {
                debug!(description, consideration, property, "Resolved input columns");
                Ok(ResolvedColumns {
                    description: description.to_string(),
                    consideration: consideration.to_string(),
                    property: property.to_string(),
                })
            }
            _ => {
                let expected = config.required();
                Err(AppError::MissingColumn {
                    expected,
                    present: self.columns.clone(),
                })
            }
        }
    }

    /// Convert every row into a [`PropertyRecord`]
    pub fn records(&self, config: &ColumnConfig) -> AppResult<Vec<PropertyRecord>> {
        let columns = self.resolve_columns(config)?;
        Ok(self
            .rows
            .iter()
            .map(|row| PropertyRecord::from_row(row, &columns))
            .collect())
    }
}

/// Actual column names matched in the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub description: String,
    pub consideration: String,
    pub property: String,
}

/// One input row with its required fields extracted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub description: String,
    /// Consideration value; zero when missing or unparsable
    pub consideration: f64,
    pub property: String,
    /// The full original row, passed through to the output
    pub fields: Row,
}

impl PropertyRecord {
    pub fn from_row(row: &Row, columns: &ResolvedColumns) -> Self {
        Self {
            description: row
                .get(&columns.description)
                .map(value_to_text)
                .unwrap_or_default(),
            consideration: row
                .get(&columns.consideration)
                .map(parse_consideration)
                .unwrap_or(0.0),
            property: row
                .get(&columns.property)
                .map(|v| value_to_text(v).trim().to_string())
                .unwrap_or_default(),
            fields: row.clone(),
        }
    }
}

/// Render a cell as text; null becomes empty
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse a consideration cell such as `9000000`, `"90,00,000"` or `"₹ 90,00,000/-"`
///
/// Unparsable values become `0.0`, which later yields a zero rate.
pub fn parse_consideration(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => CURRENCY_NOISE.replace_all(s, "").parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() && v >= 0.0 => v,
        _ => {
            debug!(value = %value, "Unparsable consideration value, using 0");
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_columns_in_first_seen_order() {
        let table = Table::from_rows(vec![
            row(json!({"Property": "Alpha", "Description": "x"})),
            row(json!({"Notes": "n", "Property": "Beta"})),
        ]);
        assert_eq!(table.columns.len(), 3);
        assert!(table.columns.contains(&"Notes".to_string()));
    }

    #[test]
    fn test_find_column_is_case_and_space_insensitive() {
        let table = Table::from_rows(vec![row(json!({" description ": "x"}))]);
        assert_eq!(table.find_column("Description"), Some(" description "));
        assert_eq!(table.find_column("property"), None);
    }

    #[test]
    fn test_missing_column_reports_present_columns() {
        let table = Table::from_rows(vec![row(json!({"Description": "x", "Notes": 1}))]);
        let err = table.resolve_columns(&ColumnConfig::default()).unwrap_err();
        match err {
            AppError::MissingColumn { expected, present } => {
                assert_eq!(expected, vec!["Description", "Consideration", "Property"]);
                assert_eq!(present, vec!["Description", "Notes"]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_empty_table_has_no_columns() {
        let table = Table::from_json_str("[]").unwrap();
        assert!(table.records(&ColumnConfig::default()).is_err());
    }

    #[test]
    fn test_parse_consideration() {
        assert_eq!(parse_consideration(&json!(9000000)), 9_000_000.0);
        assert_eq!(parse_consideration(&json!("90,00,000")), 9_000_000.0);
        assert_eq!(parse_consideration(&json!("₹ 90,00,000/-")), 9_000_000.0);
        assert_eq!(parse_consideration(&json!("Rs. 45,50,000")), 4_550_000.0);
        assert_eq!(parse_consideration(&json!("INR 1200000.50")), 1_200_000.5);
        assert_eq!(parse_consideration(&json!("n/a")), 0.0);
        assert_eq!(parse_consideration(&json!(null)), 0.0);
        assert_eq!(parse_consideration(&json!(-5)), 0.0);
    }

    #[test]
    fn test_record_from_row() {
        let table = Table::from_rows(vec![row(json!({
            "DESCRIPTION": "Flat 45 sq.mt",
            "consideration": "45,00,000",
            "Property": " Alpha ",
            "Village": "Baner"
        }))]);
        let records = table.records(&ColumnConfig::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description, "Flat 45 sq.mt");
        assert_eq!(records[0].consideration, 4_500_000.0);
        assert_eq!(records[0].property, "Alpha");
        assert_eq!(records[0].fields["Village"], json!("Baner"));
    }
}
