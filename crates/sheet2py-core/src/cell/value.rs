//! Cell value types

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value read from a workbook cell
///
/// Formula cells are described by their formula text, not by a value; this
/// type only carries what a constant cell holds. In a workbook dump the
/// scalar variants are written as plain JSON (`3`, `"text"`, `true`, `null`)
/// and the tagged ones as objects (`{"date": "2018-07-05T00:00:00"}`,
/// `{"error": "#N/A"}`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Empty cell (no value)
    #[default]
    Empty,

    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// Numeric value
    Number(f64),

    /// Date/time value
    Date {
        /// The stored moment
        date: NaiveDateTime,
    },

    /// Error value (#VALUE!, #REF!, etc.)
    Error {
        /// The error literal as displayed by the spreadsheet
        error: String,
    },

    /// String value
    String(String),
}

impl CellValue {
    /// Create a new string value
    pub fn string<S: Into<String>>(s: S) -> Self {
        CellValue::String(s.into())
    }

    /// Create a date value
    pub fn date(date: NaiveDateTime) -> Self {
        CellValue::Date { date }
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Check if the cell contains an error
    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error { .. })
    }

    /// Try to get the value as a number
    ///
    /// Dates convert to their spreadsheet serial number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Date { date } => Some(excel_serial(date)),
            _ => None,
        }
    }

    /// Try to get the value as a string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Boolean(_) => "boolean",
            CellValue::Number(_) => "number",
            CellValue::Date { .. } => "date",
            CellValue::Error { .. } => "error",
            CellValue::String(_) => "string",
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => write!(f, ""),
            CellValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Date { date } => write!(f, "{}", date),
            CellValue::Error { error } => write!(f, "{}", error),
            CellValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(date: NaiveDateTime) -> Self {
        CellValue::Date { date }
    }
}

/// Spreadsheet serial number of a date (days since 1899-12-30)
///
/// This is the 1900 date system as spreadsheets store it, including the
/// phantom 1900-02-29 that shifts every later date by one.
pub fn excel_serial(date: &NaiveDateTime) -> f64 {
    let era = NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    let delta = *date - era;
    delta.num_milliseconds() as f64 / 86_400_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_excel_serial() {
        assert_eq!(excel_serial(&ymd(1900, 1, 1)), 2.0);
        assert_eq!(excel_serial(&ymd(2018, 1, 1)), 43101.0);
        let noon = NaiveDate::from_ymd_opt(2018, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(excel_serial(&noon), 43101.5);
    }

    #[test]
    fn test_deserialize_scalars() {
        let values: Vec<CellValue> =
            serde_json::from_str(r##"[null, true, 2.5, "text", {"error": "#N/A"}]"##).unwrap();
        assert_eq!(
            values,
            vec![
                CellValue::Empty,
                CellValue::Boolean(true),
                CellValue::Number(2.5),
                CellValue::string("text"),
                CellValue::Error {
                    error: "#N/A".into()
                },
            ]
        );
    }

    #[test]
    fn test_deserialize_date() {
        let value: CellValue = serde_json::from_str(r#"{"date": "2018-07-05T00:00:00"}"#).unwrap();
        assert_eq!(value, CellValue::date(ymd(2018, 7, 5)));
        assert_eq!(value.as_number(), Some(excel_serial(&ymd(2018, 7, 5))));
    }
}
