//! Cell values for in-memory tables

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

/// A single table cell. `Null` is the only missing-value marker.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Missing value
    Null,
    /// Free text
    Text(String),
    /// Whole number
    Int(i64),
    /// Floating point, always finite
    Float(f64),
    /// Boolean flag
    Bool(bool),
    /// Calendar date
    Date(NaiveDate),
}

/// Text formats accepted when reading dates out of text cells, tried in order.
/// Two-digit years come last so `15-07-24` is read day-first.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%Y/%m/%d", "%d-%m-%y", "%d/%m/%y",
];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%d-%m-%Y %H:%M:%S"];

/// Largest serial number a workbook can hold (9999-12-31)
const MAX_SERIAL_DATE: f64 = 2_958_465.0;

impl Cell {
    /// Build a float cell, mapping NaN and infinities to `Null`
    pub fn float(value: f64) -> Self {
        if value.is_finite() {
            Cell::Float(value)
        } else {
            Cell::Null
        }
    }

    /// Build a text cell
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Wrap an optional value, `None` becoming `Null`
    pub fn from_option<T: Into<Cell>>(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Borrow the text of a `Text` cell
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of `Int` and `Float` cells. Text is never parsed here;
    /// use `transform::numeric` for that.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Integer view of `Int` cells and integral `Float` cells
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(i) => Some(*i),
            Cell::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Some(*f as i64),
            _ => None,
        }
    }

    /// Textual form of any non-null cell
    pub fn to_text(&self) -> Option<String> {
        if self.is_null() {
            None
        } else {
            Some(self.to_string())
        }
    }

    /// Canonical join key.
    ///
    /// Integers and integral floats share a key (`5` and `5.0` both give `"5"`),
    /// text is trimmed, and null or blank cells have no key at all.
    pub fn key(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Cell::Float(_) => match self.as_i64() {
                Some(i) => Some(i.to_string()),
                None => Some(self.to_string()),
            },
            other => Some(other.to_string()),
        }
    }

    /// Interpret the cell as a calendar date.
    ///
    /// Accepts date cells, ISO or day-first text, and spreadsheet serial numbers
    /// (days since 1899-12-30).
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            Cell::Text(s) => parse_date_text(s.trim()),
            Cell::Int(_) | Cell::Float(_) => self.as_f64().and_then(serial_to_date),
            _ => None,
        }
    }
}

/// Years a workbook date can hold
fn in_workbook_range(date: &NaiveDate) -> bool {
    (1900..=9999).contains(&date.year())
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    let dates = DATE_FORMATS
        .iter()
        .filter_map(|format| NaiveDate::parse_from_str(s, format).ok());
    let datetimes = DATETIME_FORMATS
        .iter()
        .filter_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .map(|dt| dt.date());
    // Fractional seconds and offsets
    let rfc3339 = chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.date_naive());

    dates
        .chain(datetimes)
        .chain(rfc3339)
        .find(in_workbook_range)
}

/// Convert a spreadsheet serial day number into a date
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=MAX_SERIAL_DATE).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::float(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

impl From<NaiveDate> for Cell {
    fn from(value: NaiveDate) -> Self {
        Cell::Date(value)
    }
}

impl From<&serde_json::Value> for Cell {
    /// Scalars map onto their cell type; arrays and objects keep their JSON text.
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Cell::Null,
            serde_json::Value::Bool(b) => Cell::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Cell::Int(i)
                } else {
                    n.as_f64().map(Cell::float).unwrap_or(Cell::Null)
                }
            }
            serde_json::Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_float_rejects_non_finite() {
        assert_eq!(Cell::float(f64::NAN), Cell::Null);
        assert_eq!(Cell::float(f64::INFINITY), Cell::Null);
        assert_eq!(Cell::float(1.5), Cell::Float(1.5));
    }

    #[test]
    fn test_key_unifies_integral_numbers() {
        assert_eq!(Cell::Int(5).key(), Some("5".to_string()));
        assert_eq!(Cell::Float(5.0).key(), Some("5".to_string()));
        assert_eq!(Cell::text(" 5 ").key(), Some("5".to_string()));
        assert_eq!(Cell::Float(5.5).key(), Some("5.5".to_string()));
    }

    #[test]
    fn test_key_null_and_blank_have_no_key() {
        assert_eq!(Cell::Null.key(), None);
        assert_eq!(Cell::text("   ").key(), None);
    }

    #[test]
    fn test_as_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(Cell::text("2024-03-15").as_date(), Some(expected));
        assert_eq!(Cell::text("15-03-2024").as_date(), Some(expected));
        assert_eq!(Cell::text("15/03/2024").as_date(), Some(expected));
        assert_eq!(Cell::text("2024-03-15 10:30:00").as_date(), Some(expected));
        assert_eq!(Cell::Date(expected).as_date(), Some(expected));
        assert_eq!(Cell::text("sin fecha").as_date(), None);
    }

    #[test]
    fn test_as_date_two_digit_year_is_day_first() {
        assert_eq!(
            Cell::text("15-07-24").as_date(),
            NaiveDate::from_ymd_opt(2024, 7, 15)
        );
        assert_eq!(
            Cell::text("01/02/99").as_date(),
            NaiveDate::from_ymd_opt(1999, 2, 1)
        );
    }

    #[test]
    fn test_as_date_rejects_years_outside_workbook_range() {
        assert_eq!(Cell::text("0015-07-24").as_date(), None);
        assert_eq!(Cell::text("31-12-1899").as_date(), None);
    }

    #[test]
    fn test_as_date_serial() {
        // 45292 is 2024-01-01 in the 1900 date system
        assert_eq!(
            Cell::Float(45292.0).as_date(),
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
        assert_eq!(Cell::Int(-3).as_date(), None);
    }

    #[test]
    fn test_from_json() {
        assert_eq!(Cell::from(&json!(null)), Cell::Null);
        assert_eq!(Cell::from(&json!(12)), Cell::Int(12));
        assert_eq!(Cell::from(&json!(1.25)), Cell::Float(1.25));
        assert_eq!(Cell::from(&json!("220")), Cell::text("220"));
        assert_eq!(Cell::from(&json!([1, 2])), Cell::text("[1,2]"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Cell::Float(600.0).to_string(), "600");
        assert_eq!(Cell::Float(0.6).to_string(), "0.6");
        assert_eq!(Cell::Null.to_string(), "");
        assert_eq!(Cell::Null.to_text(), None);
    }
}
