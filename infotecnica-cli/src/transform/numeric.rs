//! Numeric normalisation of Infotécnica text values

use once_cell::sync::Lazy;
use regex::Regex;

use crate::table::{Cell, Result, Table};

static FIRST_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-+]?\d*\.?\d+").expect("valid number pattern"));
static ALL_NUMBERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid number pattern"));

/// Parse a decimal that may use a comma as decimal separator.
///
/// Empty, non-numeric and non-finite inputs give `None`.
pub fn parse_decimal(text: &str) -> Option<f64> {
    let normalised = text.trim().replace(',', ".");
    if normalised.is_empty() {
        return None;
    }
    normalised.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coerce any cell to a float cell; anything unparseable becomes `Null`
pub fn to_float(cell: &Cell) -> Cell {
    match cell {
        Cell::Int(i) => Cell::Float(*i as f64),
        Cell::Float(f) => Cell::float(*f),
        Cell::Text(s) => Cell::from_option(parse_decimal(s)),
        _ => Cell::Null,
    }
}

/// Apply `to_float` to each of `columns`
pub fn columns_to_float(mut table: Table, columns: &[&str]) -> Result<Table> {
    for column in columns {
        table = table.map_column(column, to_float)?;
    }
    Ok(table)
}

/// First signed decimal number inside `text` (`"5 A"` → `"5"`)
pub fn first_number(text: &str) -> Option<&str> {
    FIRST_NUMBER.find(text).map(|m| m.as_str())
}

/// Every unsigned decimal number inside `text`, in order
pub fn all_numbers(text: &str) -> Vec<&str> {
    ALL_NUMBERS.find_iter(text).map(|m| m.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("220"), Some(220.0));
        assert_eq!(parse_decimal(" 1,25 "), Some(1.25));
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("s/i"), None);
        assert_eq!(parse_decimal("nan"), None);
        assert_eq!(parse_decimal("inf"), None);
    }

    #[test]
    fn test_to_float() {
        assert_eq!(to_float(&Cell::text("0,6")), Cell::Float(0.6));
        assert_eq!(to_float(&Cell::Int(154)), Cell::Float(154.0));
        assert_eq!(to_float(&Cell::text("-")), Cell::Null);
        assert_eq!(to_float(&Cell::Bool(true)), Cell::Null);
    }

    #[test]
    fn test_columns_to_float() {
        let table = Table::from_rows(
            &["a", "b"],
            vec![vec![Cell::text("1,5"), Cell::text("x")]],
        )
        .unwrap();
        let table = columns_to_float(table, &["a", "b"]).unwrap();
        assert_eq!(table.row(0).unwrap().get("a"), &Cell::Float(1.5));
        assert_eq!(table.row(0).unwrap().get("b"), &Cell::Null);
    }

    #[test]
    fn test_number_extraction() {
        assert_eq!(first_number("5 A"), Some("5"));
        assert_eq!(first_number(" 1.5-1.5"), Some("1.5"));
        assert_eq!(first_number("sin dato"), None);
        assert_eq!(
            all_numbers("600-1200/5-5 A"),
            vec!["600", "1200", "5", "5"]
        );
        assert_eq!(all_numbers("2000:1"), vec!["2000", "1"]);
    }
}
