//! Read worksheets into tables
//!
//! The first row of a sheet is its header. Blank header cells are named
//! `Unnamed: N` and repeated names get a `.1`, `.2` suffix so every column
//! stays addressable.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use calamine::{Data, Range, Reader, Xlsx, open_workbook};

use crate::table::{Cell, Table, serial_to_date};

/// Largest float that still converts exactly to an integer
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

fn open(path: &Path) -> Result<Xlsx<std::io::BufReader<std::fs::File>>> {
    open_workbook(path).with_context(|| format!("Failed to open Excel file: {}", path.display()))
}

pub fn sheet_names(path: &Path) -> Result<Vec<String>> {
    Ok(open(path)?.sheet_names())
}

/// Read one named sheet
pub fn read_sheet(path: &Path, sheet: &str) -> Result<Table> {
    let mut workbook = open(path)?;
    if !workbook.sheet_names().iter().any(|name| name == sheet) {
        anyhow::bail!("Sheet '{}' not found in {}", sheet, path.display());
    }
    let range = workbook
        .worksheet_range(sheet)
        .with_context(|| format!("Failed to read sheet '{}' of {}", sheet, path.display()))?;
    Ok(range_to_table(&range))
}

/// Read the first sheet, returning its name too
pub fn read_first_sheet(path: &Path) -> Result<(String, Table)> {
    let mut workbook = open(path)?;
    let sheet = workbook
        .sheet_names()
        .first()
        .with_context(|| format!("Excel file has no sheets: {}", path.display()))?
        .clone();
    let range = workbook
        .worksheet_range(&sheet)
        .with_context(|| format!("Failed to read sheet '{}' of {}", sheet, path.display()))?;
    Ok((sheet, range_to_table(&range)))
}

/// Read every sheet in workbook order
pub fn read_all_sheets(path: &Path) -> Result<Vec<(String, Table)>> {
    let mut workbook = open(path)?;
    let mut sheets = Vec::new();
    for sheet in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&sheet)
            .with_context(|| format!("Failed to read sheet '{}' of {}", sheet, path.display()))?;
        sheets.push((sheet, range_to_table(&range)));
    }
    Ok(sheets)
}

fn range_to_table(range: &Range<Data>) -> Table {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Table::new::<&str>(&[]);
    };
    let columns = header_names(header);
    let width = columns.len();

    let body = rows
        .map(|row| {
            let mut cells: Vec<Cell> = row.iter().take(width).map(data_to_cell).collect();
            cells.resize(width, Cell::Null);
            cells
        })
        .collect();
    Table::from_rows(columns.as_slice(), body).unwrap_or_else(|_| Table::new(columns.as_slice()))
}

fn header_names(header: &[Data]) -> Vec<String> {
    let mut seen = HashSet::new();
    header
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let base = data_to_cell(cell)
                .to_text()
                .unwrap_or_else(|| format!("Unnamed: {}", idx));
            let mut name = base.clone();
            let mut suffix = 1;
            while !seen.insert(name.clone()) {
                name = format!("{}.{}", base, suffix);
                suffix += 1;
            }
            name
        })
        .collect()
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Null,
        Data::String(s) if s.trim().is_empty() => Cell::Null,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < MAX_EXACT_INT => Cell::Int(*f as i64),
        Data::Float(f) => Cell::float(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => serial_to_date(dt.as_f64()).map_or(Cell::Null, Cell::Date),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}
