//! Write tables to workbooks
//!
//! Every writer lays a header row out first and writes cells in table order.
//! Missing values are written as the given placeholder, or left blank when the
//! placeholder is empty. Snapshots may be rewritten freely; timestamped reports
//! get their path from `new_report_path`, which refuses to reuse a file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDateTime};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet};

use crate::table::{Cell, Table};

/// Worksheet names are limited to this many characters
const MAX_SHEET_NAME: usize = 31;

const INVALID_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// Single-sheet workbook
pub fn write_table(path: &Path, sheet: &str, table: &Table, placeholder: &str) -> Result<()> {
    write_sheets(path, &[(sheet.to_string(), table.clone())], placeholder)
}

/// Workbook with one worksheet per `(name, table)` in the given order
pub fn write_sheets(path: &Path, sheets: &[(String, Table)], placeholder: &str) -> Result<()> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let date = Format::new().set_num_format("yyyy-mm-dd");
    let mut used = HashSet::new();

    for (name, table) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sanitize_sheet_name(name, &mut used))?;
        write_worksheet(worksheet, table, placeholder, &header, &date)?;
    }
    if sheets.is_empty() {
        workbook.add_worksheet();
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    workbook
        .save(path)
        .with_context(|| format!("Failed to save Excel file: {}", path.display()))?;
    Ok(())
}

/// One worksheet per distinct value of `column`, in first-appearance order,
/// with `column` itself left out. Returns the number of sheets written.
pub fn write_partitioned(
    path: &Path,
    table: &Table,
    column: &str,
    placeholder: &str,
) -> Result<usize> {
    let sheets = table.partition_by(column)?;
    write_sheets(path, &sheets, placeholder)?;
    Ok(sheets.len())
}

fn write_worksheet(
    worksheet: &mut Worksheet,
    table: &Table,
    placeholder: &str,
    header: &Format,
    date: &Format,
) -> Result<()> {
    for (col, name) in table.columns().iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, name, header)?;
    }
    for (idx, row) in table.rows().enumerate() {
        let row_num = (idx + 1) as u32;
        for (col, cell) in row.cells().iter().enumerate() {
            write_cell(worksheet, row_num, col as u16, cell, placeholder, date)?;
        }
    }
    Ok(())
}

fn write_cell(
    ws: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &Cell,
    placeholder: &str,
    date: &Format,
) -> Result<()> {
    match cell {
        Cell::Null if placeholder.is_empty() => {}
        Cell::Null => {
            ws.write_string(row, col, placeholder)?;
        }
        Cell::Text(s) => {
            ws.write_string(row, col, s)?;
        }
        Cell::Int(i) => {
            ws.write_number(row, col, *i as f64)?;
        }
        Cell::Float(f) => {
            ws.write_number(row, col, *f)?;
        }
        Cell::Bool(b) => {
            ws.write_boolean(row, col, *b)?;
        }
        Cell::Date(d) => {
            let year = u16::try_from(d.year()).unwrap_or(0);
            match ExcelDateTime::from_ymd(year, d.month() as u8, d.day() as u8) {
                Ok(value) => {
                    ws.write_datetime_with_format(row, col, &value, date)?;
                }
                // Outside 1900-9999 a workbook cannot hold it as a date
                Err(_) => {
                    ws.write_string(row, col, d.format("%Y-%m-%d").to_string())?;
                }
            }
        }
    }
    Ok(())
}

/// Make `name` a valid, unused worksheet name
pub fn sanitize_sheet_name(name: &str, used: &mut HashSet<String>) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if INVALID_SHEET_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'');
    let base: String = if cleaned.is_empty() {
        "Sheet".to_string()
    } else {
        cleaned.chars().take(MAX_SHEET_NAME).collect()
    };

    let mut candidate = base.clone();
    let mut n = 1;
    while !used.insert(candidate.to_lowercase()) {
        let suffix = format!(" ({})", n);
        let keep = MAX_SHEET_NAME - suffix.chars().count();
        candidate = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
        n += 1;
    }
    candidate
}

/// Path for a new report in `dir`.
///
/// With a run time the name is `"{stem} at YYYY.MM.DD HH.MM.SS.xlsx"`,
/// otherwise `"{stem}.xlsx"`. Fails if that file already exists.
pub fn new_report_path(dir: &Path, stem: &str, run_at: Option<NaiveDateTime>) -> Result<PathBuf> {
    let file = match run_at {
        Some(at) => format!("{} at {}.xlsx", stem, at.format("%Y.%m.%d %H.%M.%S")),
        None => format!("{}.xlsx", stem),
    };
    let path = dir.join(file);
    if path.exists() {
        anyhow::bail!("Report already exists, refusing to overwrite: {}", path.display());
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::reader::{read_all_sheets, read_sheet};
    use chrono::NaiveDate;

    fn lines() -> Table {
        Table::from_rows(
            &["Zona", "ID", "Capacidad (MVA)"],
            vec![
                vec![Cell::text("Norte"), Cell::Int(1), Cell::Float(381.0)],
                vec![Cell::text("Sur"), Cell::Int(2), Cell::Null],
                vec![Cell::text("Norte"), Cell::Int(3), Cell::Float(133.5)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_partitioned_sheets_in_first_appearance_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ttcc.xlsx");
        assert_eq!(write_partitioned(&path, &lines(), "Zona", "-").unwrap(), 2);

        let sheets = read_all_sheets(&path).unwrap();
        let names: Vec<&str> = sheets.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Norte", "Sur"]);

        let norte = &sheets[0].1;
        assert_eq!(norte.columns(), &["ID", "Capacidad (MVA)"]);
        assert_eq!(norte.len(), 2);
        assert_eq!(norte.row(1).unwrap().get("ID"), &Cell::Int(3));

        let sur = &sheets[1].1;
        assert_eq!(sur.row(0).unwrap().get("Capacidad (MVA)"), &Cell::text("-"));
    }

    #[test]
    fn test_blank_placeholder_leaves_cells_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.xlsx");
        write_table(&path, "Sheet1", &lines(), "").unwrap();
        let table = read_sheet(&path, "Sheet1").unwrap();
        assert_eq!(table.row(1).unwrap().get("Capacidad (MVA)"), &Cell::Null);
    }

    #[test]
    fn test_dates_outside_workbook_range_are_written_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fechas.xlsx");
        let table = Table::from_rows(
            &["ID", "Fecha EO 2"],
            vec![
                vec![Cell::Int(1), Cell::Date(NaiveDate::from_ymd_opt(1899, 12, 31).unwrap())],
                vec![Cell::Int(2), Cell::Date(NaiveDate::from_ymd_opt(15, 7, 24).unwrap())],
                vec![Cell::Int(3), Cell::Date(NaiveDate::from_ymd_opt(2024, 7, 15).unwrap())],
            ],
        )
        .unwrap();
        write_table(&path, "Sheet1", &table, "-").unwrap();

        let read = read_sheet(&path, "Sheet1").unwrap();
        assert_eq!(read.row(0).unwrap().get("Fecha EO 2"), &Cell::text("1899-12-31"));
        assert_eq!(read.row(1).unwrap().get("Fecha EO 2"), &Cell::text("0015-07-24"));
        assert_eq!(
            read.row(2).unwrap().get("Fecha EO 2"),
            &Cell::Date(NaiveDate::from_ymd_opt(2024, 7, 15).unwrap())
        );
    }

    #[test]
    fn test_sanitize_sheet_name() {
        let mut used = HashSet::new();
        assert_eq!(sanitize_sheet_name("Norte/Centro", &mut used), "Norte_Centro");
        assert_eq!(sanitize_sheet_name("norte_centro", &mut used), "norte_centro (1)");
        assert_eq!(sanitize_sheet_name("", &mut used), "Sheet");
        let long = "Zona de transmisión nacional extremo norte";
        let name = sanitize_sheet_name(long, &mut used);
        assert_eq!(name.chars().count(), 31);
        assert!(long.starts_with(&name));
    }

    #[test]
    fn test_report_path_is_timestamped_and_write_once() {
        let dir = tempfile::tempdir().unwrap();
        let at = NaiveDate::from_ymd_opt(2025, 11, 3)
            .unwrap()
            .and_hms_opt(9, 5, 7)
            .unwrap();
        let path = new_report_path(dir.path(), "Lineas_ERST_final", Some(at)).unwrap();
        assert_eq!(
            path.file_name().unwrap(),
            "Lineas_ERST_final at 2025.11.03 09.05.07.xlsx"
        );

        write_table(&path, "Norte", &lines(), "-").unwrap();
        assert!(new_report_path(dir.path(), "Lineas_ERST_final", Some(at)).is_err());
        assert_eq!(
            new_report_path(dir.path(), "output", None)
                .unwrap()
                .file_name()
                .unwrap(),
            "output.xlsx"
        );
    }
}
