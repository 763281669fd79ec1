//! REUC identity substitution
//!
//! A registered company can be temporarily replaced by another one. While the
//! replacement window is open, every unit owned by the old company is
//! reported under the replacement's id and name.

use std::collections::HashMap;

use chrono::NaiveDate;
use log::{info, warn};

use crate::table::{Cell, Result, Table};

pub const REUC_ID: &str = "reuc_id";
pub const REUC_NAME: &str = "reuc_name";
pub const REUC_NEW_ID: &str = "reuc_new_id";
pub const START_DATE: &str = "ReplacementStartDate";
pub const END_DATE: &str = "ReplacementEndDate";

/// Whether `today` lies inside `[start, end]`, both bounds inclusive and required
pub fn window_contains(start: &Cell, end: &Cell, today: NaiveDate) -> bool {
    match (start.as_date(), end.as_date()) {
        (Some(start), Some(end)) => start <= today && today <= end,
        _ => false,
    }
}

/// Replace `reuc_id` / `reuc_name` on every row with an open replacement window.
///
/// `agents` supplies the display name of the replacement company
/// (`reuc_id`, `reuc_name`). Returns the rewritten table and the number of
/// substituted rows.
pub fn apply_substitutions(
    table: Table,
    agents: &Table,
    today: NaiveDate,
) -> Result<(Table, usize)> {
    for column in [REUC_ID, REUC_NAME, REUC_NEW_ID, START_DATE, END_DATE] {
        table.require(column)?;
    }
    agents.require(REUC_ID)?;
    agents.require(REUC_NAME)?;

    let names: HashMap<String, Cell> = agents
        .rows()
        .filter_map(|row| {
            row.get(REUC_ID)
                .key()
                .map(|key| (key, row.get(REUC_NAME).clone()))
        })
        .collect();

    let active: Vec<bool> = table
        .rows()
        .map(|row| {
            !row.get(REUC_NEW_ID).is_null()
                && window_contains(row.get(START_DATE), row.get(END_DATE), today)
        })
        .collect();

    let mut ids = Vec::with_capacity(table.len());
    let mut display = Vec::with_capacity(table.len());
    for (row, &is_active) in table.rows().zip(&active) {
        if !is_active {
            ids.push(row.get(REUC_ID).clone());
            display.push(row.get(REUC_NAME).clone());
            continue;
        }
        let new_id = row.get(REUC_NEW_ID);
        let name = new_id
            .key()
            .and_then(|key| names.get(&key).cloned())
            .unwrap_or_else(|| {
                warn!("Replacement REUC id {} has no registered company name", new_id);
                Cell::Null
            });
        info!(
            "REUC {} is under substitution by {} until {}",
            row.get(REUC_ID),
            new_id,
            row.get(END_DATE)
        );
        ids.push(new_id.clone());
        display.push(name);
    }

    let substituted = active.iter().filter(|a| **a).count();
    let table = table
        .with_column(REUC_ID, ids)?
        .with_column(REUC_NAME, display)?;
    Ok((table, substituted))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn units() -> Table {
        Table::from_rows(
            &["UnitID", REUC_ID, REUC_NAME, REUC_NEW_ID, START_DATE, END_DATE],
            vec![
                vec![
                    Cell::Int(1),
                    Cell::text("100"),
                    Cell::text("Old Co"),
                    Cell::Int(200),
                    Cell::Date(date(2024, 1, 1)),
                    Cell::Date(date(2024, 12, 31)),
                ],
                vec![
                    Cell::Int(2),
                    Cell::text("101"),
                    Cell::text("Plain Co"),
                    Cell::Null,
                    Cell::Null,
                    Cell::Null,
                ],
            ],
        )
        .unwrap()
    }

    fn agents() -> Table {
        Table::from_rows(
            &[REUC_ID, REUC_NAME],
            vec![
                vec![Cell::Float(100.0), Cell::text("Old Co")],
                vec![Cell::Float(200.0), Cell::text("New Co")],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_window_is_inclusive() {
        let start = Cell::Date(date(2024, 1, 1));
        let end = Cell::Date(date(2024, 12, 31));
        assert!(window_contains(&start, &end, date(2024, 1, 1)));
        assert!(window_contains(&start, &end, date(2024, 12, 31)));
        assert!(!window_contains(&start, &end, date(2023, 12, 31)));
        assert!(!window_contains(&start, &end, date(2025, 1, 1)));
        assert!(!window_contains(&Cell::Null, &end, date(2024, 6, 1)));
    }

    #[test]
    fn test_substitution_inside_window() {
        let (table, count) = apply_substitutions(units(), &agents(), date(2024, 6, 1)).unwrap();
        assert_eq!(count, 1);
        let first = table.row(0).unwrap();
        assert_eq!(first.get(REUC_ID), &Cell::Int(200));
        assert_eq!(first.get(REUC_NAME), &Cell::text("New Co"));
        let second = table.row(1).unwrap();
        assert_eq!(second.get(REUC_ID), &Cell::text("101"));
        assert_eq!(second.get(REUC_NAME), &Cell::text("Plain Co"));
    }

    #[test]
    fn test_substitution_outside_window_keeps_identity() {
        let (table, count) = apply_substitutions(units(), &agents(), date(2025, 1, 1)).unwrap();
        assert_eq!(count, 0);
        assert_eq!(table, units());
    }

    #[test]
    fn test_unknown_replacement_name_is_null() {
        let agents = Table::from_rows(&[REUC_ID, REUC_NAME], vec![]).unwrap();
        let (table, count) = apply_substitutions(units(), &agents, date(2024, 6, 1)).unwrap();
        assert_eq!(count, 1);
        assert_eq!(table.row(0).unwrap().get(REUC_NAME), &Cell::Null);
    }
}
