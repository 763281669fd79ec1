//! In-memory tables
//!
//! A small, row-ordered table type with the handful of dataframe operations the
//! pipelines need: selection, renaming, derived columns, filtering,
//! concatenation, de-duplication, explode and merges. Every operation returns a
//! new table and preserves row order unless documented otherwise.

mod join;
mod json;
mod value;

pub use join::{Cardinality, JoinKind, Merge};
pub use value::{Cell, serial_to_date};

use std::collections::HashSet;

use thiserror::Error;

/// Errors raised by table operations
#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("column '{0}' not found")]
    MissingColumn(String),
    #[error("row has {found} cells but the table has {expected} columns")]
    RowWidth { expected: usize, found: usize },
    #[error("merge key '{key}' appears more than once on the {side} side")]
    DuplicateKey { key: String, side: &'static str },
}

pub type Result<T> = std::result::Result<T, TableError>;

/// Ordered columns plus rows of cells, each row as wide as the header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

/// Borrowed view of one table row, addressed by column name
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    cells: &'a [Cell],
}

static NULL: Cell = Cell::Null;

impl<'a> Row<'a> {
    /// Cell under `column`, or `Null` when the table has no such column.
    /// Use `try_get` where a missing column is a mistake.
    pub fn get(&self, column: &str) -> &'a Cell {
        self.try_get(column).unwrap_or(&NULL)
    }

    /// Cell under `column`, or `MissingColumn`
    pub fn try_get(&self, column: &str) -> Result<&'a Cell> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.cells[idx])
            .ok_or_else(|| TableError::MissingColumn(column.to_string()))
    }

    pub fn cells(&self) -> &'a [Cell] {
        self.cells
    }
}

impl Table {
    /// Empty table with the given header
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a table from a header and rows, checking row widths
    pub fn from_rows<S: AsRef<str>>(columns: &[S], rows: Vec<Vec<Cell>>) -> Result<Self> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Index of `name`, or `MissingColumn`
    pub fn require(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|cells| Row {
            columns: &self.columns,
            cells,
        })
    }

    pub fn row(&self, idx: usize) -> Option<Row<'_>> {
        self.rows.get(idx).map(|cells| Row {
            columns: &self.columns,
            cells,
        })
    }

    /// All cells of one column, top to bottom
    pub fn column(&self, name: &str) -> Result<Vec<&Cell>> {
        let idx = self.require(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Keep only `names`, in that order
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table> {
        let indices = names
            .iter()
            .map(|n| self.require(n.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Table {
            columns: names.iter().map(|n| n.as_ref().to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| indices.iter().map(|&i| r[i].clone()).collect())
                .collect(),
        })
    }

    /// Remove `names`; every one of them must exist
    pub fn drop_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<Table> {
        for name in names {
            self.require(name.as_ref())?;
        }
        let keep: Vec<&str> = self
            .columns
            .iter()
            .map(String::as_str)
            .filter(|c| !names.iter().any(|n| n.as_ref() == *c))
            .collect();
        self.select(&keep)
    }

    /// Rename columns by `(from, to)` pairs; unknown `from` names are ignored
    pub fn rename(mut self, mapping: &[(&str, &str)]) -> Table {
        for column in &mut self.columns {
            if let Some((_, to)) = mapping.iter().find(|(from, _)| from == column) {
                *column = to.to_string();
            }
        }
        self
    }

    /// Add `name` at the end, or replace it in place when it already exists
    pub fn with_column(mut self, name: &str, values: Vec<Cell>) -> Result<Table> {
        if values.len() != self.rows.len() {
            return Err(TableError::RowWidth {
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(self)
    }

    /// Compute `name` from every row at once
    pub fn derive_column<F>(self, name: &str, f: F) -> Result<Table>
    where
        F: Fn(Row<'_>) -> Cell,
    {
        let values: Vec<Cell> = self.rows().map(f).collect();
        self.with_column(name, values)
    }

    /// Rewrite an existing column cell by cell
    pub fn map_column<F>(mut self, name: &str, f: F) -> Result<Table>
    where
        F: Fn(&Cell) -> Cell,
    {
        let idx = self.require(name)?;
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
        Ok(self)
    }

    /// Keep rows matching `predicate`
    pub fn filter<F>(&self, predicate: F) -> Table
    where
        F: Fn(Row<'_>) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|cells| {
                    predicate(Row {
                        columns: &self.columns,
                        cells,
                    })
                })
                .cloned()
                .collect(),
        }
    }

    /// Stack tables vertically. The header is the union of all headers in
    /// order of first appearance; absent cells are `Null`.
    pub fn concat(tables: &[Table]) -> Table {
        let mut columns: Vec<String> = Vec::new();
        for table in tables {
            for column in &table.columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }

        let mut rows = Vec::new();
        for table in tables {
            let mapping: Vec<Option<usize>> =
                columns.iter().map(|c| table.column_index(c)).collect();
            for row in &table.rows {
                rows.push(
                    mapping
                        .iter()
                        .map(|m| m.map(|i| row[i].clone()).unwrap_or(Cell::Null))
                        .collect(),
                );
            }
        }

        Table { columns, rows }
    }

    /// Drop rows whose `subset` values repeat an earlier row, keeping the first.
    /// Null values compare equal to each other here.
    pub fn drop_duplicates<S: AsRef<str>>(&self, subset: &[S]) -> Result<Table> {
        let indices = subset
            .iter()
            .map(|n| self.require(n.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let mut seen: HashSet<Vec<Option<String>>> = HashSet::new();
        let rows = self
            .rows
            .iter()
            .filter(|row| seen.insert(indices.iter().map(|&i| row[i].key()).collect()))
            .cloned()
            .collect();
        Ok(Table {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Drop rows in which every cell is `Null`
    pub fn drop_empty_rows(&self) -> Table {
        self.filter(|row| row.cells().iter().any(|c| !c.is_null()))
    }

    /// Split a text column on `delimiter` and emit one row per part.
    /// Non-text cells pass through unchanged.
    pub fn explode_split(&self, name: &str, delimiter: char) -> Result<Table> {
        let idx = self.require(name)?;
        let mut rows = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            match &row[idx] {
                Cell::Text(s) => {
                    for part in s.split(delimiter) {
                        let mut new_row = row.clone();
                        new_row[idx] = Cell::text(part);
                        rows.push(new_row);
                    }
                }
                _ => rows.push(row.clone()),
            }
        }
        Ok(Table {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Split into one table per distinct value of `name`, in order of first
    /// appearance, each without the partition column. Null values form a
    /// partition labelled with an empty string.
    pub fn partition_by(&self, name: &str) -> Result<Vec<(String, Table)>> {
        let idx = self.require(name)?;
        let inner = self.drop_columns(&[name])?;
        let mut parts: Vec<(String, Table)> = Vec::new();
        for (row, projected) in self.rows.iter().zip(inner.rows) {
            let label = row[idx].to_string();
            match parts.iter_mut().find(|(l, _)| *l == label) {
                Some((_, table)) => table.rows.push(projected),
                None => {
                    let mut table = Table::new(&inner.columns);
                    table.rows.push(projected);
                    parts.push((label, table));
                }
            }
        }
        Ok(parts)
    }

    /// Set of join keys present in `name`
    pub fn key_set(&self, name: &str) -> Result<HashSet<String>> {
        let idx = self.require(name)?;
        Ok(self.rows.iter().filter_map(|r| r[idx].key()).collect())
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<Vec<Cell>>) {
        (self.columns, self.rows)
    }
}
