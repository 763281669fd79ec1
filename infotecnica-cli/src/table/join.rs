//! Key-based merges between tables

use std::collections::{HashMap, HashSet};

use super::{Cell, Result, Table, TableError};

/// Which unmatched rows survive a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Only matching pairs
    Inner,
    /// Every left row; unmatched ones get `Null` right-hand columns
    Left,
    /// Left semantics plus unmatched right rows appended in right order
    Outer,
}

/// Expected key multiplicity, checked before any rows are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Keys unique on both sides
    OneToOne,
    /// Keys unique on the right side
    ManyToOne,
}

/// Merge settings: join kind, key columns on each side, optional
/// cardinality check.
#[derive(Debug, Clone)]
pub struct Merge {
    how: JoinKind,
    left_on: Vec<String>,
    right_on: Vec<String>,
    validate: Option<Cardinality>,
}

impl Merge {
    /// Merge on key columns that share their names on both sides
    pub fn on(how: JoinKind, keys: &[&str]) -> Self {
        Self::left_right(how, keys, keys)
    }

    /// Merge on differently named key columns, paired positionally
    pub fn left_right(how: JoinKind, left_on: &[&str], right_on: &[&str]) -> Self {
        debug_assert_eq!(left_on.len(), right_on.len());
        Self {
            how,
            left_on: left_on.iter().map(|s| s.to_string()).collect(),
            right_on: right_on.iter().map(|s| s.to_string()).collect(),
            validate: None,
        }
    }

    pub fn validate(mut self, cardinality: Cardinality) -> Self {
        self.validate = Some(cardinality);
        self
    }

    pub fn apply(&self, left: &Table, right: &Table) -> Result<Table> {
        let left_keys = self
            .left_on
            .iter()
            .map(|k| left.require(k))
            .collect::<Result<Vec<_>>>()?;
        let right_keys = self
            .right_on
            .iter()
            .map(|k| right.require(k))
            .collect::<Result<Vec<_>>>()?;

        // Right key columns named like their left partner collapse into one
        let collapsed: Vec<usize> = self
            .left_on
            .iter()
            .zip(&self.right_on)
            .zip(&right_keys)
            .filter(|((l, r), _)| l == r)
            .map(|(_, &idx)| idx)
            .collect();
        let right_kept: Vec<usize> = (0..right.columns().len())
            .filter(|idx| !collapsed.contains(idx))
            .collect();

        let columns = output_columns(left, right, &right_kept);

        let mut index: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
        for (pos, row) in right.rows().enumerate() {
            if let Some(key) = row_key(row.cells(), &right_keys) {
                index.entry(key).or_default().push(pos);
            }
        }

        if let Some(cardinality) = self.validate {
            if let Some((key, _)) = index.iter().find(|(_, rows)| rows.len() > 1) {
                return Err(TableError::DuplicateKey {
                    key: key.join("|"),
                    side: "right",
                });
            }
            if cardinality == Cardinality::OneToOne {
                let mut seen: HashSet<Vec<String>> = HashSet::new();
                for row in left.rows() {
                    if let Some(key) = row_key(row.cells(), &left_keys) {
                        if !seen.insert(key.clone()) {
                            return Err(TableError::DuplicateKey {
                                key: key.join("|"),
                                side: "left",
                            });
                        }
                    }
                }
            }
        }

        let right_width = right_kept.len();
        let mut matched = vec![false; right.len()];
        let mut out = Table::new(&columns);

        for row in left.rows() {
            let hits = row_key(row.cells(), &left_keys).and_then(|k| index.get(&k));
            match hits {
                Some(positions) => {
                    for &pos in positions {
                        matched[pos] = true;
                        let right_row = right.row(pos).map(|r| r.cells()).unwrap_or(&[]);
                        let mut cells = row.cells().to_vec();
                        cells.extend(right_kept.iter().map(|&i| right_row[i].clone()));
                        out.push_row(cells)?;
                    }
                }
                None if self.how != JoinKind::Inner => {
                    let mut cells = row.cells().to_vec();
                    cells.extend(std::iter::repeat_n(Cell::Null, right_width));
                    out.push_row(cells)?;
                }
                None => {}
            }
        }

        if self.how == JoinKind::Outer {
            let left_width = left.columns().len();
            for (pos, row) in right.rows().enumerate() {
                if matched[pos] {
                    continue;
                }
                let mut cells = vec![Cell::Null; left_width];
                for (k, (&l_idx, &r_idx)) in left_keys.iter().zip(&right_keys).enumerate() {
                    if self.left_on[k] == self.right_on[k] {
                        cells[l_idx] = row.cells()[r_idx].clone();
                    }
                }
                cells.extend(right_kept.iter().map(|&i| row.cells()[i].clone()));
                out.push_row(cells)?;
            }
        }

        Ok(out)
    }
}

fn row_key(cells: &[Cell], indices: &[usize]) -> Option<Vec<String>> {
    indices.iter().map(|&i| cells[i].key()).collect()
}

/// Left columns then kept right columns, suffixing `_x` / `_y` on collisions
fn output_columns(left: &Table, right: &Table, right_kept: &[usize]) -> Vec<String> {
    let right_names: Vec<&String> = right_kept.iter().map(|&i| &right.columns()[i]).collect();
    let mut columns: Vec<String> = left
        .columns()
        .iter()
        .map(|c| {
            if right_names.contains(&c) {
                format!("{}_x", c)
            } else {
                c.clone()
            }
        })
        .collect();
    columns.extend(right_names.iter().map(|c| {
        if left.columns().contains(*c) {
            format!("{}_y", c)
        } else {
            (*c).clone()
        }
    }));
    columns
}

impl Table {
    /// Merge `right` into this table according to `merge`
    pub fn merge(&self, right: &Table, merge: &Merge) -> Result<Table> {
        merge.apply(self, right)
    }
}
