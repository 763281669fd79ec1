//! Building tables out of JSON record lists

use serde_json::{Map, Value};

use super::{Cell, Table};

impl Table {
    /// Flatten a list of JSON objects into a table.
    ///
    /// Nested objects become `parent.child` columns. The header is the union of
    /// all keys in order of first appearance; keys a record lacks are `Null`.
    /// Entries that are not objects are skipped.
    pub fn from_json_records(records: &[Value]) -> Table {
        let flattened: Vec<Vec<(String, Cell)>> = records
            .iter()
            .filter_map(Value::as_object)
            .map(|obj| {
                let mut out = Vec::new();
                flatten_into(obj, "", &mut out);
                out
            })
            .collect();

        let mut columns: Vec<String> = Vec::new();
        for record in &flattened {
            for (key, _) in record {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let mut table = Table::new(&columns);
        for record in flattened {
            let mut row = vec![Cell::Null; columns.len()];
            for (key, cell) in record {
                if let Some(idx) = columns.iter().position(|c| *c == key) {
                    row[idx] = cell;
                }
            }
            // Width always matches the header built above
            let _ = table.push_row(row);
        }
        table
    }
}

fn flatten_into(obj: &Map<String, Value>, prefix: &str, out: &mut Vec<(String, Cell)>) {
    for (key, value) in obj {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(inner, &name, out),
            other => out.push((name, Cell::from(other))),
        }
    }
}
