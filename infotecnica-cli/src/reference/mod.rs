//! Reference workbooks supplied by hand
//!
//! The REUC registry exports are dropped into the input directory with a date
//! in their name; the newest file by modification time wins.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use log::info;
use thiserror::Error;

use crate::excel::{read_first_sheet, read_sheet, sheet_names};
use crate::table::Table;
use crate::transform::substitution::{END_DATE, REUC_ID, REUC_NAME, REUC_NEW_ID, START_DATE};

pub const AGENTS_PATTERN: &str = "datos_empresas_*.xlsx";
pub const SUBSTITUTIONS_PATTERN: &str = "datos_reuc_reemplazos_*.xlsx";
pub const AGENTS_SHEET: &str = "Empresas";

pub const REUC_CATEGORY: &str = "reuc_category";
pub const REUC_OLD_ID: &str = "reuc_old_id";

const AGENT_COLUMNS: &[(&str, &str)] = &[
    ("id", REUC_ID),
    ("Razón Social", REUC_NAME),
    ("Segmento", REUC_CATEGORY),
];

const SUBSTITUTION_COLUMNS: &[(&str, &str)] = &[
    ("ID", REUC_OLD_ID),
    ("Empresa", "reuc_old_name"),
    ("Rut", "reuc_old_rut"),
    ("ID Reemplazo", REUC_NEW_ID),
    ("Reemplazada Por", "reuc_new_name"),
    ("Rut Reemplazante", "reuc_new_rut"),
    ("Inicio Reemplazo", START_DATE),
    ("Fin de Reemplazo", END_DATE),
];

#[derive(Debug, Error, PartialEq)]
pub enum ReferenceError {
    #[error("no file matching '{pattern}' in {dir}")]
    NoMatch { pattern: String, dir: PathBuf },
    #[error("sheet '{sheet}' not found in {file}")]
    MissingSheet { sheet: String, file: PathBuf },
    #[error("column '{column}' missing from {file}")]
    MissingColumn { column: String, file: PathBuf },
}

/// Newest file in `dir` matching `pattern`, by modification time
pub fn pick_latest(dir: &Path, pattern: &str) -> Result<PathBuf, ReferenceError> {
    let no_match = || ReferenceError::NoMatch {
        pattern: pattern.to_string(),
        dir: dir.to_path_buf(),
    };
    let full = format!(
        "{}/{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        pattern
    );
    let paths = glob::glob(&full).map_err(|_| no_match())?;

    paths
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .map(|path| {
            let modified = path
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
        .map(|(_, path)| path)
        .ok_or_else(no_match)
}

/// Fail unless every column in `columns` is present
pub fn require_columns(table: &Table, columns: &[&str], file: &Path) -> Result<(), ReferenceError> {
    match columns.iter().find(|c| !table.has_column(c)) {
        Some(column) => Err(ReferenceError::MissingColumn {
            column: column.to_string(),
            file: file.to_path_buf(),
        }),
        None => Ok(()),
    }
}

/// Rename the export's headers and keep only the renamed columns, in order
fn project(table: Table, mapping: &[(&str, &str)], file: &Path) -> Result<Table> {
    let sources: Vec<&str> = mapping.iter().map(|(from, _)| *from).collect();
    require_columns(&table, &sources, file)?;
    let targets: Vec<&str> = mapping.iter().map(|(_, to)| *to).collect();
    Ok(table.rename(mapping).select(&targets)?)
}

/// REUC companies: `reuc_id`, `reuc_name`, `reuc_category`
pub fn load_reuc_agents(path: &Path) -> Result<Table> {
    if !sheet_names(path)?.iter().any(|s| s == AGENTS_SHEET) {
        return Err(ReferenceError::MissingSheet {
            sheet: AGENTS_SHEET.to_string(),
            file: path.to_path_buf(),
        }
        .into());
    }
    let table = read_sheet(path, AGENTS_SHEET)?;
    project(table, AGENT_COLUMNS, path)
}

/// REUC substitutions from the first sheet of the export
pub fn load_reuc_substitutions(path: &Path) -> Result<Table> {
    let (_, table) = read_first_sheet(path)?;
    project(table, SUBSTITUTION_COLUMNS, path)
}

/// Both REUC reference tables, from the newest exports in `dir`
#[derive(Debug)]
pub struct ReucReference {
    pub agents: Table,
    pub substitutions: Table,
}

impl ReucReference {
    pub fn load(dir: &Path) -> Result<Self> {
        let agents_file = pick_latest(dir, AGENTS_PATTERN)?;
        let substitutions_file = pick_latest(dir, SUBSTITUTIONS_PATTERN)?;
        info!(
            "Using REUC exports {} and {}",
            agents_file.display(),
            substitutions_file.display()
        );

        let agents = load_reuc_agents(&agents_file)
            .with_context(|| format!("Failed to load REUC companies from {}", agents_file.display()))?;
        let substitutions = load_reuc_substitutions(&substitutions_file).with_context(|| {
            format!(
                "Failed to load REUC substitutions from {}",
                substitutions_file.display()
            )
        })?;
        Ok(Self {
            agents,
            substitutions,
        })
    }
}
