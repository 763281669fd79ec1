//! Spreadsheets exchanged between stages
//!
//! Some inputs come from the previous study and others are produced by a
//! stage and then corrected by hand before the next stage runs. Each one is
//! declared here with the columns its reader depends on, and every sheet is
//! checked against them on load.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::excel::{read_all_sheets, read_first_sheet};
use crate::reference::{ReferenceError, require_columns};
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointKind {
    /// Result of the previous study, copied in before the run
    PreviousStudy,
    /// Stage output corrected by hand
    ManualEdit,
}

#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    pub file: &'static str,
    pub kind: CheckpointKind,
    /// What has to be done to produce the file
    pub description: &'static str,
    pub required: &'static [&'static str],
}

pub const PREVIOUS_LINES: Checkpoint = Checkpoint {
    file: "Lineas_ERST_2_ant.xlsx",
    kind: CheckpointKind::PreviousStudy,
    description: "line tables of the previous study, one sheet per zone",
    required: &["ID", "Tensión nominal (kV)"],
};

pub const PREVIOUS_SECTIONS: Checkpoint = Checkpoint {
    file: "df_secciones_tramos_4_ant.xlsx",
    kind: CheckpointKind::PreviousStudy,
    description: "cleaned section snapshot of the previous study",
    required: &["ID"],
};

pub const CLASSIFIED_LINES: Checkpoint = Checkpoint {
    file: "Lineas_ERST_2.xlsx",
    kind: CheckpointKind::ManualEdit,
    description: "Lineas_ERST.xlsx with new sections classified by zone, \
                  vanished IDs removed and thermal magnitude errors fixed",
    required: &[
        "Nombre Línea",
        "Nombre Circuito",
        "Tensión nominal (kV)",
        "id_tramo",
    ],
};

pub const REVIEWED_TERMINALS: Checkpoint = Checkpoint {
    file: "df_TTCC_SEN_2_2.xlsx",
    kind: CheckpointKind::ManualEdit,
    description: "df_TTCC_SEN_2.xlsx with duplicate ends fixed and tap-offs, \
                  terminals without CTs and missing sections removed",
    required: &[
        "Zona",
        "Nombre Línea",
        "Nombre Circuito",
        "Tensión nominal (kV)",
        "nombre_tramo",
        "extremo",
    ],
};

pub const PREVIOUS_CT: Checkpoint = Checkpoint {
    file: "TTCC_ERST_final_ant.xlsx",
    kind: CheckpointKind::PreviousStudy,
    description: "current-transformer tables of the previous study, one sheet per zone",
    required: &["Subestación", "Paño", "Relación de transformación"],
};

pub const REVIEWED_RATIOS: Checkpoint = Checkpoint {
    file: "df_TTCC_SEN_7_2.xlsx",
    kind: CheckpointKind::ManualEdit,
    description: "df_TTCC_SEN_7.xlsx with missing ratios and voltages filled \
                  from relay printouts",
    required: &[
        "Zona",
        "Nombre Línea",
        "Nombre Circuito",
        "Tensión nominal (kV)",
        "Subestación",
        "Paño",
        "Relación de transformación",
    ],
};

impl Checkpoint {
    pub fn path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(self.file)
    }

    pub fn exists(&self, data_dir: &Path) -> bool {
        self.path(data_dir).is_file()
    }

    fn ensure_present(&self, path: &Path) -> Result<()> {
        if !path.is_file() {
            anyhow::bail!(
                "Checkpoint {} not found in {}; expected: {}",
                self.file,
                path.parent().unwrap_or(Path::new(".")).display(),
                self.description
            );
        }
        Ok(())
    }

    fn validate(&self, table: &Table, path: &Path) -> Result<(), ReferenceError> {
        require_columns(table, self.required, path)
    }

    /// Every sheet, each checked for the required columns
    pub fn load_sheets(&self, data_dir: &Path) -> Result<Vec<(String, Table)>> {
        let path = self.path(data_dir);
        self.ensure_present(&path)?;
        let sheets = read_all_sheets(&path)?;
        for (name, table) in &sheets {
            self.validate(table, &path)
                .with_context(|| format!("Sheet '{}' of checkpoint {}", name, self.file))?;
        }
        Ok(sheets)
    }

    /// First sheet only
    pub fn load_first(&self, data_dir: &Path) -> Result<Table> {
        let path = self.path(data_dir);
        self.ensure_present(&path)?;
        let (name, table) = read_first_sheet(&path)?;
        self.validate(&table, &path)
            .with_context(|| format!("Sheet '{}' of checkpoint {}", name, self.file))?;
        Ok(table)
    }
}

/// A stage with the checkpoints it reads
#[derive(Debug, Clone, Copy)]
pub struct StageInputs {
    pub command: &'static str,
    pub checkpoints: &'static [Checkpoint],
}

pub const STAGES: &[StageInputs] = &[
    StageInputs {
        command: "lines fetch",
        checkpoints: &[PREVIOUS_LINES, PREVIOUS_SECTIONS],
    },
    StageInputs {
        command: "lines final",
        checkpoints: &[CLASSIFIED_LINES],
    },
    StageInputs {
        command: "ttcc terminals",
        checkpoints: &[CLASSIFIED_LINES],
    },
    StageInputs {
        command: "ttcc ratios",
        checkpoints: &[REVIEWED_TERMINALS, PREVIOUS_CT],
    },
    StageInputs {
        command: "ttcc final",
        checkpoints: &[REVIEWED_RATIOS],
    },
];
