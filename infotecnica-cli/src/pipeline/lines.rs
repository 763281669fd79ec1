//! Transmission line sections
//!
//! `lines fetch` pulls every line section with its general and thermal fichas,
//! keeps the voltage levels under study and lays them out per zone of the
//! previous study. `lines final` trims the hand-classified result into the
//! report.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;

use super::RunContext;
use super::checkpoint::{CLASSIFIED_LINES, PREVIOUS_LINES, PREVIOUS_SECTIONS};
use crate::api::{DetailRequest, InfotecnicaClient, Resource, fetch_details, fichas};
use crate::excel::{write_sheets, write_table};
use crate::table::{Cell, JoinKind, Merge, Table};
use crate::transform::numeric::{columns_to_float, to_float};
use crate::transform::units::thermal_ka_to_mva;

pub const SECTIONS_SNAPSHOT: &str = "df_secciones_tramos_4.xlsx";
pub const ZONE_LINES: &str = "Lineas_ERST.xlsx";
pub const NEW_SECTIONS: &str = "Tramos_Nuevos.xlsx";
pub const FINAL_REPORT: &str = "Lineas_ERST_final";

pub const ID: &str = "ID";
pub const VOLTAGE: &str = "Tensión nominal (kV)";
pub const LENGTH: &str = "Longitud Conductor (km)";
pub const COMMISSIONING: &str = "Fecha EO";
pub const COMMISSIONING_DATE: &str = "Fecha EO 2";
pub const SEGMENT_ID: &str = "id_tramo";
pub const LINE_NAME: &str = "Nombre Línea";
pub const CIRCUIT_NAME: &str = "Nombre Circuito";

const GENERAL_CATEGORIES: &[&str] = &["5917", "5895", "1005", "5902"];
const GENERAL_COLUMNS: &[(&str, &str)] = &[
    ("5917", COMMISSIONING),
    ("5895", VOLTAGE),
    ("1005", LENGTH),
    ("5902", "Tipo de conductor"),
];

const THERMAL_CATEGORIES: &[&str] = &[
    "1561", "1563", "1565", "1567", "1569", "1571", "1573", "1575",
];
const THERMAL_COLUMNS: &[(&str, &str)] = &[
    ("1561", "0°C"),
    ("1563", "5°C"),
    ("1565", "10°C"),
    ("1567", "15°C"),
    ("1569", "20°C"),
    ("1571", "25°C"),
    ("1573", "30°C"),
    ("1575", "35°C"),
];

const SECTION_FIELDS: &[&str] = &["id", "nombre", "linea_nombre", "circuito_nombre", SEGMENT_ID];

/// Column order of the cleaned table, before renaming
const ORDERED_COLUMNS: &[&str] = &[
    "id",
    "linea_nombre",
    "circuito_nombre",
    "nombre",
    VOLTAGE,
    LENGTH,
    "Tipo de conductor",
    "0°C",
    "5°C",
    "10°C",
    "15°C",
    "20°C",
    "25°C",
    "30°C",
    "35°C",
    SEGMENT_ID,
    COMMISSIONING,
];

const FINAL_NAMES: &[(&str, &str)] = &[
    ("id", ID),
    ("linea_nombre", LINE_NAME),
    ("circuito_nombre", CIRCUIT_NAME),
    ("nombre", "Nombre Tramo"),
];

/// Voltage levels always under study
const STUDY_LEVELS_KV: &[f64] = &[154.0, 220.0, 500.0];
/// Lower level kept only for sections already in the previous study
const LEGACY_LEVEL_KV: f64 = 110.0;

/// Counts reported by `lines fetch`
#[derive(Debug, Clone, Default)]
pub struct FetchSummary {
    pub sections: usize,
    pub kept: usize,
    pub failed_fichas: usize,
    pub zones: usize,
    pub new_sections: usize,
    pub outputs: Vec<PathBuf>,
}

fn thermal_names() -> impl Iterator<Item = &'static str> {
    THERMAL_COLUMNS.iter().map(|(_, name)| *name)
}

/// Section listing joined with both ficha tables on `id`
pub async fn fetch_sections(
    client: &InfotecnicaClient,
    workers: usize,
) -> Result<(Table, usize)> {
    let listing = client
        .list_table(Resource::SectionSegments)
        .await
        .context("Failed to list line sections")?;
    let sections = listing.select(SECTION_FIELDS)?;
    let ids: Vec<Cell> = sections.column("id")?.into_iter().cloned().collect();

    let mut merged = sections;
    let mut failed = 0;
    for (ficha, categories, rename) in [
        (fichas::GENERAL, GENERAL_CATEGORIES, GENERAL_COLUMNS),
        (fichas::THERMAL_LIMITS, THERMAL_CATEGORIES, THERMAL_COLUMNS),
    ] {
        let batch = fetch_details(
            client,
            &ids,
            &DetailRequest {
                resource: Resource::SectionSegments,
                ficha,
                categories,
                rename,
                workers,
            },
        )
        .await?;
        failed += batch.failures.len();
        merged = merged.merge(&batch.table, &Merge::on(JoinKind::Outer, &["id"]))?;
    }
    Ok((merged, failed))
}

/// IDs of 110 kV sections across every zone of the previous study
pub fn legacy_section_ids(previous: &[(String, Table)]) -> HashSet<String> {
    previous
        .iter()
        .flat_map(|(_, table)| table.rows())
        .filter(|row| to_float(row.get(VOLTAGE)).as_f64() == Some(LEGACY_LEVEL_KV))
        .filter_map(|row| row.get(ID).key())
        .collect()
}

fn mentions_study_level(name: &Cell) -> bool {
    name.as_text()
        .is_some_and(|text| ["154", "220", "500"].iter().any(|level| text.contains(level)))
}

/// Keep 154/220/500 kV sections, sections without a voltage whose line name
/// mentions one of those levels, and 110 kV sections from the previous study.
pub fn filter_voltage(sections: Table, legacy_ids: &HashSet<String>) -> Result<Table> {
    let sections = sections.map_column(VOLTAGE, to_float)?;
    Ok(sections.filter(|row| match row.get(VOLTAGE).as_f64() {
        Some(kv) if STUDY_LEVELS_KV.contains(&kv) => true,
        Some(kv) if kv == LEGACY_LEVEL_KV => row
            .get("id")
            .key()
            .is_some_and(|id| legacy_ids.contains(&id)),
        Some(_) => false,
        None => mentions_study_level(row.get("linea_nombre")),
    }))
}

/// Reorder, rename, coerce numbers and turn thermal limits from kA into MVA
pub fn tidy_sections(sections: Table) -> Result<Table> {
    let numeric: Vec<&str> = [VOLTAGE, LENGTH].into_iter().chain(thermal_names()).collect();
    let mut table = columns_to_float(
        sections.select(ORDERED_COLUMNS)?.rename(FINAL_NAMES),
        &numeric,
    )?;
    for column in thermal_names() {
        table = table.derive_column(column, |row| {
            match (row.get(column).as_f64(), row.get(VOLTAGE).as_f64()) {
                (Some(ka), Some(kv)) => Cell::float(thermal_ka_to_mva(ka, kv)),
                _ => Cell::Null,
            }
        })?;
    }
    Ok(table)
}

/// One sheet per previous-study zone: the zone's IDs left-joined with the
/// cleaned sections, commissioning date dropped. IDs that no longer exist
/// stay as empty rows for manual removal.
pub fn zone_sheets(previous: &[(String, Table)], cleaned: &Table) -> Result<Vec<(String, Table)>> {
    let lookup = cleaned.drop_columns(&[COMMISSIONING])?;
    previous
        .iter()
        .map(|(zone, table)| {
            let ids = table.select(&[ID])?;
            let joined = ids.merge(&lookup, &Merge::on(JoinKind::Left, &[ID]))?;
            Ok((zone.clone(), joined))
        })
        .collect()
}

/// Sections absent from the previous snapshot, with the commissioning date
/// parsed day-first
pub fn new_sections(cleaned: &Table, previous: &Table) -> Result<Table> {
    let known = previous.key_set(ID)?;
    let fresh = cleaned.filter(|row| {
        row.get(ID)
            .key()
            .is_none_or(|id| !known.contains(&id))
    });
    Ok(fresh.derive_column(COMMISSIONING_DATE, |row| {
        Cell::from_option(row.get(COMMISSIONING).as_date())
    })?)
}

/// `lines fetch`
pub async fn run_fetch(ctx: &RunContext, client: &InfotecnicaClient) -> Result<FetchSummary> {
    let data_dir = &ctx.config.paths.data_dir;
    // Checkpoints are read before the slow fetch so a missing file fails fast
    let previous_lines = PREVIOUS_LINES.load_sheets(data_dir)?;
    let previous_sections = PREVIOUS_SECTIONS.load_first(data_dir)?;

    let (sections, failed_fichas) = fetch_sections(client, ctx.config.api.workers).await?;
    let total = sections.len();

    let legacy = legacy_section_ids(&previous_lines);
    let kept = filter_voltage(sections, &legacy)?;
    info!(
        "Kept {} of {} sections ({} legacy 110 kV IDs)",
        kept.len(),
        total,
        legacy.len()
    );
    let cleaned = tidy_sections(kept)?;

    let snapshot = ctx.data_path(SECTIONS_SNAPSHOT);
    write_table(&snapshot, "Sheet1", &cleaned, "")?;

    let zones = zone_sheets(&previous_lines, &cleaned)?;
    let zone_file = ctx.data_path(ZONE_LINES);
    write_sheets(&zone_file, &zones, ctx.placeholder())?;

    let fresh = new_sections(&cleaned, &previous_sections)?;
    let fresh_file = ctx.data_path(NEW_SECTIONS);
    write_table(&fresh_file, "Sheet1", &fresh, ctx.placeholder())?;

    Ok(FetchSummary {
        sections: total,
        kept: cleaned.len(),
        failed_fichas,
        zones: zones.len(),
        new_sections: fresh.len(),
        outputs: vec![snapshot, zone_file, fresh_file],
    })
}

/// `lines final`: drop helper columns from every classified zone
pub fn run_final(ctx: &RunContext) -> Result<PathBuf> {
    let sheets = CLASSIFIED_LINES.load_sheets(&ctx.config.paths.data_dir)?;
    let trimmed = sheets
        .into_iter()
        .map(|(zone, table)| Ok((zone, table.drop_columns(&[SEGMENT_ID, VOLTAGE])?)))
        .collect::<Result<Vec<_>>>()?;

    let path = ctx.report_path(FINAL_REPORT)?;
    write_sheets(&path, &trimmed, ctx.placeholder())?;
    info!("Wrote {} zones to {}", trimmed.len(), path.display());
    Ok(path)
}
