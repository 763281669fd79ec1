//! Current transformers at the ends of each line section
//!
//! Three stages separated by manual review:
//! `ttcc terminals` finds the substation bay at each end of every classified
//! section, `ttcc ratios` matches those bays with Infotécnica's current
//! transformers and resolves the transformation ratio, and `ttcc final`
//! turns the reviewed ratios into capacities.

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;

use super::RunContext;
use super::checkpoint::{CLASSIFIED_LINES, PREVIOUS_CT, REVIEWED_RATIOS, REVIEWED_TERMINALS};
use super::lines::{CIRCUIT_NAME, LINE_NAME, SEGMENT_ID, VOLTAGE};
use crate::api::{DetailRequest, InfotecnicaClient, Resource, fetch_details, fichas};
use crate::excel::{write_partitioned, write_table};
use crate::table::{Cardinality, Cell, JoinKind, Merge, Table};
use crate::transform::numeric::{parse_decimal, to_float};
use crate::transform::ratio::{check_tap, previous_consistent, ratio_halves, resolve_ratio};
use crate::transform::text::{
    clean_terminal, is_excluded_terminal, replace_bay_prefix, split_terminal, strip_accents,
};
use crate::transform::units::{apparent_power_mva, ct_primary_capacity};

pub const TERMINALS_SNAPSHOT: &str = "df_TTCC_SEN_2.xlsx";
pub const TRANSFORMERS_SNAPSHOT: &str = "df_TTCC_IT.xlsx";
pub const RATIOS_SNAPSHOT: &str = "df_TTCC_SEN_7.xlsx";
pub const CAPACITY_SNAPSHOT: &str = "df_TTCC_SEN_final.xlsx";
pub const FINAL_REPORT: &str = "TTCC_ERST_final";

pub const ZONE: &str = "Zona";
pub const TERMINAL: &str = "extremo";
pub const SEGMENT_NAME: &str = "nombre_tramo";
pub const BAY_NAME: &str = "pano_nombre";
pub const SUBSTATION: &str = "Subestación";
pub const BAY: &str = "Paño";
pub const PUBLISHED_RATIOS: &str = "Razón(es) de transformación";
pub const PRIMARY_TAP: &str = "TAP seleccionado del primario";
pub const TAP_AMPS: &str = "Tap transformado";
pub const TAP_CONSISTENT: &str = "Contenido";
pub const RATIO_FROM_TAP: &str = "Relación de transformación_IT";
pub const RATIO: &str = "Relación de transformación";
pub const PREVIOUS_RATIO: &str = "Relación de transformación_ant";
pub const PREVIOUS_PRIMARY: &str = "Apri_ant";
pub const PREVIOUS_CONSISTENT: &str = "Contenido_ant";
pub const PRIMARY_AMPS: &str = "Apri";
pub const CAPACITY_A: &str = "Capacidad (A)";
pub const CAPACITY_MVA: &str = "Capacidad (MVA)";

const CT_CATEGORIES: &[&str] = &["458", "6177"];
const CT_COLUMNS: &[(&str, &str)] = &[("458", PUBLISHED_RATIOS), ("6177", PRIMARY_TAP)];
const CT_FIELDS: &[&str] = &["id", "subestacion_nombre", BAY_NAME, "nombre"];

const RATIO_COLUMNS: &[&str] = &[
    ZONE,
    LINE_NAME,
    CIRCUIT_NAME,
    SEGMENT_NAME,
    VOLTAGE,
    SUBSTATION,
    BAY,
    "id_TC",
    PUBLISHED_RATIOS,
    PRIMARY_TAP,
    TAP_AMPS,
    TAP_CONSISTENT,
    RATIO_FROM_TAP,
];

const FINAL_COLUMNS: &[&str] = &[
    ZONE,
    LINE_NAME,
    CIRCUIT_NAME,
    SUBSTATION,
    BAY,
    RATIO,
    CAPACITY_A,
    CAPACITY_MVA,
];

/// Normalised bay label used on both sides of the terminal match
fn normalise_bay(cell: &Cell) -> Cell {
    match cell {
        Cell::Text(text) => Cell::Text(strip_accents(&replace_bay_prefix(text))),
        other => other.clone(),
    }
}

/// Sections of every zone, one row per segment, tagged with their zone
pub fn zone_segments(zones: &[(String, Table)]) -> Result<Table> {
    let mut parts = Vec::with_capacity(zones.len());
    for (zone, table) in zones {
        let segments = table
            .select(&[LINE_NAME, CIRCUIT_NAME, VOLTAGE, SEGMENT_ID])?
            .drop_empty_rows()
            .drop_duplicates(&[SEGMENT_ID])?;
        let tags = vec![Cell::text(zone.as_str()); segments.len()];
        parts.push(segments.with_column(ZONE, tags)?);
    }
    Ok(Table::concat(&parts))
}

/// Both ends of every section, end 1 then end 2, with cleaned terminal labels.
/// Taps and structures are dropped.
pub fn section_terminals(sections: &Table, segments: &Table) -> Result<Table> {
    let segments = segments
        .clone()
        .rename(&[("id", SEGMENT_ID), ("nombre", SEGMENT_NAME)]);
    let merge = Merge::on(JoinKind::Left, &[SEGMENT_ID]).validate(Cardinality::ManyToOne);

    let mut ends = Vec::with_capacity(2);
    for end in ["extremo1_descripcion", "extremo2_descripcion"] {
        let side = segments
            .select(&[SEGMENT_ID, SEGMENT_NAME, end])?
            .rename(&[(end, TERMINAL)]);
        ends.push(sections.merge(&side, &merge)?);
    }
    let second = ends.pop().unwrap_or_default();
    let first = ends.pop().unwrap_or_default();
    let (columns, first_rows) = first.into_parts();
    let (_, second_rows) = second.into_parts();
    let rows = first_rows
        .into_iter()
        .zip(second_rows)
        .flat_map(|(a, b)| [a, b])
        .collect();
    let both = Table::from_rows(columns.as_slice(), rows)?;

    let cleaned = both.map_column(TERMINAL, |cell| match cell {
        Cell::Text(text) => Cell::Text(clean_terminal(text)),
        other => other.clone(),
    })?;
    let kept = cleaned.filter(|row| {
        !row.get(TERMINAL)
            .as_text()
            .is_some_and(is_excluded_terminal)
    });
    Ok(kept.map_column(TERMINAL, normalise_bay)?)
}

/// `ttcc terminals`
pub async fn run_terminals(ctx: &RunContext, client: &InfotecnicaClient) -> Result<PathBuf> {
    let zones = CLASSIFIED_LINES.load_sheets(&ctx.config.paths.data_dir)?;
    let sections = zone_segments(&zones)?;
    let segments = client
        .list_table(Resource::Segments)
        .await
        .context("Failed to list line segments")?;

    let terminals = section_terminals(&sections, &segments)?;
    info!(
        "{} sections across {} zones give {} terminals",
        sections.len(),
        zones.len(),
        terminals.len()
    );
    let path = ctx.data_path(TERMINALS_SNAPSHOT);
    write_table(&path, "Sheet1", &terminals, "")?;
    Ok(path)
}

/// Counts reported by `ttcc ratios`
#[derive(Debug, Clone, Default)]
pub struct RatioSummary {
    pub transformers: usize,
    pub failed_fichas: usize,
    pub terminals: usize,
    pub resolved: usize,
    pub outputs: Vec<PathBuf>,
}

/// Every current transformer with its published ratios and selected tap
pub async fn fetch_transformers(
    client: &InfotecnicaClient,
    workers: usize,
) -> Result<(Table, usize)> {
    let listing = client
        .paginated_table(Resource::CurrentTransformers)
        .await
        .context("Failed to list current transformers")?;
    let transformers = listing.select(CT_FIELDS)?;
    let ids: Vec<Cell> = transformers.column("id")?.into_iter().cloned().collect();
    let batch = fetch_details(
        client,
        &ids,
        &DetailRequest {
            resource: Resource::CurrentTransformers,
            ficha: fichas::GENERAL,
            categories: CT_CATEGORIES,
            rename: CT_COLUMNS,
            workers,
        },
    )
    .await?;
    let merged = transformers
        .merge(&batch.table, &Merge::on(JoinKind::Outer, &["id"]))?
        .rename(&[("id", "id_TC"), ("nombre", "nombre_TC")]);
    Ok((merged, batch.failures.len()))
}

/// First transformer of each bay, compared on normalised bay labels
pub fn first_per_bay(transformers: &Table) -> Result<Table> {
    Ok(transformers
        .clone()
        .map_column(BAY_NAME, normalise_bay)?
        .drop_duplicates(&[BAY_NAME])?)
}

/// Attach transformers to terminals and split each terminal into substation
/// and bay.
pub fn match_terminals(terminals: &Table, transformers: &Table) -> Result<Table> {
    let joined = terminals.merge(
        transformers,
        &Merge::left_right(JoinKind::Left, &[TERMINAL], &[BAY_NAME]),
    )?;
    let joined = joined.derive_column(BAY, |row| match row.get(TERMINAL).as_text() {
        Some(text) => Cell::from_option(split_terminal(text).1),
        None => Cell::Null,
    })?;
    Ok(joined.derive_column(SUBSTATION, |row| match row.get(TERMINAL).as_text() {
        Some(text) => Cell::from_option(split_terminal(text).0),
        None => Cell::Null,
    })?)
}

/// Tap in amperes, tap consistency and the ratio implied by the tap
pub fn check_taps(table: Table) -> Result<Table> {
    let checks: Vec<_> = table
        .rows()
        .map(|row| {
            check_tap(
                row.get(PUBLISHED_RATIOS).to_text().as_deref(),
                row.get(PRIMARY_TAP).to_text().as_deref(),
            )
        })
        .collect();
    let amps = checks.iter().map(|c| Cell::from_option(c.tap_amps)).collect();
    let consistent = checks.iter().map(|c| Cell::Bool(c.consistent)).collect();
    let ratios = checks.iter().map(|c| Cell::from_option(c.ratio.clone())).collect();
    Ok(table
        .with_column(TAP_AMPS, amps)?
        .with_column(TAP_CONSISTENT, consistent)?
        .with_column(RATIO_FROM_TAP, ratios)?)
}

/// Ratios of the previous study, one row per substation and single bay.
/// Breaker-and-a-half pairs (`J1/J2`) are split into their bays.
pub fn previous_ratios(zones: &[(String, Table)]) -> Result<Table> {
    let parts = zones
        .iter()
        .map(|(_, table)| table.select(&[SUBSTATION, BAY, RATIO]))
        .collect::<crate::table::Result<Vec<_>>>()?;
    Ok(Table::concat(&parts)
        .explode_split(BAY, '/')?
        .drop_duplicates(&[SUBSTATION, BAY])?
        .rename(&[(RATIO, PREVIOUS_RATIO)]))
}

/// Join the previous study and pick the ratio to report
pub fn resolve_ratios(table: &Table, previous: &Table) -> Result<Table> {
    let joined = table.merge(
        previous,
        &Merge::on(JoinKind::Left, &[SUBSTATION, BAY]).validate(Cardinality::ManyToOne),
    )?;

    let primary = joined
        .rows()
        .map(|row| {
            let previous = row.get(PREVIOUS_RATIO).to_text();
            let half = previous.as_deref().and_then(|r| ratio_halves(r).0);
            Cell::from_option(half.and_then(parse_decimal))
        })
        .collect();
    let consistent = joined
        .rows()
        .map(|row| {
            Cell::Bool(previous_consistent(
                row.get(PUBLISHED_RATIOS).to_text().as_deref(),
                row.get(PREVIOUS_RATIO).to_text().as_deref(),
            ))
        })
        .collect();
    let resolved = joined
        .rows()
        .map(|row| {
            let published = row.get(PUBLISHED_RATIOS).to_text();
            let tap = check_tap(published.as_deref(), row.get(PRIMARY_TAP).to_text().as_deref());
            Cell::from_option(resolve_ratio(
                published.as_deref(),
                &tap,
                row.get(PREVIOUS_RATIO).to_text().as_deref(),
            ))
        })
        .collect();

    Ok(joined
        .with_column(PREVIOUS_PRIMARY, primary)?
        .with_column(PREVIOUS_CONSISTENT, consistent)?
        .with_column(RATIO, resolved)?)
}

/// `ttcc ratios`
pub async fn run_ratios(ctx: &RunContext, client: &InfotecnicaClient) -> Result<RatioSummary> {
    let data_dir = &ctx.config.paths.data_dir;
    let terminals = REVIEWED_TERMINALS.load_first(data_dir)?;
    let previous = previous_ratios(&PREVIOUS_CT.load_sheets(data_dir)?)?;

    let (transformers, failed_fichas) =
        fetch_transformers(client, ctx.config.api.ct_workers).await?;
    let transformers_file = ctx.data_path(TRANSFORMERS_SNAPSHOT);
    write_table(&transformers_file, "Sheet1", &transformers, "")?;

    let matched = match_terminals(&terminals, &first_per_bay(&transformers)?)?;
    let checked = check_taps(matched)?.select(RATIO_COLUMNS)?;
    let resolved = resolve_ratios(&checked, &previous)?;
    let resolved_count = resolved.rows().filter(|r| !r.get(RATIO).is_null()).count();
    info!(
        "Resolved {} of {} ratios, the rest need relay printouts",
        resolved_count,
        resolved.len()
    );

    let ratios_file = ctx.data_path(RATIOS_SNAPSHOT);
    write_table(&ratios_file, "Sheet1", &resolved, "")?;

    Ok(RatioSummary {
        transformers: transformers.len(),
        failed_fichas,
        terminals: resolved.len(),
        resolved: resolved_count,
        outputs: vec![transformers_file, ratios_file],
    })
}

/// Primary current from the ratio, CT capacity in A and MVA
pub fn capacities(table: Table) -> Result<Table> {
    let table = table.derive_column(PRIMARY_AMPS, |row| {
        let ratio = row.get(RATIO).to_text();
        let primary = ratio.as_deref().and_then(|r| ratio_halves(r).0);
        Cell::from_option(primary.and_then(parse_decimal))
    })?;
    let table = table.derive_column(CAPACITY_A, |row| match row.get(PRIMARY_AMPS).as_f64() {
        Some(primary) => Cell::float(ct_primary_capacity(primary)),
        None => Cell::Null,
    })?;
    Ok(table.derive_column(CAPACITY_MVA, |row| {
        match (to_float(row.get(VOLTAGE)).as_f64(), row.get(CAPACITY_A).as_f64()) {
            (Some(kv), Some(amps)) => Cell::float(apparent_power_mva(kv, amps)),
            _ => Cell::Null,
        }
    })?)
}

/// `ttcc final`: returns the snapshot and the report paths
pub fn run_final(ctx: &RunContext) -> Result<(PathBuf, PathBuf)> {
    let reviewed = REVIEWED_RATIOS.load_first(&ctx.config.paths.data_dir)?;
    let table = capacities(reviewed)?.select(FINAL_COLUMNS)?;

    let snapshot = ctx.data_path(CAPACITY_SNAPSHOT);
    write_table(&snapshot, "Sheet1", &table, "")?;

    let report = ctx.report_path(FINAL_REPORT)?;
    let zones = write_partitioned(&report, &table, ZONE, ctx.placeholder())?;
    info!("Wrote {} transformers over {} zones to {}", table.len(), zones, report.display());
    Ok((snapshot, report))
}
