//! Distributed generation units (PMGD) with their REUC identity

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{info, warn};

use super::RunContext;
use crate::api::{InfotecnicaClient, Resource};
use crate::excel::write_table;
use crate::reference::{REUC_OLD_ID, ReucReference};
use crate::table::{Cardinality, Cell, JoinKind, Merge, Table};
use crate::transform::substitution::{
    END_DATE, REUC_ID, REUC_NAME, REUC_NEW_ID, START_DATE, apply_substitutions, window_contains,
};

pub const REPORT: &str = "output";
pub const SHEET: &str = "GeneratingUnit";

pub const UNIT_ID: &str = "UnitID";
pub const UNIT_NAME: &str = "UnitName";
pub const PLANT_ID: &str = "PlantID";
pub const PLANT_NAME: &str = "PlantName";
pub const AGENT_ID: &str = "AgentID";
pub const AGENT_NAME: &str = "AgentName";

/// Group field ending in the owner's REUC id
const DESCRIPTION: &str = "descripcion";

/// Plant names of distributed generators carry this marker
const PMGD_MARKER: &str = "pmgd ";

const PLANT_NAMES: &[(&str, &str)] = &[
    ("id", PLANT_ID),
    ("nombre", PLANT_NAME),
    ("id_coordinado", AGENT_ID),
    ("coordinado_nombre", AGENT_NAME),
];
const UNIT_NAMES: &[(&str, &str)] = &[("id", UNIT_ID), ("id_central", PLANT_ID), ("nombre", UNIT_NAME)];

const REPORT_COLUMNS: &[&str] = &[
    UNIT_ID, UNIT_NAME, PLANT_ID, PLANT_NAME, AGENT_ID, REUC_ID, REUC_NAME,
];

/// Raw listings of the three resources
#[derive(Debug, Clone)]
pub struct Listings {
    pub agents: Table,
    pub plants: Table,
    pub units: Table,
}

#[derive(Debug, Clone)]
pub struct PmgdSummary {
    pub units: usize,
    pub substituted: usize,
    pub report: PathBuf,
}

pub async fn fetch_listings(client: &InfotecnicaClient) -> Result<Listings> {
    let agents = client
        .list_table(Resource::Groups)
        .await
        .context("Failed to list company groups")?;
    let plants = client
        .list_table(Resource::Plants)
        .await
        .context("Failed to list plants")?;
    let units = client
        .list_table(Resource::GeneratingUnits)
        .await
        .context("Failed to list generating units")?;
    Ok(Listings {
        agents,
        plants,
        units,
    })
}

/// REUC id carried by a group description such as `"Grupo Empresa_123"`
fn reuc_id_from_description(description: &Cell) -> Cell {
    match description.as_text() {
        Some(text) => text
            .rsplit('_')
            .next()
            .map(|id| Cell::text(id.trim()))
            .unwrap_or(Cell::Null),
        None => Cell::Null,
    }
}

/// Units of PMGD plants with their plant, owner and owner's REUC id
pub fn distributed_units(listings: &Listings) -> Result<Table> {
    let agents = listings.agents.clone().rename(&[("id", AGENT_ID)]);
    let reuc_ids = agents
        .rows()
        .map(|row| row.try_get(DESCRIPTION).map(reuc_id_from_description))
        .collect::<crate::table::Result<Vec<_>>>()?;
    let agents = agents
        .with_column(REUC_ID, reuc_ids)?
        .select(&[AGENT_ID, REUC_ID])?;
    let plants = listings
        .plants
        .clone()
        .rename(PLANT_NAMES)
        .select(&[PLANT_ID, PLANT_NAME, AGENT_ID, AGENT_NAME])?
        .merge(&agents, &Merge::on(JoinKind::Left, &[AGENT_ID]))?;
    let units = listings
        .units
        .clone()
        .rename(UNIT_NAMES)
        .select(&[UNIT_ID, UNIT_NAME, PLANT_ID])?
        .merge(&plants, &Merge::on(JoinKind::Left, &[PLANT_ID]))?;

    Ok(units.filter(|row| {
        row.get(PLANT_NAME)
            .as_text()
            .is_some_and(|name| name.to_lowercase().contains(PMGD_MARKER))
    }))
}

/// Attach REUC names, apply substitutions open on `today` and cast
/// `reuc_id` to an integer. Returns the table and the substituted row count.
pub fn resolve_reuc(
    units: &Table,
    reference: &ReucReference,
    today: NaiveDate,
) -> Result<(Table, usize)> {
    // Only replacements open today can change anything; at most one per company
    let open = reference
        .substitutions
        .filter(|row| window_contains(row.get(START_DATE), row.get(END_DATE), today))
        .select(&[REUC_OLD_ID, REUC_NEW_ID, START_DATE, END_DATE])?
        .drop_duplicates(&[REUC_OLD_ID])?;

    let with_replacements = units
        .merge(
            &open,
            &Merge::left_right(JoinKind::Left, &[REUC_ID], &[REUC_OLD_ID])
                .validate(Cardinality::ManyToOne),
        )?
        .drop_columns(&[REUC_OLD_ID])?;
    let names = reference.agents.select(&[REUC_ID, REUC_NAME])?;
    let named = with_replacements.merge(&names, &Merge::on(JoinKind::Inner, &[REUC_ID]))?;
    if named.len() < with_replacements.len() {
        info!(
            "{} units dropped: owner not in the REUC registry",
            with_replacements.len() - named.len()
        );
    }

    let (resolved, substituted) = apply_substitutions(named, &reference.agents, today)?;
    let resolved = resolved.map_column(REUC_ID, |cell| {
        Cell::from_option(cell.key().and_then(|key| key.parse::<i64>().ok()))
    })?;
    Ok((resolved, substituted))
}

/// `pmgd`
pub async fn run(ctx: &RunContext, client: &InfotecnicaClient) -> Result<PmgdSummary> {
    let reference = ReucReference::load(&ctx.config.paths.input_dir)?;
    let listings = fetch_listings(client).await?;

    let units = distributed_units(&listings)?;
    if units.is_empty() {
        warn!("No plant name contains '{}'", PMGD_MARKER.trim_end());
    } else {
        info!("{} PMGD units found", units.len());
    }
    let (resolved, substituted) = resolve_reuc(&units, &reference, ctx.today)?;
    let report_table = resolved.select(REPORT_COLUMNS)?;

    let report = ctx.report_path(REPORT)?;
    write_table(&report, SHEET, &report_table, "")?;
    Ok(PmgdSummary {
        units: report_table.len(),
        substituted,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listings() -> Listings {
        let agents = Table::from_rows(
            &["id", "nombre", "descripcion"],
            vec![
                vec![Cell::Int(1), Cell::text("Grupo A"), Cell::text("Grupo_A_100")],
                vec![Cell::Int(2), Cell::text("Grupo B"), Cell::text("Grupo_B_200")],
            ],
        )
        .unwrap();
        let plants = Table::from_rows(
            &["id", "nombre", "id_coordinado", "coordinado_nombre"],
            vec![
                vec![Cell::Int(10), Cell::text("PMGD Sol Norte"), Cell::Int(1), Cell::text("Empresa A")],
                vec![Cell::Int(11), Cell::text("Central Hidro"), Cell::Int(2), Cell::text("Empresa B")],
                vec![Cell::Int(12), Cell::text("Parque pmgd Viento"), Cell::Int(2), Cell::text("Empresa B")],
            ],
        )
        .unwrap();
        let units = Table::from_rows(
            &["id", "id_central", "nombre"],
            vec![
                vec![Cell::Int(100), Cell::Int(10), Cell::text("U1")],
                vec![Cell::Int(101), Cell::Int(11), Cell::text("U2")],
                vec![Cell::Int(102), Cell::Int(12), Cell::text("U3")],
                vec![Cell::Int(103), Cell::Int(99), Cell::text("U4")],
            ],
        )
        .unwrap();
        Listings {
            agents,
            plants,
            units,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn reference() -> ReucReference {
        let agents = Table::from_rows(
            &[REUC_ID, REUC_NAME, "reuc_category"],
            vec![
                vec![Cell::Int(100), Cell::text("Empresa A SpA"), Cell::text("Generación")],
                vec![Cell::Int(200), Cell::text("Empresa B SpA"), Cell::text("Generación")],
                vec![Cell::Int(300), Cell::text("Empresa C SpA"), Cell::text("Generación")],
            ],
        )
        .unwrap();
        let substitutions = Table::from_rows(
            &[REUC_OLD_ID, REUC_NEW_ID, START_DATE, END_DATE],
            vec![
                vec![Cell::Int(200), Cell::Int(300), Cell::Date(date(2025, 1, 1)), Cell::Date(date(2025, 12, 31))],
                vec![Cell::Int(100), Cell::Int(300), Cell::Date(date(2020, 1, 1)), Cell::Date(date(2020, 12, 31))],
            ],
        )
        .unwrap();
        ReucReference {
            agents,
            substitutions,
        }
    }

    #[test]
    fn test_reuc_id_from_description() {
        assert_eq!(reuc_id_from_description(&Cell::text("Grupo_A_100")), Cell::text("100"));
        assert_eq!(reuc_id_from_description(&Cell::text("200")), Cell::text("200"));
        assert_eq!(reuc_id_from_description(&Cell::Null), Cell::Null);
    }

    #[test]
    fn test_distributed_units() {
        let units = distributed_units(&listings()).unwrap();
        let ids: Vec<&Cell> = units.column(UNIT_ID).unwrap();
        assert_eq!(ids, vec![&Cell::Int(100), &Cell::Int(102)]);
        let first = units.row(0).unwrap();
        assert_eq!(first.get(PLANT_NAME), &Cell::text("PMGD Sol Norte"));
        assert_eq!(first.get(AGENT_ID), &Cell::Int(1));
        assert_eq!(first.get(REUC_ID), &Cell::text("100"));
    }

    #[test]
    fn test_groups_without_description_are_an_error() {
        let mut listings = listings();
        listings.agents = listings.agents.drop_columns(&["descripcion"]).unwrap();
        let err = distributed_units(&listings).unwrap_err();
        assert!(err.to_string().contains("descripcion"));
    }

    #[test]
    fn test_resolve_reuc_applies_open_substitution() {
        let units = distributed_units(&listings()).unwrap();
        let (resolved, substituted) = resolve_reuc(&units, &reference(), date(2025, 6, 1)).unwrap();
        assert_eq!(substituted, 1);
        assert_eq!(resolved.len(), 2);

        let first = resolved.row(0).unwrap();
        assert_eq!(first.get(REUC_ID), &Cell::Int(100));
        assert_eq!(first.get(REUC_NAME), &Cell::text("Empresa A SpA"));

        let second = resolved.row(1).unwrap();
        assert_eq!(second.get(REUC_ID), &Cell::Int(300));
        assert_eq!(second.get(REUC_NAME), &Cell::text("Empresa C SpA"));
    }

    #[test]
    fn test_resolve_reuc_outside_window() {
        let units = distributed_units(&listings()).unwrap();
        let (resolved, substituted) = resolve_reuc(&units, &reference(), date(2026, 1, 1)).unwrap();
        assert_eq!(substituted, 0);
        assert_eq!(resolved.row(1).unwrap().get(REUC_ID), &Cell::Int(200));
    }

    #[test]
    fn test_units_without_registry_entry_are_dropped() {
        let units = distributed_units(&listings()).unwrap();
        let mut reference = reference();
        reference.agents = reference.agents.filter(|row| row.get(REUC_ID) != &Cell::Int(100));
        let (resolved, _) = resolve_reuc(&units, &reference, date(2026, 1, 1)).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved.row(0).unwrap().get(UNIT_ID), &Cell::Int(102));
    }

    #[tokio::test]
    async fn test_run_writes_report() {
        use std::sync::Arc;

        use serde_json::json;

        use crate::api::transport::testing::StaticTransport;
        use crate::excel::{read_sheet, write_sheets};
        use crate::pipeline::testing::context;

        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let input = &ctx.config.paths.input_dir;

        let registry = Table::from_rows(
            &["id", "Razón Social", "Segmento"],
            vec![
                vec![Cell::Int(100), Cell::text("Empresa A SpA"), Cell::text("Generación")],
                vec![Cell::Int(300), Cell::text("Empresa C SpA"), Cell::text("Generación")],
            ],
        )
        .unwrap();
        write_sheets(
            &input.join("datos_empresas_2025.xlsx"),
            &[("Empresas".to_string(), registry)],
            "",
        )
        .unwrap();
        let replacements = Table::from_rows(
            &[
                "ID",
                "Empresa",
                "Rut",
                "ID Reemplazo",
                "Reemplazada Por",
                "Rut Reemplazante",
                "Inicio Reemplazo",
                "Fin de Reemplazo",
            ],
            vec![vec![
                Cell::Int(100),
                Cell::text("Empresa A SpA"),
                Cell::text("76.000.000-1"),
                Cell::Int(300),
                Cell::text("Empresa C SpA"),
                Cell::text("77.000.000-2"),
                Cell::Date(date(2025, 10, 1)),
                Cell::Date(date(2025, 12, 31)),
            ]],
        )
        .unwrap();
        write_sheets(
            &input.join("datos_reuc_reemplazos_2025.xlsx"),
            &[("Hoja1".to_string(), replacements)],
            "",
        )
        .unwrap();

        let base = "https://api.test/v1";
        let transport = StaticTransport::new()
            .route(
                &format!("{}/grupos", base),
                200,
                json!([{"id": 1, "nombre": "Grupo A", "descripcion": "Grupo_A_100"}]),
            )
            .route(
                &format!("{}/centrales/", base),
                200,
                json!([
                    {"id": 10, "nombre": "PMGD Sol Norte", "id_coordinado": 1, "coordinado_nombre": "Empresa A"},
                    {"id": 11, "nombre": "Central Hidro", "id_coordinado": 1, "coordinado_nombre": "Empresa A"},
                ]),
            )
            .route(
                &format!("{}/unidades-generadoras/", base),
                200,
                json!([
                    {"id": 100, "id_central": 10, "nombre": "U1"},
                    {"id": 101, "id_central": 11, "nombre": "U2"},
                ]),
            );
        let client = InfotecnicaClient::new(Arc::new(transport), base, 1000);

        let summary = run(&ctx, &client).await.unwrap();
        assert_eq!(summary.units, 1);
        assert_eq!(summary.substituted, 1);
        assert_eq!(
            summary.report,
            dir.path()
                .join("output")
                .join("output at 2025.11.03 10.30.00.xlsx")
        );

        let report = read_sheet(&summary.report, SHEET).unwrap();
        assert_eq!(report.columns(), REPORT_COLUMNS);
        let row = report.row(0).unwrap();
        assert_eq!(row.get(UNIT_NAME), &Cell::text("U1"));
        assert_eq!(row.get(REUC_ID), &Cell::Int(300));
        assert_eq!(row.get(REUC_NAME), &Cell::text("Empresa C SpA"));
    }
}
