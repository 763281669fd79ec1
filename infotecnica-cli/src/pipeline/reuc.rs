//! Raw export of the REUC company registry

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;

use super::RunContext;
use crate::api::ReucClient;
use crate::excel::write_table;

pub const REPORT: &str = "reuc_agents";
pub const SHEET: &str = "Agents";

/// `reuc agents`: download the registry and write it as one sheet
pub async fn run_agents(ctx: &RunContext, client: &ReucClient) -> Result<(usize, PathBuf)> {
    let agents = client
        .agents_table()
        .await
        .context("Failed to download the REUC registry")?;
    let path = ctx.report_path(REPORT)?;
    write_table(&path, SHEET, &agents, "")?;
    info!("{} REUC companies written to {}", agents.len(), path.display());
    Ok((agents.len(), path))
}

/// Build the registry client from the run configuration
pub fn client(ctx: &RunContext) -> Result<ReucClient> {
    let config = &ctx.config;
    ReucClient::from_config(
        &config.reuc,
        config.reuc_api_key(),
        config.api.accept_invalid_certs,
    )
    .with_context(|| {
        format!(
            "Set reuc.api_key in the config file or the {} environment variable",
            crate::config::REUC_API_KEY_ENV
        )
    })
}
