pub mod lines;
pub mod pmgd;
pub mod reuc;
pub mod status;
pub mod ttcc;

use anyhow::{Context, Result};
use colored::*;
use std::path::Path;

use crate::api::InfotecnicaClient;
use crate::pipeline::RunContext;

/// Infotécnica client for the `[api]` settings of this run
fn api_client(ctx: &RunContext) -> Result<InfotecnicaClient> {
    InfotecnicaClient::from_config(&ctx.config.api).context("Failed to build the Infotécnica client")
}

fn print_written(path: &Path) {
    println!("  {} {}", "wrote".green(), path.display().to_string().cyan());
}
