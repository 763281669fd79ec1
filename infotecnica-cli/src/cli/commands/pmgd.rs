//! PMGD command handler

use anyhow::Result;
use colored::*;

use super::{api_client, print_written};
use crate::pipeline::{RunContext, pmgd};

pub async fn handle_pmgd_command(ctx: &RunContext) -> Result<()> {
    let client = api_client(ctx)?;
    let summary = pmgd::run(ctx, &client).await?;
    println!(
        "{} {} PMGD units exported",
        "✓".bright_green(),
        summary.units.to_string().bold()
    );
    if summary.substituted > 0 {
        println!(
            "  {} units reported under a replacement REUC company",
            summary.substituted.to_string().yellow()
        );
    }
    print_written(&summary.report);
    Ok(())
}
