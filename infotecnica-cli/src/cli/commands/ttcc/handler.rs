//! Current-transformer stages command handler

use anyhow::Result;
use colored::*;
use std::time::Instant;

use super::TtccCommands;
use crate::cli::commands::{api_client, print_written};
use crate::pipeline::{RunContext, checkpoint, ttcc};

pub async fn handle_ttcc_command(command: TtccCommands, ctx: &RunContext) -> Result<()> {
    let start = Instant::now();
    match command {
        TtccCommands::Terminals => {
            let client = api_client(ctx)?;
            let path = ttcc::run_terminals(ctx, &client).await?;
            println!("{} Section terminals resolved", "✓".bright_green());
            print_written(&path);
            println!();
            println!(
                "Next: fix duplicate ends, drop tap-offs and terminals without CTs, \
                 and save the result as {}",
                checkpoint::REVIEWED_TERMINALS.file.bold()
            );
        }
        TtccCommands::Ratios => {
            let client = api_client(ctx)?;
            let summary = ttcc::run_ratios(ctx, &client).await?;
            println!(
                "{} {} current transformers matched against {} terminals",
                "✓".bright_green(),
                summary.transformers.to_string().bold(),
                summary.terminals.to_string().bold()
            );
            if summary.failed_fichas > 0 {
                println!(
                    "  {} {} technical sheets could not be fetched; their values are empty",
                    "!".yellow(),
                    summary.failed_fichas
                );
            }
            let unresolved = summary.terminals.saturating_sub(summary.resolved);
            println!(
                "  {} ratios resolved, {} left for manual review",
                summary.resolved,
                unresolved.to_string().yellow()
            );
            for path in &summary.outputs {
                print_written(path);
            }
            println!();
            println!(
                "Next: fill the missing ratios and voltages and save the result as {}",
                checkpoint::REVIEWED_RATIOS.file.bold()
            );
        }
        TtccCommands::Final => {
            let (snapshot, report) = ttcc::run_final(ctx)?;
            println!("{} Current-transformer capacities computed", "✓".bright_green());
            print_written(&snapshot);
            print_written(&report);
        }
    }
    println!("{}", format!("Done in {:.1}s", start.elapsed().as_secs_f64()).dimmed());
    Ok(())
}
