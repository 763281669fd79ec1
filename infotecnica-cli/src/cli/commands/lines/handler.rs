//! Line stages command handler

use anyhow::Result;
use colored::*;
use std::time::Instant;

use super::LinesCommands;
use crate::cli::commands::{api_client, print_written};
use crate::pipeline::{RunContext, checkpoint, lines};

pub async fn handle_lines_command(command: LinesCommands, ctx: &RunContext) -> Result<()> {
    let start = Instant::now();
    match command {
        LinesCommands::Fetch => {
            let client = api_client(ctx)?;
            println!("Fetching line sections from {}...", ctx.config.api.base_url.cyan());
            let summary = lines::run_fetch(ctx, &client).await?;

            println!(
                "{} {} sections fetched, {} kept after the voltage filter",
                "✓".bright_green(),
                summary.sections.to_string().bold(),
                summary.kept.to_string().bold()
            );
            if summary.failed_fichas > 0 {
                println!(
                    "  {} {} technical sheets could not be fetched; their values are empty",
                    "!".yellow(),
                    summary.failed_fichas
                );
            }
            println!(
                "  {} zones, {} new sections",
                summary.zones,
                summary.new_sections.to_string().yellow()
            );
            for path in &summary.outputs {
                print_written(path);
            }
            println!();
            println!(
                "Next: classify the new sections by zone and save the result as {}",
                checkpoint::CLASSIFIED_LINES.file.bold()
            );
        }
        LinesCommands::Final => {
            let report = lines::run_final(ctx)?;
            println!("{} Final line report ready", "✓".bright_green());
            print_written(&report);
        }
    }
    println!("{}", format!("Done in {:.1}s", start.elapsed().as_secs_f64()).dimmed());
    Ok(())
}
