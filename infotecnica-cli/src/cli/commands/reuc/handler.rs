//! REUC registry command handler

use anyhow::Result;
use colored::*;

use super::ReucCommands;
use crate::cli::commands::print_written;
use crate::pipeline::{RunContext, reuc};

pub async fn handle_reuc_command(command: ReucCommands, ctx: &RunContext) -> Result<()> {
    match command {
        ReucCommands::Agents => {
            let client = reuc::client(ctx)?;
            let (count, path) = reuc::run_agents(ctx, &client).await?;
            println!(
                "{} {} companies downloaded from the REUC registry",
                "✓".bright_green(),
                count.to_string().bold()
            );
            print_written(&path);
        }
    }
    Ok(())
}
