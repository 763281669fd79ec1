mod api;
mod cli;
mod config;
mod excel;
mod pipeline;
mod reference;
mod table;
mod transform;

use anyhow::Result;
use clap::Parser;
use log::info;

use cli::commands::{lines, pmgd, reuc, status, ttcc};
use cli::{Cli, Commands};
use config::Config;
use pipeline::RunContext;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_overrides(&cli.overrides());
    config.validate()?;
    if cli.needs_api() {
        info!(
            "Infotécnica at {} ({} workers, {} for current transformers)",
            config.api.base_url, config.api.workers, config.api.ct_workers
        );
    }

    let ctx = RunContext::new(config);
    match cli.command {
        Commands::Lines { command } => lines::handle_lines_command(command, &ctx).await,
        Commands::Ttcc { command } => ttcc::handle_ttcc_command(command, &ctx).await,
        Commands::Pmgd => pmgd::handle_pmgd_command(&ctx).await,
        Commands::Reuc { command } => reuc::handle_reuc_command(command, &ctx).await,
        Commands::Status => status::handle_status_command(&ctx),
    }
}
