//! Command-line interface

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Overrides;
use commands::lines::LinesCommands;
use commands::reuc::ReucCommands;
use commands::ttcc::TtccCommands;

/// Batch jobs that build the ERST line and current-transformer tables from
/// Infotécnica, and export PMGD units with their REUC identity
#[derive(Parser, Debug)]
#[command(name = "infotecnica-cli", author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to <config dir>/infotecnica-cli/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory with stage snapshots and manual checkpoints
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Directory with the REUC registry exports
    #[arg(long, global = true)]
    pub input_dir: Option<PathBuf>,

    /// Directory for final reports
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Concurrent detail requests
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub accept_invalid_certs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transmission line sections and thermal limits
    Lines {
        #[command(subcommand)]
        command: LinesCommands,
    },
    /// Current transformers at line terminals
    Ttcc {
        #[command(subcommand)]
        command: TtccCommands,
    },
    /// PMGD generating units with their REUC company
    Pmgd,
    /// REUC company registry
    Reuc {
        #[command(subcommand)]
        command: ReucCommands,
    },
    /// Show every stage and whether its input files are in place
    Status,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            data_dir: self.data_dir.clone(),
            input_dir: self.input_dir.clone(),
            output_dir: self.output_dir.clone(),
            workers: self.workers,
            accept_invalid_certs: self.accept_invalid_certs,
        }
    }

    /// Whether the command talks to Infotécnica
    pub fn needs_api(&self) -> bool {
        matches!(
            self.command,
            Commands::Lines {
                command: LinesCommands::Fetch
            } | Commands::Ttcc {
                command: TtccCommands::Terminals | TtccCommands::Ratios
            } | Commands::Pmgd
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "infotecnica-cli",
            "ttcc",
            "ratios",
            "--workers",
            "8",
            "--data-dir",
            "/tmp/erst",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Ttcc {
                command: TtccCommands::Ratios
            }
        ));
        let overrides = cli.overrides();
        assert_eq!(overrides.workers, Some(8));
        assert_eq!(overrides.data_dir, Some(PathBuf::from("/tmp/erst")));
        assert!(!overrides.accept_invalid_certs);
        assert!(cli.needs_api());
    }

    #[test]
    fn test_offline_commands() {
        for args in [
            vec!["infotecnica-cli", "lines", "final"],
            vec!["infotecnica-cli", "ttcc", "final"],
            vec!["infotecnica-cli", "reuc", "agents"],
            vec!["infotecnica-cli", "status"],
        ] {
            let cli = Cli::try_parse_from(args).unwrap();
            assert!(!cli.needs_api());
        }
    }

    #[test]
    fn test_missing_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["infotecnica-cli", "lines"]).is_err());
        assert!(Cli::try_parse_from(["infotecnica-cli"]).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
