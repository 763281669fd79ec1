mod handler;

use clap::Subcommand;

pub use handler::handle_reuc_command;

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReucCommands {
    /// Download the registry of coordinated companies
    Agents,
}
