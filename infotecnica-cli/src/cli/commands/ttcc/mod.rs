mod handler;

use clap::Subcommand;

pub use handler::handle_ttcc_command;

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtccCommands {
    /// Resolve the two terminal bays of every classified section
    Terminals,
    /// Match current transformers to terminals and check their ratios
    Ratios,
    /// Compute capacities and write the final report
    Final,
}
