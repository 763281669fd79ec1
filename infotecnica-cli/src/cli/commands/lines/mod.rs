mod handler;

use clap::Subcommand;

pub use handler::handle_lines_command;

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinesCommands {
    /// Download sections with their thermal limits and write the zone tables
    Fetch,
    /// Build the final line report from the classified zone tables
    Final,
}
