//! Stage status command handler

use anyhow::Result;
use colored::*;
use std::path::{Path, PathBuf};

use crate::pipeline::RunContext;
use crate::pipeline::checkpoint::{CheckpointKind, STAGES};
use crate::reference::{AGENTS_PATTERN, SUBSTITUTIONS_PATTERN, pick_latest};

/// One expected input file and whether it is in place
#[derive(Debug, Clone, PartialEq)]
pub struct InputStatus {
    pub label: String,
    pub path: Option<PathBuf>,
    pub manual: bool,
}

impl InputStatus {
    pub fn present(&self) -> bool {
        self.path.is_some()
    }
}

/// Checkpoint inputs of every stage, in pipeline order
pub fn stage_inputs(data_dir: &Path) -> Vec<(&'static str, Vec<InputStatus>)> {
    STAGES
        .iter()
        .map(|stage| {
            let inputs = stage
                .checkpoints
                .iter()
                .map(|checkpoint| InputStatus {
                    label: checkpoint.file.to_string(),
                    path: checkpoint.exists(data_dir).then(|| checkpoint.path(data_dir)),
                    manual: checkpoint.kind == CheckpointKind::ManualEdit,
                })
                .collect();
            (stage.command, inputs)
        })
        .collect()
}

/// Newest REUC registry exports used by `pmgd`
pub fn reuc_inputs(input_dir: &Path) -> Vec<InputStatus> {
    [AGENTS_PATTERN, SUBSTITUTIONS_PATTERN]
        .into_iter()
        .map(|pattern| InputStatus {
            label: pattern.to_string(),
            path: pick_latest(input_dir, pattern).ok(),
            manual: false,
        })
        .collect()
}

fn print_input(input: &InputStatus) {
    let mark = if input.present() {
        "✓".bright_green()
    } else {
        "✗".red()
    };
    let label = if input.manual {
        format!("{} {}", input.label, "(edited by hand)".dimmed())
    } else {
        input.label.clone()
    };
    match &input.path {
        Some(path) if path.file_name().is_some_and(|name| name != input.label.as_str()) => {
            println!("    {} {} → {}", mark, label, path.display().to_string().cyan())
        }
        _ => println!("    {} {}", mark, label),
    }
}

pub fn handle_status_command(ctx: &RunContext) -> Result<()> {
    let paths = &ctx.config.paths;
    println!("Data directory:   {}", paths.data_dir.display().to_string().cyan());
    println!("Input directory:  {}", paths.input_dir.display().to_string().cyan());
    println!("Output directory: {}", paths.output_dir.display().to_string().cyan());
    println!();

    for (command, inputs) in stage_inputs(&paths.data_dir) {
        let ready = inputs.iter().all(InputStatus::present);
        let state = if ready { "ready".green() } else { "waiting".yellow() };
        println!("  {} [{}]", command.bold(), state);
        inputs.iter().for_each(print_input);
    }

    let reuc = reuc_inputs(&paths.input_dir);
    let ready = reuc.iter().all(InputStatus::present);
    let state = if ready { "ready".green() } else { "waiting".yellow() };
    println!("  {} [{}]", "pmgd".bold(), state);
    reuc.iter().for_each(print_input);
    Ok(())
}
