//! Pipeline stages
//!
//! Every stage is a run-once batch job: fetch, merge with reference data,
//! clean, write. Stages hand work to each other through spreadsheets in the
//! data directory, some of which are edited by hand in between (see
//! `checkpoint`).

pub mod checkpoint;
pub mod lines;
pub mod pmgd;
pub mod reuc;
pub mod ttcc;

use std::path::PathBuf;

use anyhow::Result;
use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::config::Config;
use crate::excel::new_report_path;

/// Settings and clock shared by the stages of one run
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: Config,
    /// Date used for substitution windows
    pub today: NaiveDate,
    /// Timestamp put into report names
    pub started: NaiveDateTime,
}

impl RunContext {
    pub fn new(config: Config) -> Self {
        let now = Local::now().naive_local();
        Self::at(config, now)
    }

    /// Context with a fixed clock
    pub fn at(config: Config, started: NaiveDateTime) -> Self {
        Self {
            config,
            today: started.date(),
            started,
        }
    }

    /// File inside the data directory
    pub fn data_path(&self, file: &str) -> PathBuf {
        self.config.paths.data_dir.join(file)
    }

    /// Fresh report path in the output directory
    pub fn report_path(&self, stem: &str) -> Result<PathBuf> {
        let run_at = self.config.report.timestamp.then_some(self.started);
        new_report_path(&self.config.paths.output_dir, stem, run_at)
    }

    pub fn placeholder(&self) -> &str {
        &self.config.report.placeholder
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::Path;

    use chrono::NaiveDate;

    use super::RunContext;
    use crate::config::Config;

    /// Context rooted in `dir` with data, input and output subdirectories
    pub fn context(dir: &Path) -> RunContext {
        let mut config = Config::default();
        config.paths.data_dir = dir.join("Datos");
        config.paths.input_dir = dir.join("input");
        config.paths.output_dir = dir.join("output");
        for sub in [
            &config.paths.data_dir,
            &config.paths.input_dir,
            &config.paths.output_dir,
        ] {
            std::fs::create_dir_all(sub).unwrap();
        }
        let started = NaiveDate::from_ymd_opt(2025, 11, 3)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        RunContext::at(config, started)
    }
}
