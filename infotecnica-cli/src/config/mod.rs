//! Run configuration
//!
//! Settings come from a TOML file (by default
//! `<config dir>/infotecnica-cli/config.toml`), then command-line overrides.
//! The resulting `Config` is built once in `main` and handed to every client
//! and stage; nothing reads settings from global state.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::constants::{
    CT_DETAIL_WORKERS, DEFAULT_DETAIL_WORKERS, DEFAULT_PAGE_SIZE, INFOTECNICA_BASE_URL,
    REUC_BASE_URL, REUC_TIMEOUT_SECS,
};

/// Environment variable holding the REUC API key when the file has none
pub const REUC_API_KEY_ENV: &str = "REUC_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub reuc: ReucConfig,
    pub paths: PathsConfig,
    pub report: ReportConfig,
}

/// Infotécnica API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Rows per page for paginated listings
    pub page_size: usize,
    /// Concurrent ficha requests for sections and generic detail fetches
    pub workers: usize,
    /// Concurrent ficha requests for current-transformer fetches
    pub ct_workers: usize,
    /// Skip TLS certificate verification
    pub accept_invalid_certs: bool,
    /// Per-request timeout; `None` keeps the HTTP client's default
    pub timeout_secs: Option<u64>,
}

/// REUC registry API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReucConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// Working directories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Stage inputs, intermediate snapshots and manual checkpoints
    pub data_dir: PathBuf,
    /// Externally supplied reference workbooks (REUC registry exports)
    pub input_dir: PathBuf,
    /// Final reports
    pub output_dir: PathBuf,
}

/// Report rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Text written in place of missing values
    pub placeholder: String,
    /// Append the run timestamp to report file names
    pub timestamp: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: INFOTECNICA_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            workers: DEFAULT_DETAIL_WORKERS,
            ct_workers: CT_DETAIL_WORKERS,
            accept_invalid_certs: false,
            timeout_secs: None,
        }
    }
}

impl Default for ReucConfig {
    fn default() -> Self {
        Self {
            base_url: REUC_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: REUC_TIMEOUT_SECS,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("Datos"),
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            placeholder: "-".to_string(),
            timestamp: true,
        }
    }
}

/// Values given on the command line, applied over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub workers: Option<usize>,
    pub accept_invalid_certs: bool,
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("infotecnica-cli").join("config.toml"))
    }

    /// Load from `path`, or from the default location when `path` is `None`.
    ///
    /// An explicit path must exist; a missing default file just means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(default) if default.exists() => Self::from_file(&default),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(dir) = &overrides.data_dir {
            self.paths.data_dir = dir.clone();
        }
        if let Some(dir) = &overrides.input_dir {
            self.paths.input_dir = dir.clone();
        }
        if let Some(dir) = &overrides.output_dir {
            self.paths.output_dir = dir.clone();
        }
        if let Some(workers) = overrides.workers {
            self.api.workers = workers;
            self.api.ct_workers = workers;
        }
        if overrides.accept_invalid_certs {
            self.api.accept_invalid_certs = true;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.page_size == 0 {
            anyhow::bail!("api.page_size must be greater than zero");
        }
        if self.api.workers == 0 || self.api.ct_workers == 0 {
            anyhow::bail!("api.workers and api.ct_workers must be greater than zero");
        }
        Ok(())
    }

    /// REUC key from the file, falling back to `REUC_API_KEY`
    pub fn reuc_api_key(&self) -> Option<String> {
        self.reuc
            .api_key
            .clone()
            .or_else(|| std::env::var(REUC_API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }
}
