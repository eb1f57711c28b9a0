/// Explorer configuration loader - parses ffa.toml
///
/// Keeps analysis parameters and the station list out of code. The file
/// holds the default analysis settings, the fallback station, and one
/// `[[station]]` entry per gauge with the path to its annual peak file.
///
/// Precedence, lowest first: built-in defaults, ffa.toml, environment
/// (`FFA_SEED`, `FFA_WORKERS`, optionally via `.env`), command-line flags.

use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::simulation::{DEFAULT_WORKERS, MAX_SIMULATIONS};
use crate::model::{FfaError, ReturnPeriodGrid};

pub const DEFAULT_CONFIG_PATH: &str = "ffa.toml";

// ---------------------------------------------------------------------------
// Analysis settings
// ---------------------------------------------------------------------------

/// Geometric return-period grid settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub start: f64,
    pub end: f64,
    pub points: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            start: 0.01,
            end: 1000.0,
            points: 500,
        }
    }
}

impl GridConfig {
    pub fn build(&self) -> Result<ReturnPeriodGrid, FfaError> {
        ReturnPeriodGrid::geometric(self.start, self.end, self.points)
    }
}

/// Parameters for one analysis invocation. Never mutated by the analysis;
/// a change of settings is a new invocation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Peaks drawn (without replacement) per simulation run.
    pub sample_size: usize,
    /// Number of simulation runs.
    pub n_simulations: usize,
    /// Cap on `n_simulations`; larger requests are clamped with a warning.
    pub max_simulations: usize,
    /// Worker threads for the simulation pool.
    pub workers: usize,
    /// Master seed for reproducible runs. None draws from OS entropy.
    pub seed: Option<u64>,
    pub grid: GridConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_size: 10,
            n_simulations: 5,
            max_simulations: MAX_SIMULATIONS,
            workers: DEFAULT_WORKERS,
            seed: None,
            grid: GridConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Applies `FFA_SEED` / `FFA_WORKERS` from `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(seed) = lookup("FFA_SEED") {
            self.seed = Some(parse_env("FFA_SEED", &seed)?);
        }
        if let Some(workers) = lookup("FFA_WORKERS") {
            self.workers = parse_env("FFA_WORKERS", &workers)?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".to_string()));
        }
        if self.max_simulations == 0 {
            return Err(ConfigError::Invalid("max_simulations must be at least 1".to_string()));
        }
        self.grid
            .build()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{}='{}' is not a valid number", name, value)))
}

// ---------------------------------------------------------------------------
// Station list
// ---------------------------------------------------------------------------

/// A gauge whose annual peaks can be analyzed.
#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    pub site_code: String,
    pub name: String,
    /// USGS peak-streamflow RDB file, relative to the working directory.
    pub peak_file: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Root configuration structure for TOML parsing.
#[derive(Debug, Clone, Deserialize)]
pub struct ExplorerConfig {
    /// Station used when the requested one cannot be analyzed.
    pub default_station: String,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default, rename = "station")]
    pub stations: Vec<StationConfig>,
}

impl ExplorerConfig {
    pub fn station(&self, site_code: &str) -> Option<&StationConfig> {
        self.stations.iter().find(|s| s.site_code == site_code)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.analysis.validate()?;
        if !self.stations.is_empty() && self.station(&self.default_station).is_none() {
            return Err(ConfigError::Invalid(format!(
                "default_station '{}' is not in the [[station]] list",
                self.default_station
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    /// Config file missing or unreadable.
    Io { path: PathBuf, source: std::io::Error },
    /// Config file is not valid TOML for this schema.
    Parse { path: PathBuf, message: String },
    /// Values parsed but are out of range or inconsistent.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "Failed to read {}: {}\n\n", path.display(), source)?;
                write!(f, "  Copy the sample configuration or set FFA_CONFIG to its location.")
            }
            ConfigError::Parse { path, message } => {
                write!(f, "Failed to parse {}: {}", path.display(), message)
            }
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Config path from `FFA_CONFIG` (after loading `.env`), else ffa.toml.
pub fn config_path() -> PathBuf {
    dotenv::dotenv().ok();
    env::var("FFA_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Loads the configuration from `config_path()` and applies environment
/// overrides.
pub fn load_config() -> Result<ExplorerConfig, ConfigError> {
    let mut config = load_config_from(config_path())?;
    config.analysis.apply_env_overrides(|name| env::var(name).ok())?;
    Ok(config)
}

/// Loads and validates a configuration file without environment overrides.
pub fn load_config_from<P: AsRef<Path>>(path: P) -> Result<ExplorerConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&contents).map_err(|e| match e {
        ConfigError::Parse { message, .. } => ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    })
}

/// Parses configuration text.
pub fn parse_config(contents: &str) -> Result<ExplorerConfig, ConfigError> {
    let config: ExplorerConfig = toml::from_str(contents).map_err(|e| ConfigError::Parse {
        path: PathBuf::from("<inline>"),
        message: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}
