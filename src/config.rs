//! Runtime configuration.
//!
//! Values come from an optional JSON file, then from environment variables, then from
//! command-line flags applied by the caller. Every field has a default, so an empty file
//! (or no file at all) is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::WatchError;
use crate::fsx as fs;

pub const ENV_MAX_WORKERS: &str = "PARCELWATCH_MAX_WORKERS";
pub const ENV_LOG: &str = "PARCELWATCH_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker threads per cycle. [0 = one per CPU core]
    pub max_workers: usize,
    /// Root of the per-item scratch directories.
    pub work_dir: PathBuf,
    pub snapshot_dir: PathBuf,
    pub archive_dir: PathBuf,
    pub changelog_dir: PathBuf,
    /// Run checks without archiving downloads or saving snapshots.
    pub dry_run: bool,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_workers: 2,
            work_dir: PathBuf::from("./process"),
            snapshot_dir: PathBuf::from("./version"),
            archive_dir: PathBuf::from("./archive"),
            changelog_dir: PathBuf::from("./changelog"),
            dry_run: false,
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `parcelwatch=debug`.
    pub level: String,
    /// Emit one JSON object per event instead of human-readable lines.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Reads `path` if given, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, WatchError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, WatchError> {
        let raw = fs::read_to_string(path).map_err(WatchError::io(path))?;
        serde_json::from_str(&raw).map_err(|e| WatchError::Config(format!("{}: {e}", path.display())))
    }

    /// Applies overrides looked up through `lookup`, normally the process environment.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), WatchError> {
        if let Some(raw) = lookup(ENV_MAX_WORKERS) {
            self.max_workers = raw
                .trim()
                .parse()
                .map_err(|_| WatchError::Config(format!("{ENV_MAX_WORKERS} must be a non-negative integer, got '{raw}'")))?;
        }
        if let Some(level) = lookup(ENV_LOG) {
            self.logging.level = level;
        }
        Ok(())
    }
}
