//! Configuration loading
//!
//! Sources, lowest priority first:
//! 1. built-in defaults
//! 2. `semantix.toml`, found by walking up from the working directory
//! 3. `SEMANTIX_*` environment variables
//! 4. CLI flags (applied by the binary)

use crate::interp::Limits;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE: &str = "semantix.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{var} must be a non-negative integer, got `{value}`")]
    Env { var: &'static str, value: String },

    #[error("unknown log level `{0}` (expected off, error, warn, info, debug or trace)")]
    LogLevel(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// `[log]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "warn".to_string(),
        }
    }
}

impl LogConfig {
    pub fn level_filter(&self) -> ConfigResult<log::LevelFilter> {
        self.level
            .parse()
            .map_err(|_| ConfigError::LogLevel(self.level.clone()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub limits: Limits,
    pub log: LogConfig,
    /// Where the file was found, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Config {
    /// Defaults, then the nearest `semantix.toml`, then the environment
    pub fn load(start_dir: &Path) -> ConfigResult<Config> {
        let mut config = match find_config(start_dir) {
            Some(path) => Config::load_from_file(&path)?,
            None => Config::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> ConfigResult<Config> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("loaded configuration from {}", path.display());
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Override limits from `SEMANTIX_MAX_STEPS`, `SEMANTIX_MAX_CALL_DEPTH`,
    /// `SEMANTIX_WALL_CLOCK_MS` and `SEMANTIX_MAX_TRACE_BYTES`, and the log
    /// level from `SEMANTIX_LOG`
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> ConfigResult<()> {
        let limits = &mut self.limits;
        for (name, slot) in [
            ("SEMANTIX_MAX_STEPS", &mut limits.max_steps),
            ("SEMANTIX_MAX_CALL_DEPTH", &mut limits.max_call_depth),
            ("SEMANTIX_WALL_CLOCK_MS", &mut limits.wall_clock_ms),
            ("SEMANTIX_MAX_TRACE_BYTES", &mut limits.max_trace_bytes),
        ] {
            if let Some(value) = var(name) {
                *slot = value.trim().parse().map_err(|_| ConfigError::Env {
                    var: name,
                    value: value.clone(),
                })?;
            }
        }
        if let Some(level) = var("SEMANTIX_LOG") {
            self.log.level = level;
        }
        Ok(())
    }
}

/// Nearest `semantix.toml` in `start` or one of its ancestors
pub fn find_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}
