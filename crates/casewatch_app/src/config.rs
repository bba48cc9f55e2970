use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use casewatch_engine::ClientSettings;
use engine_logging::LogDestination;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_CONFIG_FILENAME: &str = "casewatch.ron";

/// Settings read from `casewatch.ron`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub target: LogTarget,
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`.
    pub level: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogTarget {
    Terminal,
    File(PathBuf),
    Both(PathBuf),
}

impl Default for AppConfig {
    fn default() -> Self {
        let client = ClientSettings::default();
        Self {
            base_url: client.base_url,
            connect_timeout_ms: millis(client.connect_timeout),
            request_timeout_ms: millis(client.request_timeout),
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            target: LogTarget::Terminal,
            level: "warn".to_string(),
        }
    }
}

impl AppConfig {
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.base_url.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            ..ClientSettings::default()
        }
    }

    pub fn log_destination(&self) -> LogDestination {
        match &self.log.target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File(path) => LogDestination::File(path.clone()),
            LogTarget::Both(path) => LogDestination::Both(path.clone()),
        }
    }

    pub fn log_level(&self) -> Result<LevelFilter, AppError> {
        self.log
            .level
            .trim()
            .parse()
            .map_err(|_| AppError::LogLevel(self.log.level.clone()))
    }
}

/// Loads the config at `path`. A missing file yields the defaults.
pub fn load(path: &Path) -> Result<AppConfig, AppError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(AppConfig::default());
        }
        Err(source) => {
            return Err(AppError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    ron::from_str(&content).map_err(|err| AppError::ConfigParse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
