use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use prwarden_service::config::{CacheConfig, GitHubConfig, RetryConfig, SweepConfig};

/// Controls the log format
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Auto detect (pretty for tty, simplified for other)
    Auto,
    /// With colors
    Pretty,
    /// Simplified log output
    Simplified,
    /// Dump out JSON lines
    Json,
}

/// The log level.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Controls the logging system.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Logging {
    /// The log level for the bot.
    pub level: LogLevel,
    /// Controls the log format.
    pub format: LogFormat,
    /// When set to true, backtraces are forced on.
    pub enable_backtraces: bool,
}

impl Default for Logging {
    fn default() -> Self {
        Logging {
            level: LogLevel::Info,
            format: LogFormat::Auto,
            enable_backtraces: true,
        }
    }
}

/// The global config of the bot.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Host and port of the HTTP server.
    pub bind: Option<String>,

    /// Configure the logging system.
    pub logging: Logging,

    /// Access to the GitHub API.
    pub github: GitHubConfig,

    /// The per-delivery item cache.
    pub cache: CacheConfig,

    /// The fetch retry budget.
    pub retry: RetryConfig,

    /// The periodic merge-conflict sweep.
    pub sweep: SweepConfig,
}

impl Config {
    /// The address the server binds to.
    pub fn bind(&self) -> &str {
        self.bind.as_deref().unwrap_or("0.0.0.0:3030")
    }

    pub fn get(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_reader(
                fs::File::open(path).context("failed to open configuration file")?,
            ),
            None => Ok(Config::default()),
        }
    }

    fn from_reader(reader: impl std::io::Read) -> Result<Self> {
        serde_yaml::from_reader(reader).context("failed to parse YAML")
    }
}
