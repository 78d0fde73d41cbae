//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `sensor-feed.toml`.
//!     loads configuration from file or falls back to defaults, then applies
//!     environment and command-line overrides.
//!
//! structure:
//!     - role: "generator" (post readings) or "collector" (receive them).
//!     - ReporterConfig: where the generator posts.
//!     - CollectorConfig: bind address and json data file.
//!     - LoggingConfig: tracing level, whether the collector echoes readings.
//!
//! precedence (last wins):
//!     defaults < config file < SENSOR_FEED_ENDPOINT < command line
//!
//! ==============================================================================

use anyhow::Context;
use reqwest::Url;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/api/sensor";
pub const ENDPOINT_ENV: &str = "SENSOR_FEED_ENDPOINT";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid endpoint url {url:?}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("unknown role {0:?} (expected \"generator\" or \"collector\")")]
    UnknownRole(String),

    #[error("missing value for {0}")]
    MissingValue(&'static str),

    #[error("unknown argument {0:?}")]
    UnknownArgument(String),
}

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct FeedConfig {
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub reporter: ReporterConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Generator,
    Collector,
}

impl FromStr for Role {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "generator" => Ok(Role::Generator),
            "collector" => Ok(Role::Collector),
            _ => Err(ConfigError::UnknownRole(s.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Generator => f.write_str("generator"),
            Role::Collector => f.write_str("collector"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReporterConfig {
    pub endpoint: String,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self { endpoint: DEFAULT_ENDPOINT.to_string() }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CollectorConfig {
    pub bind_address: String,
    pub data_file: PathBuf,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            data_file: PathBuf::from("sensordata.json"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_sensor_data: true }
    }
}

impl FeedConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_toml(&content).with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load with default fallback
    pub fn load_or_default() -> Self {
        let paths = [
            PathBuf::from("config").join("sensor-feed.toml"),
            PathBuf::from("..").join("config").join("sensor-feed.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        println!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        println!("[CONFIG] Warning: Failed to load {}: {:#}", path.display(), e);
                    }
                }
            }
        }

        println!("[CONFIG] Warning: No config file found - using defaults");
        Self::default()
    }

    /// file (explicit or searched), then env, then cli
    pub fn resolve(args: &CliArgs) -> anyhow::Result<Self> {
        let mut config = match &args.config_path {
            Some(path) => {
                let config = Self::load(path)?;
                println!("[CONFIG] Loaded from {}", path.display());
                config
            }
            None => Self::load_or_default(),
        };
        config.apply_overrides(std::env::var(ENDPOINT_ENV).ok(), args);
        config.endpoint_url()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, env_endpoint: Option<String>, args: &CliArgs) {
        if let Some(endpoint) = env_endpoint.filter(|e| !e.trim().is_empty()) {
            self.reporter.endpoint = endpoint;
        }
        if let Some(endpoint) = &args.endpoint {
            self.reporter.endpoint = endpoint.clone();
        }
        if let Some(role) = args.role {
            self.role = role;
        }
    }

    /// the endpoint as a url; only http(s) is accepted
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let raw = self.reporter.endpoint.trim();
        let invalid = |reason: String| ConfigError::InvalidEndpoint { url: raw.to_string(), reason };

        let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(invalid(format!("unsupported scheme {:?}", other))),
        }
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("┌─────────────────────────────────────────┐");
        println!("│          SENSOR FEED CONFIGURATION      │");
        println!("├─────────────────────────────────────────┤");
        println!("│ Role: {}", self.role);
        match self.role {
            Role::Generator => {
                println!("│ Endpoint: {}", self.reporter.endpoint);
            }
            Role::Collector => {
                println!("│ Bind: {}", self.collector.bind_address);
                println!("│ Data File: {}", self.collector.data_file.display());
            }
        }
        println!("│ Log Level: {}", self.logging.level);
        println!("└─────────────────────────────────────────┘");
    }
}

/// parsed command line
///
/// ```text
/// sensor-feed [generator|collector] [--config <path>] [--endpoint <url>]
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub role: Option<Role>,
    pub config_path: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub help: bool,
}

impl CliArgs {
    pub fn parse<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parsed = CliArgs::default();
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => parsed.help = true,
                "-c" | "--config" => {
                    let value = args.next().ok_or(ConfigError::MissingValue("--config"))?;
                    parsed.config_path = Some(PathBuf::from(value));
                }
                "-e" | "--endpoint" => {
                    let value = args.next().ok_or(ConfigError::MissingValue("--endpoint"))?;
                    parsed.endpoint = Some(value);
                }
                flag if flag.starts_with('-') => {
                    return Err(ConfigError::UnknownArgument(flag.to_string()));
                }
                role => parsed.role = Some(role.parse()?),
            }
        }

        Ok(parsed)
    }

    pub fn usage() -> &'static str {
        "usage: sensor-feed [generator|collector] [--config <path>] [--endpoint <url>]\n\
         \n\
         generator   post a synthetic reading every 5-15s (default)\n\
         collector   receive readings on /api/sensor and store them\n\
         \n\
         env: SENSOR_FEED_ENDPOINT overrides [reporter] endpoint"
    }
}
