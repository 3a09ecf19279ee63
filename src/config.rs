//! Configuration management for the agent
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all agent settings. It uses the `figment`
//! crate to layer compiled defaults, a `simplemon.toml` file, environment
//! variables and command-line arguments.
//!
//! Loading never masks a broken source: a requested file that is missing,
//! a value of the wrong type or an unusable collector URL is returned as a
//! [`ConfigError`] and the caller decides what to do.

use crate::cli::Cli;
use crate::errors::ConfigError;
use crate::retry::RetryPolicy;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Used when no `--config` is given and the file exists.
pub const DEFAULT_CONFIG_FILE: &str = "simplemon.toml";

/// The main configuration struct for the agent.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the agent.
    pub log_level: String,
    /// Sampling cadence and sources.
    pub sampling: SamplingConfig,
    /// Collector endpoint and transport settings.
    pub transport: TransportConfig,
    /// Behaviour after failed deliveries.
    pub delivery: DeliveryConfig,
    /// Internal metrics logging.
    pub metrics: MetricsConfig,
}

/// Configuration for the sampling loop.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SamplingConfig {
    /// Seconds to sleep after each cycle.
    pub interval_seconds: u64,
    /// Length of the CPU measurement window in milliseconds.
    pub cpu_window_ms: u64,
    /// Path whose filesystem usage is reported as `disk_usage`.
    pub root_path: PathBuf,
    /// Report pseudo filesystems such as `proc` and `tmpfs` as well.
    pub include_pseudo_filesystems: bool,
}

impl SamplingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn cpu_window(&self) -> Duration {
        Duration::from_millis(self.cpu_window_ms)
    }
}

/// The delivery strategy.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// One POST per report.
    Http,
    /// One persistent connection, one text frame per report.
    Websocket,
    /// Print each report to standard output.
    Stdout,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Http => "http",
            TransportKind::Websocket => "websocket",
            TransportKind::Stdout => "stdout",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for the delivery transport.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TransportConfig {
    pub kind: TransportKind,
    /// The collector endpoint.
    #[serde(deserialize_with = "string_or_number")]
    pub service_url: String,
    /// Bearer token for the WebSocket handshake.
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub api_key: Option<String>,
    pub connect_timeout_ms: u64,
    pub send_timeout_ms: u64,
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// The configured API key, if it is non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

/// Environment values are parsed as typed values, so an all-digit token
/// arrives as an integer.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Unsigned(u64),
    Signed(i64),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Unsigned(n) => n.to_string(),
            StringOrNumber::Signed(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn optional_string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(String::from))
}

/// Configuration for delivery failure handling.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub retry: RetryPolicy,
}

/// Configuration for internal metrics.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Log internal counters periodically.
    pub log_metrics: bool,
    /// Seconds between two metrics log lines.
    pub log_aggregation_seconds: u64,
}

impl Config {
    /// Loads the configuration by layering defaults, the TOML file,
    /// `SIMPLEMON_` environment variables and the command-line arguments.
    ///
    /// # Errors
    /// * `ConfigError::NotFound` if `--config` names a missing file
    /// * `ConfigError::Figment` if a source holds a malformed value
    /// * `ConfigError::Invalid` if the merged values are inconsistent
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let config_path = match &cli.config {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.clone())),
            Some(path) => Some(path.clone()),
            None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
        };

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(path) = &config_path {
            figment = figment.merge(Toml::file(path));
        }
        let config: Config = figment
            // e.g. SIMPLEMON_TRANSPORT__API_KEY=secret
            .merge(Env::prefixed("SIMPLEMON_").split("__"))
            .merge(cli.clone())
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field consistency that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sampling.interval_seconds == 0 {
            return Err(ConfigError::Invalid("sampling.interval_seconds must be greater than zero".into()));
        }
        if self.transport.connect_timeout_ms == 0 || self.transport.send_timeout_ms == 0 {
            return Err(ConfigError::Invalid("transport timeouts must be greater than zero".into()));
        }
        if self.metrics.log_metrics && self.metrics.log_aggregation_seconds == 0 {
            return Err(ConfigError::Invalid("metrics.log_aggregation_seconds must be greater than zero".into()));
        }
        validate_service_url(self.transport.kind, &self.transport.service_url)
    }

    /// The TOML file this configuration would be read from, if any.
    pub fn source_file(cli: &Cli) -> Option<&Path> {
        match &cli.config {
            Some(path) => Some(path.as_path()),
            None => Some(Path::new(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
        }
    }
}

fn validate_service_url(kind: TransportKind, service_url: &str) -> Result<(), ConfigError> {
    if kind == TransportKind::Stdout {
        return Ok(());
    }
    let url = reqwest::Url::parse(service_url).map_err(|e| {
        ConfigError::Invalid(format!("transport.service_url '{}' is not a valid URL: {}", service_url, e))
    })?;
    let allowed: &[&str] = match kind {
        TransportKind::Http => &["http", "https"],
        TransportKind::Websocket => &["ws", "wss"],
        TransportKind::Stdout => &[],
    };
    if !allowed.contains(&url.scheme()) {
        return Err(ConfigError::Invalid(format!(
            "transport.service_url scheme '{}' does not match the {} transport (expected {})",
            url.scheme(),
            kind,
            allowed.join(" or ")
        )));
    }
    Ok(())
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            sampling: SamplingConfig {
                interval_seconds: 1,
                cpu_window_ms: 1000,
                root_path: PathBuf::from("/"),
                include_pseudo_filesystems: false,
            },
            transport: TransportConfig {
                kind: TransportKind::Http,
                service_url: "http://localhost:8080/api/metrics".to_string(),
                api_key: None,
                connect_timeout_ms: 5000,
                send_timeout_ms: 5000,
            },
            delivery: DeliveryConfig::default(),
            metrics: MetricsConfig {
                log_metrics: false,
                log_aggregation_seconds: 60,
            },
        }
    }
}
