//! Error types shared across the agent.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// An OS counter query failed.
///
/// Raised by metrics and volume sources. When it escapes a snapshot or the
/// volume enumeration it halts the agent.
#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("system metrics are not supported on this platform")]
    Unsupported,

    #[error("no CPUs were reported by the operating system")]
    NoCpus,

    #[error("total memory was reported as zero")]
    MemoryUnavailable,

    #[error("no mounted volume covers {0}")]
    RootNotFound(PathBuf),

    #[error("volume {0} is no longer mounted")]
    VolumeMissing(String),

    #[error("usage of volume {0} could not be read")]
    VolumeUnreadable(String),

    #[error("volume enumeration failed: {0}")]
    Enumeration(String),
}

/// The report could not be turned into a wire document.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("field {field} holds a non-finite value")]
    NonFinite { field: String },

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// A document did not reach the collector.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("collector responded with status {0}")]
    Status(u16),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket connect to {url} failed: {source}")]
    Connect {
        url: String,
        #[source]
        source: tungstenite::Error,
    },

    #[error("WebSocket connect did not finish within {0:?}")]
    ConnectTimeout(Duration),

    #[error("WebSocket send failed: {0}")]
    Send(#[source] tungstenite::Error),

    #[error("WebSocket send did not finish within {0:?}")]
    SendTimeout(Duration),

    #[error("API key cannot be used as a header value")]
    InvalidApiKey,

    #[error("writing to stdout failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration could not be loaded or is inconsistent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file {0} does not exist")]
    NotFound(PathBuf),

    #[error(transparent)]
    Figment(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Figment(Box::new(e))
    }
}

/// Terminal failures of the sampling loop.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("sampling failed: {0}")]
    Sampling(#[from] SamplingError),
}
