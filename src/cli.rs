//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the agent using the
//! `clap` crate. These arguments are parsed at startup and then merged with
//! the configuration from the `simplemon.toml` file and environment variables.

use crate::config::TransportKind;
use clap::Parser;
use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Samples CPU, memory and disk utilization and ships it to a collector.
#[derive(Parser, Debug, Default, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Collector endpoint (http(s):// or ws(s)://).
    #[arg(long, value_name = "URL")]
    pub service_url: Option<String>,

    /// Bearer token presented on the WebSocket handshake.
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Delivery transport.
    #[arg(long, value_enum)]
    pub transport: Option<TransportKind>,

    /// Seconds to sleep between cycles.
    #[arg(long, value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// Log level filter (e.g. "info", "debug").
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Periodically log the agent's internal counters.
    #[arg(long)]
    pub log_metrics: bool,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        let mut transport = Dict::new();
        if let Some(url) = &self.service_url {
            transport.insert("service_url".into(), Value::from(url.clone()));
        }
        if let Some(key) = &self.api_key {
            transport.insert("api_key".into(), Value::from(key.clone()));
        }
        if let Some(kind) = self.transport {
            transport.insert("kind".into(), Value::from(kind.as_str().to_string()));
        }
        if !transport.is_empty() {
            dict.insert("transport".into(), Value::Dict(Tag::Default, transport));
        }

        if let Some(interval) = self.interval {
            let mut sampling = Dict::new();
            sampling.insert("interval_seconds".into(), Value::from(interval));
            dict.insert("sampling".into(), Value::Dict(Tag::Default, sampling));
        }

        // Only an explicit flag overrides the file; absence keeps its value.
        if self.log_metrics {
            let mut metrics = Dict::new();
            metrics.insert("log_metrics".into(), Value::from(true));
            dict.insert("metrics".into(), Value::Dict(Tag::Default, metrics));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
