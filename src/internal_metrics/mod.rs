//! # Internal Metrics Module
//!
//! The agent records its own activity through the `metrics` facade:
//!
//! - **Counters**: cycles run, reports delivered, delivery and encoding
//!   failures, skipped volumes and WebSocket dials.
//! - **Histograms**: time spent sampling and delivering per cycle.
//!
//! Without an installed recorder the macros are no-ops. When
//! `metrics.log_metrics` is enabled, [`install`] sets a
//! [`LoggingRecorder`](logging_recorder::LoggingRecorder) as the global
//! recorder, which writes everything to the log at a fixed interval.

pub mod logging_recorder;

use crate::config::MetricsConfig;
use logging_recorder::LoggingRecorder;
use metrics::Unit;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Registers descriptions for every metric the agent emits.
pub fn describe() {
    metrics::describe_counter!("cycles_total", Unit::Count, "Sampling cycles started.");
    metrics::describe_counter!("snapshots_delivered_total", Unit::Count, "Reports accepted by the collector, labeled by transport.");
    metrics::describe_counter!("delivery_failures_total", Unit::Count, "Reports that failed to reach the collector, labeled by transport.");
    metrics::describe_counter!("encoding_failures_total", Unit::Count, "Reports dropped because they could not be serialized.");
    metrics::describe_counter!("disk_query_skipped_total", Unit::Count, "Volumes skipped because their usage could not be read.");
    metrics::describe_counter!("websocket_connects_total", Unit::Count, "Successful WebSocket handshakes with the collector.");
    metrics::describe_histogram!("sampling_duration_seconds", Unit::Seconds, "Time spent collecting system and disk metrics per cycle.");
    metrics::describe_histogram!("delivery_duration_seconds", Unit::Seconds, "Time spent delivering one report.");
}

/// Installs the logging recorder if enabled.
///
/// Returns the handle of the logging task, which exits on shutdown.
pub fn install(config: &MetricsConfig, shutdown_rx: watch::Receiver<bool>) -> Option<JoinHandle<()>> {
    if !config.log_metrics {
        return None;
    }

    let interval = Duration::from_secs(config.log_aggregation_seconds);
    let (recorder, handle) = LoggingRecorder::new(interval, shutdown_rx);
    if let Err(e) = metrics::set_global_recorder(recorder) {
        error!("Failed to install logging recorder: {}", e);
        handle.abort();
        return None;
    }
    describe();
    info!(
        "Logging recorder enabled. Metrics will be printed every {} seconds.",
        config.log_aggregation_seconds
    );
    Some(handle)
}
