//! The sampling loop, decoupled from the entry point.

use crate::{
    config::Config,
    core::{CombinedReport, MetricsSource, Transport, VolumeSource},
    disks::{collect_disk_metrics, SysinfoVolumes},
    errors::AgentError,
    report,
    retry::RetryPolicy,
    sampler::SystemSampler,
    transport,
};
use anyhow::Result;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// What happened to the report of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The collector accepted the report.
    Delivered,
    /// The report was lost in transit. The loop keeps going.
    DeliveryFailed,
    /// The report could not be serialized and was dropped before delivery.
    EncodingFailed,
}

/// The running agent: one metrics source, one volume source and one transport,
/// driven strictly sequentially.
pub struct Agent {
    config: Config,
    metrics_source: Box<dyn MetricsSource>,
    volume_source: Box<dyn VolumeSource>,
    transport: Box<dyn Transport>,
    consecutive_failures: u32,
}

impl Agent {
    /// Creates a new `AgentBuilder` to construct an `Agent`.
    pub fn builder(config: Config) -> AgentBuilder {
        AgentBuilder::new(config)
    }

    /// Name of the configured transport.
    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Deliveries that failed since the last success.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Runs one cycle: sample, classify disks, serialize, deliver.
    ///
    /// # Returns
    /// * `Ok(CycleOutcome)` for every cycle that got past sampling
    /// * `Err(AgentError)` if sampling or volume enumeration failed; the
    ///   caller is expected to stop
    #[instrument(skip_all)]
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, AgentError> {
        metrics::counter!("cycles_total").increment(1);

        let sampling_start = Instant::now();
        let system = self.metrics_source.snapshot().await?;
        let disks = collect_disk_metrics(
            self.volume_source.as_mut(),
            self.config.sampling.include_pseudo_filesystems,
        )?;
        metrics::histogram!("sampling_duration_seconds").record(sampling_start.elapsed().as_secs_f64());

        let report = CombinedReport { system, disks };
        let document = match report::encode(&report) {
            Ok(document) => document,
            Err(e) => {
                error!("Dropping report that could not be encoded: {}", e);
                metrics::counter!("encoding_failures_total").increment(1);
                return Ok(CycleOutcome::EncodingFailed);
            }
        };
        debug!(document = %document, "Encoded report");

        let transport_name = self.transport.name().to_string();
        let delivery_start = Instant::now();
        let result = self.transport.deliver(&document).await;
        metrics::histogram!("delivery_duration_seconds").record(delivery_start.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                if self.consecutive_failures > 0 {
                    info!(
                        "Delivery via {} recovered after {} failed attempts",
                        transport_name, self.consecutive_failures
                    );
                }
                self.consecutive_failures = 0;
                metrics::counter!("snapshots_delivered_total", "transport" => transport_name).increment(1);
                Ok(CycleOutcome::Delivered)
            }
            Err(e) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                warn!("Delivery via {} failed, report dropped: {}", transport_name, e);
                metrics::counter!("delivery_failures_total", "transport" => transport_name).increment(1);
                Ok(CycleOutcome::DeliveryFailed)
            }
        }
    }

    /// Runs cycles until `shutdown_rx` fires or sampling fails.
    ///
    /// Shutdown is observed both mid-cycle and while sleeping between
    /// cycles. The transport is closed before returning in either case.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) -> Result<(), AgentError> {
        let interval = self.config.sampling.interval();
        let policy: RetryPolicy = self.config.delivery.retry.clone();
        info!(
            "Sampling every {:?}, delivering via {} ({} on failure)",
            interval,
            self.transport.name(),
            policy.describe()
        );

        let result = loop {
            if *shutdown_rx.borrow() {
                break Ok(());
            }

            let outcome = tokio::select! {
                biased;
                _ = shutdown_rx.changed() => break Ok(()),
                outcome = self.run_cycle() => outcome,
            };
            if let Err(e) = outcome {
                error!("Sampling failed, halting agent: {}", e);
                break Err(e);
            }

            let delay = next_delay(&policy, interval, self.consecutive_failures);
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => break Ok(()),
                _ = tokio::time::sleep(delay) => {}
            }
        };

        self.transport.close().await;
        info!("Sampling loop stopped.");
        result
    }
}

fn next_delay(policy: &RetryPolicy, interval: Duration, consecutive_failures: u32) -> Duration {
    let delay = policy.delay(interval, consecutive_failures);
    if delay != interval {
        debug!(
            "Waiting {:?} before next cycle after {} consecutive delivery failures",
            delay, consecutive_failures
        );
    }
    delay
}

/// Builder for the agent.
///
/// Production components are created from the configuration unless an
/// override is supplied, which is how tests inject fakes.
pub struct AgentBuilder {
    config: Config,
    metrics_source_override: Option<Box<dyn MetricsSource>>,
    volume_source_override: Option<Box<dyn VolumeSource>>,
    transport_override: Option<Box<dyn Transport>>,
}

impl AgentBuilder {
    /// Creates a new `AgentBuilder` with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            metrics_source_override: None,
            volume_source_override: None,
            transport_override: None,
        }
    }

    /// Overrides the system metrics source for testing.
    pub fn metrics_source_override(mut self, source: Box<dyn MetricsSource>) -> Self {
        self.metrics_source_override = Some(source);
        self
    }

    /// Overrides the volume source for testing.
    pub fn volume_source_override(mut self, source: Box<dyn VolumeSource>) -> Self {
        self.volume_source_override = Some(source);
        self
    }

    /// Overrides the delivery transport for testing.
    pub fn transport_override(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport_override = Some(transport);
        self
    }

    /// Builds the agent, creating any component that was not overridden.
    pub fn build(self) -> Result<Agent> {
        let metrics_source = match self.metrics_source_override {
            Some(source) => source,
            None => Box::new(SystemSampler::from_config(&self.config.sampling)),
        };
        let volume_source = match self.volume_source_override {
            Some(source) => source,
            None => Box::new(SysinfoVolumes::new()),
        };
        let transport = match self.transport_override {
            Some(transport) => transport,
            None => transport::from_config(&self.config.transport)?,
        };

        Ok(Agent {
            config: self.config,
            metrics_source,
            volume_source,
            transport,
            consecutive_failures: 0,
        })
    }
}
