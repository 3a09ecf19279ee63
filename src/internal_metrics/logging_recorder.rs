//! A metrics recorder that periodically logs all captured metrics.

use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use metrics_util::registry::{AtomicStorage, Registry};
use metrics_util::AtomicBucket;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A metrics recorder that periodically logs all captured metrics via `tracing`.
///
/// Counters are cumulative. Histograms are summarized (count and mean) and
/// emptied after each log line, so each line covers one interval.
pub struct LoggingRecorder {
    registry: Arc<Registry<Key, AtomicStorage>>,
}

impl LoggingRecorder {
    /// Creates a new `LoggingRecorder` and starts a background task to log metrics.
    ///
    /// # Arguments
    /// * `aggregation_interval` - The interval at which to log the metrics.
    /// * `shutdown_rx` - Stops the logging task when it changes or closes.
    pub fn new(
        aggregation_interval: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> (Self, JoinHandle<()>) {
        let registry = Arc::new(Registry::new(AtomicStorage));
        let recorder = Self {
            registry: registry.clone(),
        };

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(aggregation_interval);
            // The first tick completes immediately; nothing has been recorded yet.
            ticker.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        log_snapshot(&registry);
                        tracing::debug!("Metrics logging task received shutdown signal.");
                        break;
                    }
                    _ = ticker.tick() => log_snapshot(&registry),
                }
            }
        });

        (recorder, handle)
    }
}

fn log_snapshot(registry: &Registry<Key, AtomicStorage>) {
    let mut counters: Vec<_> = registry
        .get_counter_handles()
        .into_iter()
        .map(|(key, counter)| (key.to_string(), counter.load(Ordering::Relaxed)))
        .collect();
    counters.sort();
    for (key, value) in counters {
        tracing::info!("[Counter] {}: {}", key, value);
    }

    for (key, gauge) in registry.get_gauge_handles() {
        let value = f64::from_bits(gauge.load(Ordering::Relaxed));
        tracing::info!("[Gauge] {}: {}", key, value);
    }

    for (key, bucket) in registry.get_histogram_handles() {
        if let Some((count, mean)) = drain_summary(&bucket) {
            tracing::info!("[Histogram] {}: count={} mean={:.4}", key, count, mean);
        }
    }
}

/// Empties the bucket and returns the count and mean of what it held.
fn drain_summary(bucket: &AtomicBucket<f64>) -> Option<(usize, f64)> {
    let mut count = 0usize;
    let mut sum = 0.0;
    bucket.clear_with(|samples| {
        count += samples.len();
        sum += samples.iter().sum::<f64>();
    });
    (count > 0).then(|| (count, sum / count as f64))
}

impl Recorder for LoggingRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        self.registry.get_or_create_counter(key, |c| c.clone()).into()
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        self.registry.get_or_create_gauge(key, |g| g.clone()).into()
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        self.registry.get_or_create_histogram(key, |h| h.clone()).into()
    }
}
