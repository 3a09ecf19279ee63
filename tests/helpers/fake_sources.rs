#![allow(dead_code)]
//! Scripted metrics and volume sources for driving the agent without an OS.
use async_trait::async_trait;
use simplemon_agent::core::{MetricsSnapshot, MetricsSource, Volume, VolumeSource, VolumeUsage};
use simplemon_agent::errors::SamplingError;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// A metrics source that returns the same snapshot every time, or fails.
#[derive(Clone)]
pub struct FakeMetricsSource {
    snapshot: Option<MetricsSnapshot>,
    pub calls: Arc<AtomicUsize>,
}

impl FakeMetricsSource {
    pub fn new(snapshot: MetricsSnapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source whose every snapshot fails as if no CPUs were reported.
    pub fn failing() -> Self {
        Self {
            snapshot: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl MetricsSource for FakeMetricsSource {
    async fn snapshot(&mut self) -> Result<MetricsSnapshot, SamplingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.snapshot.clone().ok_or(SamplingError::NoCpus)
    }
}

/// A volume source with a fixed table. `None` usage makes the query fail.
pub struct FakeVolumeSource {
    volumes: Vec<(Volume, Option<VolumeUsage>)>,
    fail_enumeration: bool,
}

impl FakeVolumeSource {
    pub fn new(volumes: Vec<(Volume, Option<VolumeUsage>)>) -> Self {
        Self {
            volumes,
            fail_enumeration: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            volumes: Vec::new(),
            fail_enumeration: true,
        }
    }
}

impl VolumeSource for FakeVolumeSource {
    fn volumes(&mut self) -> Result<Vec<Volume>, SamplingError> {
        if self.fail_enumeration {
            return Err(SamplingError::Enumeration("mount table unreadable".to_string()));
        }
        Ok(self.volumes.iter().map(|(volume, _)| volume.clone()).collect())
    }

    fn usage(&mut self, volume: &Volume) -> Result<VolumeUsage, SamplingError> {
        self.volumes
            .iter()
            .find(|(v, _)| v == volume)
            .and_then(|(_, usage)| *usage)
            .ok_or_else(|| SamplingError::VolumeUnreadable(volume.mount_point.clone()))
    }
}
