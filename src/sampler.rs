//! # System Metrics Sampler
//!
//! This module defines the `SystemSampler`, the [`MetricsSource`] that reads
//! CPU, memory and root filesystem utilization through the `sysinfo` crate.
//!
//! CPU figures need two readings of the kernel counters separated by a
//! measurement window. The aggregate and per-core percentages are both
//! taken from the same window, so a snapshot suspends its caller for
//! roughly `cpu_window`. The wait is an async sleep and can be cancelled.

use crate::config::SamplingConfig;
use crate::core::{MetricsSnapshot, MetricsSource};
use crate::errors::SamplingError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sysinfo::{Disks, System};
use tracing::{debug, instrument};

/// A [`MetricsSource`] for the local host.
pub struct SystemSampler {
    system: System,
    disks: Disks,
    root_path: PathBuf,
    cpu_window: Duration,
}

impl SystemSampler {
    /// Creates a new `SystemSampler`.
    ///
    /// The CPU window is raised to `sysinfo::MINIMUM_CPU_UPDATE_INTERVAL`
    /// when shorter, since the counters are meaningless below it.
    pub fn new(root_path: impl Into<PathBuf>, cpu_window: Duration) -> Self {
        Self {
            system: System::new(),
            disks: Disks::new(),
            root_path: root_path.into(),
            cpu_window: cpu_window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL),
        }
    }

    pub fn from_config(config: &SamplingConfig) -> Self {
        Self::new(config.root_path.clone(), config.cpu_window())
    }

    pub fn cpu_window(&self) -> Duration {
        self.cpu_window
    }

    /// Used percentage of the filesystem holding `root_path`.
    fn root_usage(&mut self) -> Result<f64, SamplingError> {
        self.disks.refresh_list();
        let mounts = self
            .disks
            .list()
            .iter()
            .map(|disk| (disk.mount_point(), disk.total_space(), disk.available_space()));
        let (_, total, available) = covering_mount(mounts, &self.root_path)
            .ok_or_else(|| SamplingError::RootNotFound(self.root_path.clone()))?;

        if total == 0 {
            return Err(SamplingError::VolumeUnreadable(self.root_path.display().to_string()));
        }
        let used = total - available.min(total);
        Ok(clamp_percent(used as f64 / total as f64 * 100.0))
    }

    /// Measures aggregate and per-core CPU usage over one window.
    ///
    /// Returns the aggregate percentage and one entry per logical core in
    /// the OS's core order.
    pub async fn measure_cpu(&mut self) -> Result<(f64, Vec<f64>), SamplingError> {
        self.system.refresh_cpu();
        tokio::time::sleep(self.cpu_window).await;
        self.system.refresh_cpu();

        let cores: Vec<f64> = self
            .system
            .cpus()
            .iter()
            .map(|cpu| clamp_percent(cpu.cpu_usage() as f64))
            .collect();
        if cores.is_empty() {
            return Err(SamplingError::NoCpus);
        }
        let aggregate = clamp_percent(self.system.global_cpu_info().cpu_usage() as f64);
        Ok((aggregate, cores))
    }

    fn memory_usage(&mut self) -> Result<f64, SamplingError> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return Err(SamplingError::MemoryUnavailable);
        }
        let used = self.system.used_memory().min(total);
        Ok(clamp_percent(used as f64 / total as f64 * 100.0))
    }
}

#[async_trait]
impl MetricsSource for SystemSampler {
    #[instrument(skip_all)]
    async fn snapshot(&mut self) -> Result<MetricsSnapshot, SamplingError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(SamplingError::Unsupported);
        }

        let disk_usage = self.root_usage()?;
        let (cpu_usage, cpu_core_usage) = self.measure_cpu().await?;
        let memory_usage = self.memory_usage()?;

        debug!(disk_usage, cpu_usage, cores = cpu_core_usage.len(), memory_usage, "Snapshot taken");
        Ok(MetricsSnapshot {
            disk_usage,
            cpu_usage,
            cpu_core_usage,
            memory_usage,
        })
    }
}

/// Picks the mount with the longest mount point that contains `target`.
fn covering_mount<'a, I>(mounts: I, target: &Path) -> Option<(&'a Path, u64, u64)>
where
    I: IntoIterator<Item = (&'a Path, u64, u64)>,
{
    mounts
        .into_iter()
        .filter(|(mount, _, _)| target.starts_with(mount))
        .max_by_key(|(mount, _, _)| mount.components().count())
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        return value;
    }
    value.clamp(0.0, 100.0)
}
