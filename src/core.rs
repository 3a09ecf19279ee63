//! Core domain types and service traits for the agent
//!
//! This module defines the snapshot data structures that travel over the wire
//! and the trait contracts that separate the sampling loop from the operating
//! system and from the collector.

use crate::errors::{DeliveryError, SamplingError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Point-in-time system utilization figures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MetricsSnapshot {
    /// Used percentage of the root filesystem
    pub disk_usage: f64,
    /// Aggregate CPU utilization over the measurement window
    pub cpu_usage: f64,
    /// Per-core CPU utilization, indexed by core id
    pub cpu_core_usage: Vec<f64>,
    /// Used percentage of virtual memory
    pub memory_usage: f64,
}

/// Heuristic label for a storage volume.
///
/// Derived from the filesystem type alone; see [`crate::disks::classify`].
/// It is not an authoritative hardware determination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DiskKind {
    Physical,
    Virtual,
}

/// Usage figures for one mounted volume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiskMetric {
    /// Mount point
    pub path: String,
    #[serde(rename = "type")]
    pub kind: DiskKind,
    /// Filesystem type as reported by the OS
    pub fstype: String,
    pub total: u64,
    pub free: u64,
    pub used: u64,
    pub used_percent: f64,
}

/// The document delivered to the collector once per cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CombinedReport {
    pub system: MetricsSnapshot,
    pub disks: Vec<DiskMetric>,
}

/// A mounted volume as returned by enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub mount_point: String,
    pub fstype: String,
}

/// Raw byte counts for a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeUsage {
    pub total: u64,
    pub free: u64,
    pub used: u64,
}

impl VolumeUsage {
    /// Used bytes as a percentage of total; zero for an empty volume.
    pub fn used_percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.used as f64 / self.total as f64 * 100.0
    }
}

// =============================================================================
// Service Traits
// =============================================================================

/// Produces system-wide utilization snapshots
#[async_trait]
pub trait MetricsSource: Send {
    /// Takes one snapshot.
    ///
    /// This suspends the caller for the CPU measurement window.
    ///
    /// # Returns
    /// * `Ok(MetricsSnapshot)` with every field populated
    /// * `Err` if any OS query failed; the snapshot is never partial
    async fn snapshot(&mut self) -> Result<MetricsSnapshot, SamplingError>;
}

/// Enumerates mounted volumes and queries their usage
pub trait VolumeSource: Send {
    /// Lists mounted volumes in OS enumeration order.
    fn volumes(&mut self) -> Result<Vec<Volume>, SamplingError>;

    /// Reads usage statistics for one volume returned by [`Self::volumes`].
    fn usage(&mut self, volume: &Volume) -> Result<VolumeUsage, SamplingError>;
}

/// Delivers serialized reports to the collector service
#[async_trait]
pub trait Transport: Send {
    /// A short, descriptive name (e.g. "http", "websocket").
    /// Used for logging and metric labels.
    fn name(&self) -> &str;

    /// Sends one document.
    ///
    /// A failed document is dropped; implementations never queue it.
    async fn deliver(&mut self, document: &str) -> Result<(), DeliveryError>;

    /// Releases any open connection. Called once on shutdown.
    async fn close(&mut self) {}
}
