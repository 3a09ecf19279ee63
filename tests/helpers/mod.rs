#![allow(dead_code)]
pub mod fake_sources;
pub mod mock_transport;

use simplemon_agent::config::{Config, TransportKind};
use simplemon_agent::core::{MetricsSnapshot, Volume, VolumeUsage};

/// A configuration suitable for tests: stdout transport, one-second cadence.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.transport.kind = TransportKind::Stdout;
    config
}

/// A plausible snapshot of a four-core host.
pub fn sample_snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        disk_usage: 42.5,
        cpu_usage: 12.0,
        cpu_core_usage: vec![10.0, 14.0, 8.0, 16.0],
        memory_usage: 63.25,
    }
}

/// A root ext4 volume and a tmpfs, both readable.
pub fn sample_volumes() -> Vec<(Volume, Option<VolumeUsage>)> {
    vec![
        (
            Volume {
                mount_point: "/".to_string(),
                fstype: "ext4".to_string(),
            },
            Some(VolumeUsage {
                total: 1000,
                free: 250,
                used: 750,
            }),
        ),
        (
            Volume {
                mount_point: "/run".to_string(),
                fstype: "tmpfs".to_string(),
            },
            Some(VolumeUsage {
                total: 100,
                free: 90,
                used: 10,
            }),
        ),
    ]
}
