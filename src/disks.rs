//! Disk enumeration and Physical/Virtual classification
//!
//! Volumes are listed through a [`VolumeSource`], filtered for pseudo
//! filesystems, and turned into [`DiskMetric`]s. A volume whose usage query
//! fails is skipped; only a failed enumeration aborts the batch.

use crate::core::{DiskKind, DiskMetric, Volume, VolumeSource, VolumeUsage};
use crate::errors::SamplingError;
use sysinfo::Disks;
use tracing::debug;

/// Filesystem types labelled [`DiskKind::Physical`].
pub const PHYSICAL_FILESYSTEMS: &[&str] =
    &["ext4", "ext3", "ntfs", "fat32", "xfs", "apfs", "btrfs", "zfs"];

/// Kernel pseudo filesystems that never hold user data.
pub const PSEUDO_FILESYSTEMS: &[&str] = &[
    "proc",
    "sysfs",
    "tmpfs",
    "devtmpfs",
    "devpts",
    "ramfs",
    "cgroup",
    "cgroup2",
    "securityfs",
    "debugfs",
    "tracefs",
    "pstore",
    "bpf",
    "mqueue",
    "hugetlbfs",
    "configfs",
    "fusectl",
    "autofs",
    "binfmt_misc",
    "nsfs",
    "efivarfs",
];

/// Classifies a volume by its filesystem type.
///
/// Exact, case-sensitive match against [`PHYSICAL_FILESYSTEMS`]; everything
/// else, including the empty string, is `Virtual`. This is a heuristic and
/// must not be used as a security boundary.
pub fn classify(fstype: &str) -> DiskKind {
    if PHYSICAL_FILESYSTEMS.contains(&fstype) {
        DiskKind::Physical
    } else {
        DiskKind::Virtual
    }
}

pub fn is_pseudo(fstype: &str) -> bool {
    PSEUDO_FILESYSTEMS.contains(&fstype)
}

/// Builds one [`DiskMetric`] per readable volume, in enumeration order.
///
/// # Errors
/// Only when the volume list itself cannot be obtained.
pub fn collect_disk_metrics(
    source: &mut dyn VolumeSource,
    include_pseudo: bool,
) -> Result<Vec<DiskMetric>, SamplingError> {
    let volumes = source.volumes()?;
    let mut disk_metrics = Vec::with_capacity(volumes.len());

    for volume in volumes {
        if !include_pseudo && is_pseudo(&volume.fstype) {
            continue;
        }
        let usage = match source.usage(&volume) {
            Ok(usage) => usage,
            Err(e) => {
                debug!(mount = %volume.mount_point, error = %e, "Skipping volume with unreadable usage");
                metrics::counter!("disk_query_skipped_total").increment(1);
                continue;
            }
        };
        disk_metrics.push(DiskMetric {
            kind: classify(&volume.fstype),
            used_percent: usage.used_percent(),
            total: usage.total,
            free: usage.free,
            used: usage.used,
            path: volume.mount_point,
            fstype: volume.fstype,
        });
    }

    Ok(disk_metrics)
}

/// [`VolumeSource`] backed by `sysinfo`.
///
/// Enumeration refreshes the mount list; usage is read from that refresh.
/// A volume that has vanished since enumeration, or reports zero capacity,
/// is an unreadable usage query.
pub struct SysinfoVolumes {
    disks: Disks,
}

impl SysinfoVolumes {
    pub fn new() -> Self {
        Self {
            disks: Disks::new(),
        }
    }
}

impl Default for SysinfoVolumes {
    fn default() -> Self {
        Self::new()
    }
}

impl VolumeSource for SysinfoVolumes {
    fn volumes(&mut self) -> Result<Vec<Volume>, SamplingError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(SamplingError::Unsupported);
        }
        self.disks.refresh_list();
        Ok(self
            .disks
            .list()
            .iter()
            .map(|disk| Volume {
                mount_point: disk.mount_point().to_string_lossy().into_owned(),
                fstype: disk.file_system().to_string_lossy().into_owned(),
            })
            .collect())
    }

    fn usage(&mut self, volume: &Volume) -> Result<VolumeUsage, SamplingError> {
        let disk = self
            .disks
            .list()
            .iter()
            .find(|disk| disk.mount_point().to_string_lossy() == volume.mount_point.as_str())
            .ok_or_else(|| SamplingError::VolumeMissing(volume.mount_point.clone()))?;

        let total = disk.total_space();
        if total == 0 {
            return Err(SamplingError::VolumeUnreadable(volume.mount_point.clone()));
        }
        let free = disk.available_space().min(total);
        Ok(VolumeUsage {
            total,
            free,
            used: total - free,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// A volume source with scripted usage results.
    struct FakeVolumes {
        volumes: Vec<Volume>,
        usage: HashMap<String, Result<VolumeUsage, ()>>,
        fail_enumeration: bool,
    }

    impl FakeVolumes {
        fn new() -> Self {
            Self {
                volumes: Vec::new(),
                usage: HashMap::new(),
                fail_enumeration: false,
            }
        }

        fn with(mut self, mount: &str, fstype: &str, usage: Result<VolumeUsage, ()>) -> Self {
            self.volumes.push(Volume {
                mount_point: mount.to_string(),
                fstype: fstype.to_string(),
            });
            self.usage.insert(mount.to_string(), usage);
            self
        }
    }

    impl VolumeSource for FakeVolumes {
        fn volumes(&mut self) -> Result<Vec<Volume>, SamplingError> {
            if self.fail_enumeration {
                return Err(SamplingError::Enumeration("mount table unreadable".into()));
            }
            Ok(self.volumes.clone())
        }

        fn usage(&mut self, volume: &Volume) -> Result<VolumeUsage, SamplingError> {
            match self.usage.get(&volume.mount_point) {
                Some(Ok(usage)) => Ok(*usage),
                _ => Err(SamplingError::VolumeUnreadable(volume.mount_point.clone())),
            }
        }
    }

    fn usage(total: u64, free: u64, used: u64) -> Result<VolumeUsage, ()> {
        Ok(VolumeUsage { total, free, used })
    }

    #[test]
    fn test_classify_allowlist() {
        for fstype in PHYSICAL_FILESYSTEMS {
            assert_eq!(classify(fstype), DiskKind::Physical, "{}", fstype);
        }
        for fstype in ["overlay", "nfs", "vfat", "EXT4", "ext4 ", "", "squashfs", "fuse.sshfs"] {
            assert_eq!(classify(fstype), DiskKind::Virtual, "{:?}", fstype);
        }
    }

    #[test]
    fn test_used_percent_scenario() {
        let mut source = FakeVolumes::new()
            .with("/data", "xfs", usage(1000, 250, 750))
            .with("/mnt/share", "nfs", usage(1000, 250, 750));

        let metrics = collect_disk_metrics(&mut source, false).unwrap();

        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].used_percent, 75.0);
        assert_eq!(metrics[0].kind, DiskKind::Physical);
        assert_eq!(metrics[0].fstype, "xfs");
        assert_eq!(metrics[1].used_percent, 75.0);
        assert_eq!(metrics[1].kind, DiskKind::Virtual);
    }

    #[test]
    fn test_failed_usage_query_is_skipped() {
        let mut source = FakeVolumes::new()
            .with("/", "ext4", usage(4000, 1000, 3000))
            .with("/media/gone", "ext4", Err(()))
            .with("/boot", "ext3", usage(500, 400, 100));

        let metrics = collect_disk_metrics(&mut source, false).unwrap();

        let paths: Vec<_> = metrics.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, vec!["/", "/boot"]);
    }

    #[test]
    fn test_enumeration_failure_is_fatal() {
        let mut source = FakeVolumes::new();
        source.fail_enumeration = true;
        assert!(collect_disk_metrics(&mut source, false).is_err());
    }

    #[test]
    fn test_pseudo_filesystems_filtered_unless_requested() {
        let mut source = FakeVolumes::new()
            .with("/proc", "proc", usage(10, 0, 10))
            .with("/run", "tmpfs", usage(100, 90, 10))
            .with("/", "btrfs", usage(100, 50, 50));

        let filtered = collect_disk_metrics(&mut source, false).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].path, "/");

        let all = collect_disk_metrics(&mut source, true).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().filter(|m| m.path != "/").all(|m| m.kind == DiskKind::Virtual));
    }

    #[test]
    fn test_enumeration_order_preserved() {
        let mut source = FakeVolumes::new()
            .with("/z", "ext4", usage(1, 0, 1))
            .with("/a", "ext4", usage(1, 0, 1))
            .with("/m", "ext4", usage(1, 0, 1));

        let metrics = collect_disk_metrics(&mut source, false).unwrap();
        let paths: Vec<_> = metrics.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, vec!["/z", "/a", "/m"]);
    }

    #[test]
    fn test_sysinfo_volumes_report_consistent_percentages() {
        let mut source = SysinfoVolumes::new();
        let Ok(metrics) = collect_disk_metrics(&mut source, true) else {
            return;
        };
        for metric in metrics {
            assert!(metric.used <= metric.total);
            let expected = metric.used as f64 / metric.total as f64 * 100.0;
            assert!((metric.used_percent - expected).abs() < 1e-9, "{:?}", metric);
        }
    }
}
