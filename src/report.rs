//! Wire encoding of [`CombinedReport`]s.
//!
//! `serde_json` writes NaN and infinities as `null`, which would silently
//! corrupt the collector's view. Every float is checked first so a report is
//! either encoded in full or rejected.

use crate::core::CombinedReport;
use crate::errors::EncodeError;

/// Encodes a report as a single-line JSON document.
pub fn encode(report: &CombinedReport) -> Result<String, EncodeError> {
    ensure_finite(report)?;
    Ok(serde_json::to_string(report)?)
}

fn ensure_finite(report: &CombinedReport) -> Result<(), EncodeError> {
    let system = &report.system;
    check("system.disk_usage", system.disk_usage)?;
    check("system.cpu_usage", system.cpu_usage)?;
    check("system.memory_usage", system.memory_usage)?;
    for (i, value) in system.cpu_core_usage.iter().enumerate() {
        check(&format!("system.cpu_core_usage[{}]", i), *value)?;
    }
    for (i, disk) in report.disks.iter().enumerate() {
        check(&format!("disks[{}].used_percent", i), disk.used_percent)?;
    }
    Ok(())
}

fn check(field: &str, value: f64) -> Result<(), EncodeError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EncodeError::NonFinite {
            field: field.to_string(),
        })
    }
}
