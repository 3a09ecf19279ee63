//! SimpleMon Agent - a lightweight host metrics agent
//!
//! This library samples CPU, memory and disk utilization, packs it into a
//! JSON report and delivers it to a collector over HTTP or WebSocket.

pub mod agent;
pub mod cli;
pub mod config;
pub mod core;
pub mod disks;
pub mod errors;
pub mod internal_metrics;
pub mod report;
pub mod retry;
pub mod sampler;
pub mod transport;

// Re-export core types for convenience
pub use core::*;
