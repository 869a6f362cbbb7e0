//! Telemetry getters.
//!
//! This module provides the fixed catalog of read-only commands the agent may
//! run (disk, OS, network, hardware, GPIO header, journal) and the collector
//! that turns their output into JSON-ready values.

pub mod catalog;
pub mod collector;
pub mod data;

// Re-export commonly used items
pub use catalog::{Domain, Metric};
pub use collector::MetricsCollector;
pub use data::{GuardianData, MetricValues};
