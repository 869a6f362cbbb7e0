//! Response payloads of the telemetry getters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::exec::FAILURE_SENTINEL;

/// Metric values keyed by name, serialized as a flat JSON object.
pub type MetricValues = BTreeMap<&'static str, String>;

/// Aggregate polled by Grid Guardian through `/guardian/data`.
///
/// Every field holds either the parsed value or the failure marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardianData {
    pub os: String,
    pub kernel: String,
    pub model: String,
    pub uptime: String,

    pub total_memory: String,
    pub used_memory: String,
    pub free_memory: String,

    pub cpu_usage: String,
    pub temp: String,
    pub ram: String,
    pub cpu_cores: String,
    pub cpu_freq: String,

    pub python2_version: String,
    pub python3_version: String,
}

impl GuardianData {
    pub fn from_values(mut values: MetricValues) -> Self {
        let mut take = |key: &str| {
            values
                .remove(key)
                .unwrap_or_else(|| FAILURE_SENTINEL.to_string())
        };
        Self {
            os: take("os"),
            kernel: take("kernel"),
            model: take("model"),
            uptime: take("uptime"),
            total_memory: take("total_memory"),
            used_memory: take("used_memory"),
            free_memory: take("free_memory"),
            cpu_usage: take("cpu_usage"),
            temp: take("temp"),
            ram: take("ram"),
            cpu_cores: take("cpu_cores"),
            cpu_freq: take("cpu_freq"),
            python2_version: take("python2_version"),
            python3_version: take("python3_version"),
        }
    }
}
