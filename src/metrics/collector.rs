//! Runs metric commands through the executor and applies their parsers.

use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::exec::{CommandExecutor, CommandResult, FAILURE_SENTINEL};
use crate::metrics::{
    catalog::{self, Domain, Metric},
    data::{GuardianData, MetricValues},
};

/// Collects telemetry by running the commands of the metric catalog.
#[derive(Clone)]
pub struct MetricsCollector {
    executor: Arc<dyn CommandExecutor>,
    timeout: Duration,
}

impl MetricsCollector {
    pub fn new(executor: Arc<dyn CommandExecutor>, timeout: Duration) -> Self {
        Self { executor, timeout }
    }

    /// Evaluate `metrics`, running each distinct command once and all of them concurrently.
    pub async fn collect(&self, metrics: &[Metric]) -> MetricValues {
        let mut commands: Vec<&'static [&'static str]> = Vec::new();
        for metric in metrics {
            if !commands.contains(&metric.argv) {
                commands.push(metric.argv);
            }
        }

        let results = join_all(
            commands
                .iter()
                .map(|argv| self.executor.execute(argv, self.timeout)),
        )
        .await;
        let outputs: HashMap<&[&str], CommandResult> =
            commands.into_iter().zip(results).collect();

        metrics
            .iter()
            .map(|metric| (metric.name, evaluate(metric, outputs.get(metric.argv))))
            .collect()
    }

    /// Value of a single metric.
    pub async fn metric(&self, metric: &Metric) -> String {
        let result = self.executor.execute(metric.argv, self.timeout).await;
        evaluate(metric, Some(&result))
    }

    /// Every metric of `domain`.
    pub async fn domain(&self, domain: &Domain) -> MetricValues {
        self.collect(domain.metrics).await
    }

    pub async fn guardian_data(&self) -> GuardianData {
        GuardianData::from_values(self.collect(catalog::GUARDIAN_DATA).await)
    }
}

fn evaluate(metric: &Metric, result: Option<&CommandResult>) -> String {
    let parsed = result
        .and_then(CommandResult::success_output)
        .and_then(metric.extract);
    match parsed {
        Some(value) => value,
        None => {
            debug!(metric = metric.name, "metric unavailable");
            FAILURE_SENTINEL.to_string()
        }
    }
}
