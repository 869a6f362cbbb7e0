//! Read-only telemetry endpoints under `/<domain>/<metric>`.

use axum::{extract::State, response::Json};

use super::AppState;
use crate::error::ApiError;
use crate::metrics::{catalog, Domain, GuardianData, MetricValues};

/// One metric (`{"<name>": value}`) or a whole domain aggregate.
///
/// Routed once per catalog domain, so `domain` is fixed by the route.
pub async fn read_metric(
    state: AppState,
    domain: &'static Domain,
    name: String,
) -> Result<Json<MetricValues>, ApiError> {
    if domain.is_aggregate(&name) {
        return Ok(Json(state.collector.domain(domain).await));
    }

    let metric = catalog::lookup(domain, &name).ok_or_else(|| {
        ApiError::not_found(format!("unknown metric '{}/{}'", domain.name, name))
    })?;
    let mut values = MetricValues::new();
    values.insert(metric.name, state.collector.metric(metric).await);
    Ok(Json(values))
}

/// Everything Grid Guardian needs in one response.
pub async fn guardian_data(State(state): State<AppState>) -> Json<GuardianData> {
    Json(state.collector.guardian_data().await)
}
