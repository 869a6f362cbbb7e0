//! Unauthenticated liveness and version endpoints.

use axum::response::Json;
use serde_json::{json, Value};

/// Liveness check.
pub async fn health() -> &'static str {
    "ok"
}

pub async fn version() -> Json<Value> {
    Json(json!({ "version": env!("CARGO_PKG_VERSION") }))
}
