//! Existence checks for paths inside the confined files root.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde_json::{json, Value};
use tracing::debug;

use super::AppState;
use crate::error::ApiError;
use crate::validate::PathError;

#[derive(Debug, Clone, Copy)]
enum Kind {
    Directory,
    File,
}

/// `GET /files/directory/<path>`
pub async fn directory_exists(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<Value>, ApiError> {
    check(&state, &path, Kind::Directory).await
}

/// `GET /files/file/<path>`
pub async fn file_exists(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<Value>, ApiError> {
    check(&state, &path, Kind::File).await
}

async fn check(state: &AppState, input: &str, kind: Kind) -> Result<Json<Value>, ApiError> {
    let resolved = state.confinement.resolve(input).map_err(|e| match e {
        PathError::OutsideRoot => ApiError::Denied(json!({
            "error": "path is outside the allowed root",
        })),
        other => ApiError::bad_request(other.to_string()),
    })?;

    let exists = match tokio::fs::metadata(&resolved).await {
        Ok(meta) => match kind {
            Kind::Directory => meta.is_dir(),
            Kind::File => meta.is_file(),
        },
        Err(e) => {
            debug!(path = %resolved.display(), "metadata lookup failed: {}", e);
            false
        }
    };
    Ok(Json(json!({ "exists": exists })))
}
