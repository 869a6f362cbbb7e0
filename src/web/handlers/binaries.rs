//! Binary lookup and package installation.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde_json::{json, Value};
use tracing::{error, info};

use super::AppState;
use crate::error::ApiError;
use crate::exec::CommandResult;
use crate::validate::validate_identifier;

/// Lines of installer output returned to the caller.
const INSTALL_OUTPUT_LINES: usize = 10;

/// `GET /binaries/version/<name>`
pub async fn version(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    validate_identifier("binary", &name)?;

    let resolved = which(&state, &name).await.ok_or_else(|| {
        ApiError::NotFound(json!({
            "binary": name,
            "error": "binary is not installed or not in PATH",
        }))
    })?;

    let result = state
        .executor
        .execute(&[resolved.as_str(), "--version"], state.config.command_timeout)
        .await;
    let version = match result.success_output() {
        Some(output) => output.lines().next().unwrap_or_default().to_string(),
        None => result.output().to_string(),
    };
    Ok(Json(json!({ "binary": name, "version": version })))
}

/// `GET /binaries/exists/<name>`
pub async fn exists(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    validate_identifier("binary", &name)?;
    let exists = which(&state, &name).await.is_some();
    Ok(Json(json!({ "binary": name, "exists": exists })))
}

/// `POST /binaries/install/<name>`
pub async fn install(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    validate_identifier("package", &name)?;
    let timeout = state.config.command_timeout;

    let status = state
        .executor
        .execute(&["dpkg", "-s", name.as_str()], timeout)
        .await;
    if status.success_output().is_some_and(is_installed) {
        return Ok(Json(json!({ "package": name, "status": "already installed" })));
    }

    let update = state
        .executor
        .execute(&["sudo", "apt-get", "update"], state.config.install_timeout)
        .await;
    if !update.is_success() {
        error!(package = %name, ?update, "package index update failed");
        return Err(install_failed(&name, "package index update failed"));
    }

    info!(package = %name, "installing package");
    let install = state
        .executor
        .execute(
            &["sudo", "apt-get", "install", "-y", name.as_str()],
            state.config.install_timeout,
        )
        .await;
    match install {
        CommandResult::Success(output) => {
            let lines: Vec<&str> = output.lines().collect();
            let tail = &lines[lines.len().saturating_sub(INSTALL_OUTPUT_LINES)..];
            Ok(Json(json!({
                "package": name,
                "status": "installed",
                "output": tail,
            })))
        }
        CommandResult::Failure(reason) => {
            error!(package = %name, ?reason, "package installation failed");
            Err(install_failed(&name, "installation failed"))
        }
    }
}

/// Absolute path of `name` on `PATH`, if any.
async fn which(state: &AppState, name: &str) -> Option<String> {
    let result = state
        .executor
        .execute(&["which", name], state.config.command_timeout)
        .await;
    result
        .success_output()
        .and_then(|out| out.lines().next())
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(str::to_string)
}

fn is_installed(dpkg_status: &str) -> bool {
    dpkg_status
        .lines()
        .any(|line| line.starts_with("Status:") && line.ends_with(" installed"))
}

fn install_failed(name: &str, reason: &str) -> ApiError {
    ApiError::Internal(json!({ "package": name, "error": reason }))
}
