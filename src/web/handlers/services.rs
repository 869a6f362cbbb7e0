//! systemd service inspection and control for the allow-listed units.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use super::AppState;
use crate::error::ApiError;
use crate::exec::CommandResult;
use crate::validate::{authorized_services, is_authorized_service};

/// What a caller may do to a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Status,
    Restart,
    Start,
    Stop,
    Enable,
    Disable,
}

impl ServiceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Restart => "restart",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Enable => "enable",
            Self::Disable => "disable",
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status" => Ok(Self::Status),
            "restart" => Ok(Self::Restart),
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "enable" => Ok(Self::Enable),
            "disable" => Ok(Self::Disable),
            other => Err(format!("unknown service action '{}'", other)),
        }
    }
}

pub async fn authorized() -> Json<Value> {
    Json(json!({ "services": authorized_services() }))
}

/// `GET /services/<name>`
pub async fn status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    service_status(&state, &name).await
}

/// `GET /services/<name>/<action>`; only `status` is a read.
pub async fn query(
    State(state): State<AppState>,
    Path((name, action)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    match action.parse::<ServiceAction>().map_err(ApiError::bad_request)? {
        ServiceAction::Status => service_status(&state, &name).await,
        other => Err(ApiError::bad_request(format!(
            "'{}' changes the service and must be sent as POST",
            other
        ))),
    }
}

/// `POST /services/<name>/<action>`
pub async fn control(
    State(state): State<AppState>,
    Path((name, action)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let action = action.parse::<ServiceAction>().map_err(ApiError::bad_request)?;
    if action == ServiceAction::Status {
        return service_status(&state, &name).await;
    }
    ensure_authorized(&name)?;
    ensure_unit_exists(&state, &name).await?;

    let result = state
        .executor
        .execute(
            &["sudo", "systemctl", action.as_str(), name.as_str()],
            state.config.command_timeout,
        )
        .await;
    info!(service = %name, %action, success = result.is_success(), "service action executed");

    let outcome = match result {
        CommandResult::Success(output) if output.is_empty() => "ok".to_string(),
        other => other.output().to_string(),
    };
    Ok(Json(json!({
        "service": name,
        "action": action.as_str(),
        "result": outcome,
    })))
}

async fn service_status(state: &AppState, name: &str) -> Result<Json<Value>, ApiError> {
    ensure_authorized(name)?;
    // `is-active` exits non-zero for inactive units; `show` reports the state either way.
    let result = state
        .executor
        .execute(
            &["systemctl", "show", "-p", "ActiveState", "--value", name],
            state.config.command_timeout,
        )
        .await;
    Ok(Json(json!({
        "service": name,
        "action": ServiceAction::Status.as_str(),
        "result": result.output(),
    })))
}

fn ensure_authorized(name: &str) -> Result<(), ApiError> {
    if is_authorized_service(name) {
        Ok(())
    } else {
        Err(ApiError::NotFound(json!({
            "service": name,
            "error": format!("service '{}' is not authorized", name),
        })))
    }
}

async fn ensure_unit_exists(state: &AppState, name: &str) -> Result<(), ApiError> {
    let unit = format!("{}.service", name);
    let listing = state
        .executor
        .execute(
            &["systemctl", "list-unit-files", unit.as_str(), "--no-legend"],
            state.config.command_timeout,
        )
        .await;
    let found = listing.success_output().is_some_and(|out| {
        out.lines()
            .any(|line| line.split_whitespace().next() == Some(unit.as_str()))
    });
    if found {
        Ok(())
    } else {
        Err(ApiError::NotFound(json!({
            "service": name,
            "error": format!("service '{}' not found", name),
        })))
    }
}
