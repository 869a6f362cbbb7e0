//! `POST /gpiocontrol/<action>`: run one GPIO controller session.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::AppState;
use crate::error::ApiError;
use crate::gpio::{run_session, GpioAction, GpioError, PinSet};

#[derive(Debug, Deserialize)]
pub struct PinsBody {
    pub pins: Vec<u32>,
}

pub async fn control(
    State(state): State<AppState>,
    Path(action): Path<String>,
    body: Result<Json<PinsBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let action: GpioAction = action.parse().map_err(ApiError::bad_request)?;
    let Json(body) =
        body.map_err(|e| ApiError::bad_request(format!("invalid request body: {}", e.body_text())))?;
    let pins = PinSet::new(body.pins).map_err(|e| ApiError::bad_request(e.to_string()))?;
    if action == GpioAction::Test && pins.single().is_none() {
        return Err(ApiError::bad_request(
            GpioError::TestRequiresSinglePin(pins.len()).to_string(),
        ));
    }

    // The session sleeps between pin writes; keep it off the async workers.
    let config = state.config.gpio.clone();
    let backend = Arc::clone(&state.gpio_backend);
    let session_pins = pins.clone();
    let outcome =
        tokio::task::spawn_blocking(move || run_session(&config, backend.as_ref(), session_pins, action))
            .await
            .map_err(|e| ApiError::internal(format!("GPIO session aborted: {}", e)))?;

    match outcome {
        Ok(true) => Ok(Json(json!({
            "status": "ok",
            "action": action,
            "pins": pins,
        }))),
        Ok(false) => Err(ApiError::Internal(json!({
            "error": "GPIO operation failed",
            "action": action,
            "pins": pins,
        }))),
        Err(e @ GpioError::Busy { .. }) => Err(ApiError::Locked(json!({
            "error": e.to_string(),
            "action": action,
            "pins": pins,
        }))),
        Err(e) if e.is_invalid_request() => Err(ApiError::bad_request(e.to_string())),
        Err(e) => Err(ApiError::Internal(json!({
            "error": e.to_string(),
            "action": action,
            "pins": pins,
        }))),
    }
}
