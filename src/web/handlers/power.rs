//! Host reboot.

use axum::{extract::State, response::Json};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::AppState;
use crate::error::ApiError;

/// Reboot commands, tried in order until one succeeds.
pub const REBOOT_COMMANDS: &[&[&str]] = &[
    &["sudo", "shutdown", "-r", "now"],
    &["sudo", "reboot"],
    &["sudo", "init", "6"],
    &["sudo", "systemctl", "--force", "--force", "reboot"],
];

pub async fn reboot(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    for argv in REBOOT_COMMANDS {
        let command = argv.join(" ");
        let result = state
            .executor
            .execute(argv, state.config.command_timeout)
            .await;
        if result.is_success() {
            info!(%command, "reboot requested");
            tokio::time::sleep(state.config.reboot_grace).await;
            return Ok(Json(json!({ "status": "rebooting", "command": command })));
        }
        warn!(%command, ?result, "reboot command failed, trying next");
    }

    error!("all reboot methods failed");
    Err(ApiError::internal("all reboot methods failed"))
}
