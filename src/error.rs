//! Error handling for the Guardian Raspberry Pi agent.
//!
//! Two layers live here: [`AgentError`] is what library code returns, and
//! [`ApiError`] is what HTTP handlers return. The latter owns the mapping from
//! failure categories to status codes so every handler reports them the same way.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::gpio::GpioError;

/// A specialized `Result` type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// The main error type for agent operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),

    /// GPIO controller error
    #[error("GPIO error: {0}")]
    Gpio(#[from] GpioError),

    /// Caller-supplied input was rejected
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AgentError {
    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Create a new validation error
    pub fn validation_error(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Failure outcome of an HTTP handler.
#[derive(Debug)]
pub enum ApiError {
    /// Authentication failed. Carries no detail on purpose.
    Forbidden,
    /// The request is authenticated but targets something outside its reach.
    Denied(Value),
    /// Malformed or rejected input.
    BadRequest(String),
    /// Unknown service, unit, binary or metric.
    NotFound(Value),
    /// The GPIO hardware is held by another session.
    Locked(Value),
    /// The requested operation ran and failed.
    Internal(Value),
}

impl ApiError {
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest(reason.into())
    }

    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::NotFound(json!({ "error": reason.into() }))
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(json!({ "error": reason.into() }))
    }

    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Forbidden | Self::Denied(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Locked(_) => StatusCode::LOCKED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Forbidden => json!({ "error": "forbidden" }),
            Self::BadRequest(reason) => json!({ "error": reason }),
            Self::Denied(body) | Self::NotFound(body) | Self::Locked(body) | Self::Internal(body) => {
                body
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Validation(reason) => Self::BadRequest(reason),
            other => Self::internal(other.to_string()),
        }
    }
}
