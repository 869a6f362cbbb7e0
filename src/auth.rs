//! Bearer-token authentication gate.
//!
//! Every route except `/health` and `/version` sits behind [`require_bearer`].
//! The configured secret is stored only as a SHA-256 digest, and a presented
//! token is compared digest-to-digest with a branch-free fold. Comparison time
//! does not depend on how many leading bytes of a wrong token match, and does
//! not depend on the secret's length either.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::{AgentError, ApiError, Result};

type TokenDigest = [u8; 32];

/// The process-wide bearer secret. Immutable once built; never printed.
#[derive(Clone)]
pub struct Credential {
    digest: TokenDigest,
}

impl Credential {
    /// Build a credential from the configured secret.
    ///
    /// Empty secrets are rejected, and so are secrets containing whitespace,
    /// since [`bearer_token`] splits on whitespace and could never present one.
    pub fn new(secret: impl AsRef<str>) -> Result<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(AgentError::config_error("API token must not be empty"));
        }
        if secret.chars().any(char::is_whitespace) {
            return Err(AgentError::config_error(
                "API token must not contain whitespace",
            ));
        }
        Ok(Self {
            digest: digest(secret),
        })
    }

    /// Constant-time check of a presented token against the secret.
    pub fn matches(&self, presented: &str) -> bool {
        constant_time_eq(&self.digest, &digest(presented))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

fn digest(value: &str) -> TokenDigest {
    Sha256::digest(value.as_bytes()).into()
}

fn constant_time_eq(a: &TokenDigest, b: &TokenDigest) -> bool {
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    std::hint::black_box(diff) == 0
}

/// Result of checking a request's credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Allow,
    Reject,
}

/// Extract the token from a single `Authorization: Bearer <token>` header.
///
/// The scheme keyword is case-insensitive and any run of whitespace may
/// separate it from the token. Anything other than exactly scheme plus one
/// token yields `None`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let mut values = headers.get_all(AUTHORIZATION).iter();
    let value = values.next()?;
    if values.next().is_some() {
        return None;
    }

    let mut parts = value.to_str().ok()?.split_whitespace();
    let scheme = parts.next()?;
    let token = parts.next()?;
    if parts.next().is_some() || !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token)
}

/// Decide whether a request carrying `headers` may proceed.
pub fn authenticate(headers: &HeaderMap, credential: &Credential) -> AuthOutcome {
    match bearer_token(headers) {
        Some(token) if credential.matches(token) => AuthOutcome::Allow,
        _ => AuthOutcome::Reject,
    }
}

/// Axum middleware that aborts with 403 unless the bearer token matches.
pub async fn require_bearer(
    State(credential): State<Arc<Credential>>,
    request: Request,
    next: Next,
) -> std::result::Result<Response, ApiError> {
    match authenticate(request.headers(), &credential) {
        AuthOutcome::Allow => Ok(next.run(request).await),
        AuthOutcome::Reject => {
            debug!(path = %request.uri().path(), "rejected request without valid credentials");
            Err(ApiError::Forbidden)
        }
    }
}
