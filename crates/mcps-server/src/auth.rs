use std::fmt;

use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use mcps_crypto::{decrypt, CipherKey};

use crate::config::AuthConfig;
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Paths reachable without an API key.
const PUBLIC_PATHS: &[&str] = &["/", "/health"];

/// Why a request was turned away. Logged, never returned to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    KeyMissing,
    DecryptFailed,
    KeyMismatch,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyMissing => write!(f, "api key missing"),
            Self::DecryptFailed => write!(f, "api key could not be decrypted"),
            Self::KeyMismatch => write!(f, "api key mismatch"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Accepted,
    Rejected(Rejection),
}

impl GateDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Validates the encrypted `x-api-key` header.
///
/// Clients send `encrypt(api_key, derive(secret))`; the gate decrypts it and
/// compares digests of the recovered and configured keys.
pub struct ApiKeyGate {
    key: CipherKey,
    expected: blake3::Hash,
}

impl ApiKeyGate {
    pub fn new(secret: &str, api_key: &str) -> Self {
        Self {
            key: CipherKey::derive(secret),
            expected: blake3::hash(api_key.as_bytes()),
        }
    }

    /// Build the gate described by `auth`, or `None` when auth is disabled.
    pub fn from_config(auth: &AuthConfig) -> ServerResult<Option<Self>> {
        if !auth.enabled {
            return Ok(None);
        }
        match (auth.secret_key.as_deref(), auth.api_key.as_deref()) {
            (Some(secret), Some(api_key)) if !secret.is_empty() && !api_key.is_empty() => {
                Ok(Some(Self::new(secret, api_key)))
            }
            _ => Err(ServerError::Config(
                "auth.secret_key and auth.api_key are required when auth is enabled".into(),
            )),
        }
    }

    pub fn check(&self, header: Option<&str>) -> GateDecision {
        let header = match header {
            Some(h) if !h.is_empty() => h,
            _ => return GateDecision::Rejected(Rejection::KeyMissing),
        };
        let Ok(recovered) = decrypt(header, &self.key) else {
            return GateDecision::Rejected(Rejection::DecryptFailed);
        };
        // blake3::Hash equality is constant-time.
        if blake3::hash(recovered.as_bytes()) == self.expected {
            GateDecision::Accepted
        } else {
            GateDecision::Rejected(Rejection::KeyMismatch)
        }
    }
}

impl fmt::Debug for ApiKeyGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyGate").finish_non_exhaustive()
    }
}

fn bypasses_gate(method: &Method, path: &str) -> bool {
    method == Method::OPTIONS || PUBLIC_PATHS.contains(&path)
}

/// A header that is not valid UTF-8 cannot be ciphertext.
fn decide(gate: &ApiKeyGate, header: Option<&HeaderValue>) -> GateDecision {
    match header.map(HeaderValue::to_str) {
        Some(Err(_)) => GateDecision::Rejected(Rejection::DecryptFailed),
        Some(Ok(value)) => gate.check(Some(value)),
        None => gate.check(None),
    }
}

pub fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "state": "error", "message": "Unauthorized" })),
    )
        .into_response()
}

/// Middleware enforcing the API-key gate on every non-public route.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(gate) = state.gate() else {
        return next.run(request).await;
    };
    if bypasses_gate(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    match decide(gate, request.headers().get(API_KEY_HEADER)) {
        GateDecision::Accepted => next.run(request).await,
        GateDecision::Rejected(reason) => {
            tracing::warn!(%reason, path = %request.uri().path(), "request rejected");
            unauthorized()
        }
    }
}
