//! Gateway error taxonomy and the central response normalizer.
//!
//! Every controller-level failure funnels through `IntoResponse` here, with
//! the precedence: size-limit message, then upstream-extracted message, then
//! the specific validation hint, then a bare "Server error".

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The prediction service answered with a non-2xx status.
    #[error("fastapi error")]
    Upstream { status: Option<u16>, body: Value },

    /// A multipart file exceeded the configured maximum.
    #[error("file too large (limit {max_mb} MB)")]
    TooLarge { max_mb: u64 },

    /// Missing or invalid request input.
    #[error("{message}")]
    BadRequest {
        message: String,
        hint: Option<String>,
    },

    /// The prediction service could not be reached at all.
    #[error("upstream transport failure: {0}")]
    Transport(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            hint: None,
        }
    }

    pub fn bad_request_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::TooLarge { max_mb } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({
                    "ok": false,
                    "error": format!("File too large. Maximum allowed size is {max_mb} MB."),
                })),
            )
                .into_response(),

            GatewayError::Upstream { status, body } => {
                // client errors pass through; upstream 5xx (or no status at
                // all) becomes a 502 from this hop
                let status = status
                    .and_then(|s| StatusCode::from_u16(s).ok())
                    .filter(StatusCode::is_client_error)
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                (
                    status,
                    Json(json!({
                        "ok": false,
                        "error": "fastapi error",
                        "details": body,
                    })),
                )
                    .into_response()
            }

            GatewayError::BadRequest { message, hint } => {
                let mut body = json!({ "ok": false, "error": message });
                if let Some(hint) = hint {
                    body["hint"] = Value::String(hint);
                }
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }

            GatewayError::Transport(message) => (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "ok": false, "error": message })),
            )
                .into_response(),

            GatewayError::Internal(message) => {
                error!(error = %message, "internal gateway error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "ok": false, "error": "Server error" })),
                )
                    .into_response()
            }
        }
    }
}

/// Best-effort message extraction from an upstream error body, checked in
/// order: string body, `error`, `detail` string, first `detail[].msg`.
pub fn upstream_message(body: &Value) -> Option<String> {
    match body {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(map) => {
            if let Some(msg) = map.get("error").and_then(Value::as_str) {
                if !msg.trim().is_empty() {
                    return Some(msg.trim().to_string());
                }
            }
            match map.get("detail") {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Some(Value::Array(items)) => items
                    .first()
                    .and_then(|item| item.get("msg"))
                    .and_then(Value::as_str)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
                _ => None,
            }
        }
        _ => None,
    }
}
