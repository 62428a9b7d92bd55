//! Client-side error normalization.
//!
//! Every failure the store records passes through `human_message`, so the
//! error banner and the failed run's notes always show the same string.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The gateway answered with a non-2xx status. `body` is whatever it
    /// sent, JSON when parseable.
    #[error("request failed with status code {status}")]
    Status { status: u16, body: Value },

    /// The gateway could not be reached at all.
    #[error("network error talking to {base_url}: {message}")]
    Network { base_url: String, message: String },

    /// The request could not be assembled (bad part metadata etc).
    #[error("invalid request: {0}")]
    Request(String),

    /// A 2xx response whose body did not match the expected shape.
    #[error("invalid response body: {0}")]
    Decode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Collapse any failure into one human-readable string.
    ///
    /// For status errors the most specific message wins: a message extracted
    /// from the gateway's `details` payload (the upstream body it relayed)
    /// beats the gateway's own error label, which beats a generic
    /// status-code message. Bare network failures are rewritten into an
    /// actionable hint naming the gateway address.
    pub fn human_message(&self, fallback: &str) -> String {
        let message = match self {
            ApiError::Status { status, body } => extract_body_message(body)
                .unwrap_or_else(|| format!("Request failed with status code {status}")),
            ApiError::Network { base_url, .. } => format!(
                "Network error talking to the API gateway ({base_url}). Make sure the gateway \
                 is running and not blocked by CORS or a proxy."
            ),
            ApiError::Request(msg) | ApiError::Decode(msg) => msg.clone(),
            ApiError::Io(e) => e.to_string(),
        };
        let message = message.trim();
        if message.is_empty() {
            fallback.to_string()
        } else {
            message.to_string()
        }
    }
}

/// Best-effort message extraction from an error body, deepest first:
/// the relayed upstream payload under `details`, then `error`, then a
/// `detail` string, then the first `detail[].msg`.
fn extract_body_message(body: &Value) -> Option<String> {
    match body {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(map) => {
            if let Some(details) = map.get("details") {
                if let Some(msg) = extract_body_message(details) {
                    return Some(msg);
                }
            }
            if let Some(msg) = map.get("error").and_then(nonempty_str) {
                return Some(msg);
            }
            if let Some(msg) = map.get("detail").and_then(nonempty_str) {
                return Some(msg);
            }
            map.get("detail")
                .and_then(Value::as_array)
                .and_then(|items| items.first())
                .and_then(|item| item.get("msg"))
                .and_then(nonempty_str)
        }
        _ => None,
    }
}

fn nonempty_str(v: &Value) -> Option<String> {
    v.as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn relayed_upstream_detail_wins_over_gateway_label() {
        let err = ApiError::Status {
            status: 502,
            body: json!({"ok": false, "error": "fastapi error", "details": {"detail": "model failed"}}),
        };
        assert_eq!(err.human_message("Analysis failed"), "model failed");
    }

    #[test]
    fn error_field_used_when_no_details() {
        let err = ApiError::Status {
            status: 400,
            body: json!({"ok": false, "error": "domain missing"}),
        };
        assert_eq!(err.human_message("x"), "domain missing");
    }

    #[test]
    fn detail_array_first_msg() {
        let err = ApiError::Status {
            status: 422,
            body: json!({"detail": [{"msg": "field required", "loc": ["files"]}]}),
        };
        assert_eq!(err.human_message("x"), "field required");
    }

    #[test]
    fn string_body_passes_through() {
        let err = ApiError::Status {
            status: 500,
            body: json!("boom"),
        };
        assert_eq!(err.human_message("x"), "boom");
    }

    #[test]
    fn opaque_body_falls_back_to_status_line() {
        let err = ApiError::Status {
            status: 500,
            body: json!({"weird": true}),
        };
        assert_eq!(err.human_message("x"), "Request failed with status code 500");
    }

    #[test]
    fn network_error_becomes_actionable_hint() {
        let err = ApiError::Network {
            base_url: "http://127.0.0.1:8080".into(),
            message: "connection refused".into(),
        };
        let msg = err.human_message("x");
        assert!(msg.contains("http://127.0.0.1:8080"));
        assert!(msg.contains("Make sure the gateway is running"));
    }
}
