//! Presigned-upload brokering for the large-file path.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::error::GatewayError;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct PresignRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content_type: String,
}

/// Obtain `{url, key}` for a direct object-storage PUT. When the storage
/// endpoint sits behind a different public address than the one the
/// prediction service signs for, the URL is rewritten onto the configured
/// public base (path and query, signature included, stay intact).
pub async fn presign(
    State(state): State<SharedState>,
    Json(req): Json<PresignRequest>,
) -> Result<Json<Value>, GatewayError> {
    if req.name.trim().is_empty() {
        return Err(GatewayError::bad_request("name required"));
    }
    let content_type = if req.content_type.trim().is_empty() {
        "application/octet-stream"
    } else {
        req.content_type.trim()
    };

    info!(name = %req.name, "presigning upload");
    let mut data = state.upstream.presign(&req.name, content_type).await?;

    if let Some(public_base) = &state.config.s3_public_base {
        if let Some(url) = data.get("url").and_then(Value::as_str) {
            data["url"] = Value::String(rewrite_base(url, public_base));
        }
    }
    Ok(Json(data))
}

/// Swap the scheme+authority of `url` for `public_base`, keeping everything
/// from the path on. Unparseable URLs pass through untouched.
fn rewrite_base(url: &str, public_base: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    match url[scheme_end + 3..].find('/') {
        Some(path_start) => {
            let path = &url[scheme_end + 3 + path_start..];
            format!("{public_base}{path}")
        }
        None => public_base.to_string(),
    }
}
