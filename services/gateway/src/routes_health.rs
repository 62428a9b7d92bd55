use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::error::GatewayError;
use crate::state::SharedState;

/// Combined health: this hop plus the upstream's own health payload.
pub async fn health(State(state): State<SharedState>) -> Result<Json<Value>, GatewayError> {
    let fastapi = state.upstream.health().await?;
    Ok(Json(json!({ "node": "ok", "fastapi": fastapi })))
}
