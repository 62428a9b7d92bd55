//! ψ-surface pass-through.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use crate::error::GatewayError;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct PsiSurfaceQuery {
    pub gmin: Option<String>,
    pub gmax: Option<String>,
    pub n: Option<String>,
}

pub async fn psi_surface(
    State(state): State<SharedState>,
    Query(q): Query<PsiSurfaceQuery>,
) -> Result<Json<Value>, GatewayError> {
    let mut query: Vec<(String, String)> = Vec::new();
    for (key, value) in [("gmin", q.gmin), ("gmax", q.gmax), ("n", q.n)] {
        if let Some(value) = value {
            query.push((key.to_string(), value));
        }
    }
    let data = state.upstream.psi_surface(&query).await?;
    Ok(Json(data))
}
