//! Predict-family routes: JSON predict, CSV export, the legacy body-domain
//! alias and the object-storage key path.

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::error::GatewayError;
use crate::state::SharedState;
use crate::uploads::{self, TempUpload};

const DOMAIN_HINT: &str = "Use POST /api/predict/:domain (audio|eeg|ligo|grace)";

pub async fn predict(
    State(state): State<SharedState>,
    Path(domain): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Value>, GatewayError> {
    let domain = domain.to_lowercase();
    let (files, _) = uploads::collect(&mut multipart, &state.config).await?;
    predict_relay(&state, &domain, files).await
}

/// Legacy alias: domain travels as a multipart text field instead of the
/// path. Kept for old dashboard builds.
pub async fn predict_legacy(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, GatewayError> {
    let (files, fields) = uploads::collect(&mut multipart, &state.config).await?;
    let Some(domain) = fields.get("domain").map(|d| d.to_lowercase()) else {
        uploads::cleanup(&files).await;
        return Err(GatewayError::bad_request_with_hint("domain missing", DOMAIN_HINT));
    };
    predict_relay(&state, &domain, files).await
}

async fn predict_relay(
    state: &SharedState,
    domain: &str,
    files: Vec<TempUpload>,
) -> Result<Json<Value>, GatewayError> {
    if files.is_empty() {
        return Err(GatewayError::bad_request("no files"));
    }
    info!(domain = %domain, files = files.len(), "relaying predict");

    let result = state.upstream.predict(domain, &files).await;
    uploads::cleanup(&files).await;
    Ok(Json(result?))
}

pub async fn predict_csv(
    State(state): State<SharedState>,
    Path(domain): Path<String>,
    mut multipart: Multipart,
) -> Result<(HeaderMap, Body), GatewayError> {
    let domain = domain.to_lowercase();
    let (files, _) = uploads::collect(&mut multipart, &state.config).await?;
    if files.is_empty() {
        return Err(GatewayError::bad_request("no files"));
    }
    info!(domain = %domain, files = files.len(), "relaying csv export");

    let result = state.upstream.predict_csv(&domain, &files).await;
    uploads::cleanup(&files).await;
    let resp = result?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=\"phase45_results.csv\""),
    );
    Ok((headers, Body::from_stream(resp.bytes_stream())))
}

#[derive(Deserialize)]
pub struct FromS3Request {
    #[serde(default)]
    pub keys: Vec<String>,
}

/// Predict over files already staged in object storage by key.
pub async fn predict_from_s3(
    State(state): State<SharedState>,
    Path(domain): Path<String>,
    Json(req): Json<FromS3Request>,
) -> Result<Json<Value>, GatewayError> {
    let domain = domain.to_lowercase();
    if req.keys.is_empty() {
        return Err(GatewayError::bad_request("no keys"));
    }
    info!(domain = %domain, keys = req.keys.len(), "relaying predict from object storage");
    let data = state.upstream.predict_from_s3(&domain, &req.keys).await?;
    Ok(Json(data))
}
