//! Spectrogram routes: JSON payload for the heatmap view, streamed PNG for
//! direct embedding.

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::Json;
use serde_json::Value;
use tracing::info;

use crate::error::GatewayError;
use crate::state::SharedState;
use crate::uploads::{self, TempUpload};

async fn single_upload(
    multipart: &mut Multipart,
    state: &SharedState,
) -> Result<(TempUpload, Vec<TempUpload>), GatewayError> {
    let (files, _) = uploads::collect(multipart, &state.config).await?;
    match files.first().cloned() {
        Some(first) => Ok((first, files)),
        None => Err(GatewayError::bad_request("file required")),
    }
}

pub async fn spectrogram_json(
    State(state): State<SharedState>,
    Path(domain): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Value>, GatewayError> {
    let domain = domain.to_lowercase();
    let (first, files) = single_upload(&mut multipart, &state).await?;
    info!(domain = %domain, file = %first.name, "relaying spectrogram json");

    let result = state.upstream.spectrogram_json(&domain, &first).await;
    uploads::cleanup(&files).await;
    Ok(Json(result?))
}

pub async fn spectrogram_png(
    State(state): State<SharedState>,
    Path(domain): Path<String>,
    mut multipart: Multipart,
) -> Result<(HeaderMap, Body), GatewayError> {
    let domain = domain.to_lowercase();
    let (first, files) = single_upload(&mut multipart, &state).await?;
    info!(domain = %domain, file = %first.name, "relaying spectrogram png");

    let result = state.upstream.spectrogram_png(&domain, &first).await;
    uploads::cleanup(&files).await;
    let resp = result?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("inline; filename=\"spectrogram.png\""),
    );
    Ok((headers, Body::from_stream(resp.bytes_stream())))
}
