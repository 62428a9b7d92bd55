//! reqwest-backed `PredictApi` implementation against the gateway.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use insights::Domain;

use crate::client::{PredictApi, ProgressFn};
use crate::error::ApiError;
use crate::types::{
    PredictResponse, PresignedUpload, PsiSurface, PsiSurfaceParams, SpectrogramData, UploadFile,
};

/// Matches the dashboard's request timeout; the gateway's own upstream
/// timeout is much longer and handled on its side.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const UPLOAD_CHUNK: usize = 64 * 1024;

pub struct HttpPredictClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpPredictClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Request(e.to_string()))?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn network(&self, e: reqwest::Error) -> ApiError {
        ApiError::Network {
            base_url: self.base_url.clone(),
            message: e.to_string(),
        }
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(status.as_u16(), resp).await);
        }
        resp.json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn bytes_part(file: &UploadFile) -> Result<Part, ApiError> {
        Part::bytes(file.data.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| ApiError::Request(e.to_string()))
    }

    /// Multipart part streaming the file in chunks, bumping the shared sent
    /// counter so the caller sees incremental upload progress.
    fn progress_part(
        file: &UploadFile,
        sent: Arc<AtomicU64>,
        total: u64,
        progress: ProgressFn,
    ) -> Result<Part, ApiError> {
        let data = file.data.clone();
        let len = data.len();
        let chunks = (0..len).step_by(UPLOAD_CHUNK).map(move |off| {
            let end = (off + UPLOAD_CHUNK).min(len);
            Ok::<Bytes, std::io::Error>(data.slice(off..end))
        });
        let stream = futures::stream::iter(chunks).inspect(move |chunk| {
            if let Ok(c) = chunk {
                let done = sent.fetch_add(c.len() as u64, Ordering::Relaxed) + c.len() as u64;
                if total > 0 {
                    progress(((done * 100) / total).min(100) as u8);
                }
            }
        });
        Part::stream_with_length(reqwest::Body::wrap_stream(stream), file.size)
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| ApiError::Request(e.to_string()))
    }
}

async fn status_error(status: u16, resp: reqwest::Response) -> ApiError {
    let text = resp.text().await.unwrap_or_default();
    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
    ApiError::Status { status, body }
}

#[async_trait]
impl PredictApi for HttpPredictClient {
    async fn predict(
        &self,
        domain: Domain,
        files: &[UploadFile],
        progress: ProgressFn,
    ) -> Result<PredictResponse, ApiError> {
        let total: u64 = files.iter().map(|f| f.size).sum();
        let sent = Arc::new(AtomicU64::new(0));
        let mut form = Form::new();
        for file in files {
            form = form.part(
                "files",
                Self::progress_part(file, sent.clone(), total, progress.clone())?,
            );
        }
        let resp = self
            .client
            .post(self.url(&format!("/api/predict/{domain}")))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.network(e))?;
        Self::decode(resp).await
    }

    async fn predict_csv(&self, domain: Domain, files: &[UploadFile]) -> Result<Bytes, ApiError> {
        let mut form = Form::new();
        for file in files {
            form = form.part("files", Self::bytes_part(file)?);
        }
        let resp = self
            .client
            .post(self.url(&format!("/api/predict/{domain}/csv")))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.network(e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(status.as_u16(), resp).await);
        }
        resp.bytes().await.map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn spectrogram_json(
        &self,
        domain: Domain,
        file: &UploadFile,
    ) -> Result<SpectrogramData, ApiError> {
        let form = Form::new().part("file", Self::bytes_part(file)?);
        let resp = self
            .client
            .post(self.url(&format!("/api/spectrogram_json/{domain}")))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.network(e))?;
        Self::decode(resp).await
    }

    async fn psi_surface(&self, params: &PsiSurfaceParams) -> Result<PsiSurface, ApiError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(gmin) = params.gmin {
            query.push(("gmin", gmin.to_string()));
        }
        if let Some(gmax) = params.gmax {
            query.push(("gmax", gmax.to_string()));
        }
        if let Some(n) = params.n {
            query.push(("n", n.to_string()));
        }
        let resp = self
            .client
            .get(self.url("/api/surface/psi-surface"))
            .query(&query)
            .send()
            .await
            .map_err(|e| self.network(e))?;
        Self::decode(resp).await
    }

    async fn presign_upload(
        &self,
        name: &str,
        content_type: &str,
    ) -> Result<PresignedUpload, ApiError> {
        let resp = self
            .client
            .post(self.url("/api/uploads/presign"))
            .json(&json!({ "name": name, "content_type": content_type }))
            .send()
            .await
            .map_err(|e| self.network(e))?;
        Self::decode(resp).await
    }

    async fn put_object(
        &self,
        url: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<(), ApiError> {
        let resp = self
            .client
            .put(url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| self.network(e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(status.as_u16(), resp).await);
        }
        Ok(())
    }

    async fn predict_from_keys(
        &self,
        domain: Domain,
        keys: &[String],
    ) -> Result<PredictResponse, ApiError> {
        let resp = self
            .client
            .post(self.url(&format!("/api/predict/{domain}/from-s3")))
            .json(&json!({ "keys": keys }))
            .send()
            .await
            .map_err(|e| self.network(e))?;
        Self::decode(resp).await
    }

    async fn health(&self) -> Result<serde_json::Value, ApiError> {
        let resp = self
            .client
            .get(self.url("/api/health"))
            .send()
            .await
            .map_err(|e| self.network(e))?;
        Self::decode(resp).await
    }
}
