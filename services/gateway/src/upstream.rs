//! HTTP client for the FastAPI prediction service.
//!
//! Rebuilds inbound uploads as outbound multipart (field `files` for the
//! batch endpoints, `file` for the singular ones), streaming file contents
//! from the temp spool rather than buffering them.

use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::warn;

use crate::error::{upstream_message, GatewayError};
use crate::uploads::TempUpload;

pub struct UpstreamClient {
    base_url: String,
    client: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(base_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn file_part(file: &TempUpload) -> Result<Part, GatewayError> {
        let f = tokio::fs::File::open(&file.path).await.map_err(|e| {
            GatewayError::internal(format!("reading upload {}: {e}", file.path.display()))
        })?;
        let body = reqwest::Body::wrap_stream(ReaderStream::new(f));
        Part::stream_with_length(body, file.size)
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(GatewayError::internal)
    }

    async fn files_form(domain: &str, files: &[TempUpload]) -> Result<Form, GatewayError> {
        let mut form = Form::new().text("domain", domain.to_string());
        for file in files {
            form = form.part("files", Self::file_part(file).await?);
        }
        Ok(form)
    }

    async fn single_file_form(domain: &str, file: &TempUpload) -> Result<Form, GatewayError> {
        Ok(Form::new()
            .text("domain", domain.to_string())
            .part("file", Self::file_part(file).await?))
    }

    fn transport(e: reqwest::Error) -> GatewayError {
        GatewayError::Transport(e.to_string())
    }

    /// Turn a non-2xx upstream response into the error the normalizer
    /// surfaces; 2xx passes through.
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let text = resp.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        warn!(
            status = status.as_u16(),
            message = upstream_message(&body).as_deref().unwrap_or("fastapi request failed"),
            "upstream error"
        );
        Err(GatewayError::Upstream {
            status: Some(status.as_u16()),
            body,
        })
    }

    async fn json_body(resp: reqwest::Response) -> Result<Value, GatewayError> {
        Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::internal(format!("decoding upstream response: {e}")))
    }

    pub async fn predict(&self, domain: &str, files: &[TempUpload]) -> Result<Value, GatewayError> {
        let form = Self::files_form(domain, files).await?;
        let resp = self
            .client
            .post(self.url("/predict"))
            .multipart(form)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::json_body(resp).await
    }

    /// CSV export; the response is handed back unread so the caller can pipe
    /// the byte stream straight through.
    pub async fn predict_csv(
        &self,
        domain: &str,
        files: &[TempUpload],
    ) -> Result<reqwest::Response, GatewayError> {
        let form = Self::files_form(domain, files).await?;
        let resp = self
            .client
            .post(self.url("/predict/csv"))
            .multipart(form)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::check(resp).await
    }

    /// Spectrogram PNG; streamed like the CSV export.
    pub async fn spectrogram_png(
        &self,
        domain: &str,
        file: &TempUpload,
    ) -> Result<reqwest::Response, GatewayError> {
        let form = Self::single_file_form(domain, file).await?;
        let resp = self
            .client
            .post(self.url("/predict/spectrogram"))
            .multipart(form)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::check(resp).await
    }

    pub async fn spectrogram_json(
        &self,
        domain: &str,
        file: &TempUpload,
    ) -> Result<Value, GatewayError> {
        let form = Self::single_file_form(domain, file).await?;
        let resp = self
            .client
            .post(self.url("/spectrogram_json"))
            .multipart(form)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::json_body(resp).await
    }

    pub async fn psi_surface(&self, query: &[(String, String)]) -> Result<Value, GatewayError> {
        let resp = self
            .client
            .get(self.url("/psi-surface"))
            .query(query)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::json_body(resp).await
    }

    pub async fn presign(&self, name: &str, content_type: &str) -> Result<Value, GatewayError> {
        let resp = self
            .client
            .post(self.url("/uploads/presign"))
            .json(&json!({ "name": name, "content_type": content_type }))
            .send()
            .await
            .map_err(Self::transport)?;
        Self::json_body(resp).await
    }

    pub async fn predict_from_s3(
        &self,
        domain: &str,
        keys: &[String],
    ) -> Result<Value, GatewayError> {
        let resp = self
            .client
            .post(self.url("/predict_from_s3"))
            .json(&json!({ "domain": domain, "keys": keys }))
            .send()
            .await
            .map_err(Self::transport)?;
        Self::json_body(resp).await
    }

    pub async fn health(&self) -> Result<Value, GatewayError> {
        let resp = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(Self::transport)?;
        Self::json_body(resp).await
    }
}
