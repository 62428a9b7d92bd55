//! Transport seam between the session store and the gateway.
//!
//! The store and the upload router only ever talk to this trait; the reqwest
//! implementation lives in `http`, tests substitute a recording mock.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use insights::Domain;

use crate::error::ApiError;
use crate::types::{
    PredictResponse, PresignedUpload, PsiSurface, PsiSurfaceParams, SpectrogramData, UploadFile,
};

/// Upload progress callback, 0..=100. Fires incrementally during the upload
/// phase only.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

pub fn no_progress() -> ProgressFn {
    Arc::new(|_| {})
}

#[async_trait]
pub trait PredictApi: Send + Sync {
    /// Direct path: one multipart POST carrying every staged file.
    async fn predict(
        &self,
        domain: Domain,
        files: &[UploadFile],
        progress: ProgressFn,
    ) -> Result<PredictResponse, ApiError>;

    /// CSV export for the staged files, returned as a blob.
    async fn predict_csv(&self, domain: Domain, files: &[UploadFile]) -> Result<Bytes, ApiError>;

    async fn spectrogram_json(
        &self,
        domain: Domain,
        file: &UploadFile,
    ) -> Result<SpectrogramData, ApiError>;

    async fn psi_surface(&self, params: &PsiSurfaceParams) -> Result<PsiSurface, ApiError>;

    /// Obtain a presigned upload descriptor for one file.
    async fn presign_upload(
        &self,
        name: &str,
        content_type: &str,
    ) -> Result<PresignedUpload, ApiError>;

    /// Raw PUT of file bytes to a presigned URL.
    async fn put_object(&self, url: &str, content_type: &str, data: Bytes)
        -> Result<(), ApiError>;

    /// Indirect path tail: predict over already-staged object-storage keys.
    async fn predict_from_keys(
        &self,
        domain: Domain,
        keys: &[String],
    ) -> Result<PredictResponse, ApiError>;

    async fn health(&self) -> Result<serde_json::Value, ApiError>;
}
