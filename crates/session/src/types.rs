use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use insights::{Domain, ResultRow};

use crate::error::ApiError;

/// A file staged in the client queue, not yet submitted for analysis.
///
/// Owned by the session store from staging until an analyze run consumes it;
/// never mutated after creation.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub id: Uuid,
    pub name: String,
    pub size: u64,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            size: data.len() as u64,
            content_type: content_type.into(),
            data,
        }
    }

    /// Stage a file from disk, inferring the content type from the extension.
    pub async fn from_path(path: &Path) -> Result<Self, ApiError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let data = Bytes::from(tokio::fs::read(path).await?);
        let content_type = guess_content_type(&name).to_string();
        Ok(Self::new(name, content_type, data))
    }
}

pub(crate) fn guess_content_type(name: &str) -> &'static str {
    let ext = name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "csv" => "text/csv",
        "json" => "application/json",
        "h5" | "hdf5" => "application/x-hdf",
        _ => "application/octet-stream",
    }
}

/// Result shape shared by the direct and presigned predict paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    pub results: Vec<ResultRow>,
    #[serde(default)]
    pub r2: Option<f64>,
    #[serde(default)]
    pub mae: Option<f64>,
}

/// Spectrogram payload for the heatmap/surface views.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpectrogramData {
    #[serde(default)]
    pub t: Vec<f64>,
    #[serde(default)]
    pub f: Vec<f64>,
    #[serde(default)]
    pub sxx_db: Vec<Vec<f64>>,
    #[serde(default)]
    pub ct: Option<f64>,
    #[serde(default)]
    pub meta: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PsiSurfaceParams {
    pub gmin: Option<f64>,
    pub gmax: Option<f64>,
    pub n: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PsiSurface {
    #[serde(default)]
    pub gamma: Vec<f64>,
    #[serde(default)]
    pub energy: Vec<f64>,
    #[serde(default)]
    pub ct: Vec<Vec<f64>>,
}

/// Presigned upload descriptor: PUT the bytes to `url`, hand `key` back to
/// the predict-from-keys endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresignedUpload {
    pub url: String,
    pub key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Ready,
    Error,
}

/// Snapshot of one analyze attempt, success or failure.
///
/// Immutable once created; restoring a run replaces the live rows with the
/// record's `data` wholesale.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    pub files: usize,
    pub domain: Domain,
    pub status: RunStatus,
    pub data: Option<Vec<ResultRow>>,
    pub r2: Option<f64>,
    pub mae: Option<f64>,
    pub notes: Option<String>,
}
