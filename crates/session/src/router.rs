//! Transport-path selection for one predict submission.
//!
//! The two upload paths are variants of the same operation; the choice is
//! resolved once per submission into an `UploadPlan`, and both paths return
//! the identical result shape.

use std::env;

use insights::Domain;
use tracing::debug;

use crate::client::{PredictApi, ProgressFn};
use crate::error::ApiError;
use crate::types::{PredictResponse, UploadFile};

const DEFAULT_LARGE_FILE_MB: u64 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadMode {
    /// Presign only when a staged file exceeds the large-file threshold.
    #[default]
    Auto,
    /// Every submission goes through object storage.
    ForcePresigned,
}

#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub mode: UploadMode,
    /// Per-file size above which the submission routes through object
    /// storage. The upstream sources disagreed on this heuristic, so it is
    /// explicit configuration rather than a constant.
    pub large_file_threshold: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            mode: UploadMode::Auto,
            large_file_threshold: DEFAULT_LARGE_FILE_MB * 1024 * 1024,
        }
    }
}

impl UploadPolicy {
    /// Policy from `S3_UPLOAD_MODE` (`auto` | `force`) and `S3_LARGE_FILE_MB`.
    pub fn from_env() -> Self {
        let mode = match env::var("S3_UPLOAD_MODE").ok().as_deref() {
            Some("force") | Some("forced") | Some("always") => UploadMode::ForcePresigned,
            _ => UploadMode::Auto,
        };
        let threshold_mb = env::var("S3_LARGE_FILE_MB")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_LARGE_FILE_MB);
        Self {
            mode,
            large_file_threshold: threshold_mb * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPlan {
    Direct,
    Presigned,
}

pub fn plan(policy: &UploadPolicy, files: &[UploadFile]) -> UploadPlan {
    if policy.mode == UploadMode::ForcePresigned
        || files.iter().any(|f| f.size > policy.large_file_threshold)
    {
        UploadPlan::Presigned
    } else {
        UploadPlan::Direct
    }
}

/// Submit a batch of staged files for prediction over whichever path the
/// policy selects. Progress runs 0..=100 on both paths; the presigned path
/// advances once per staged file because the final predict call needs the
/// complete key list before it can start.
pub async fn submit(
    client: &dyn PredictApi,
    policy: &UploadPolicy,
    domain: Domain,
    files: &[UploadFile],
    progress: ProgressFn,
) -> Result<PredictResponse, ApiError> {
    match plan(policy, files) {
        UploadPlan::Direct => {
            debug!(domain = %domain, files = files.len(), "submitting via direct multipart");
            client.predict(domain, files, progress).await
        }
        UploadPlan::Presigned => {
            debug!(domain = %domain, files = files.len(), "submitting via presigned uploads");
            let mut keys = Vec::with_capacity(files.len());
            for (i, file) in files.iter().enumerate() {
                let staged = client.presign_upload(&file.name, &file.content_type).await?;
                client
                    .put_object(&staged.url, &file.content_type, file.data.clone())
                    .await?;
                keys.push(staged.key);
                progress((((i + 1) * 100) / files.len()) as u8);
            }
            client.predict_from_keys(domain, &keys).await
        }
    }
}
