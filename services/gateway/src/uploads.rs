//! Temporary spooling of inbound multipart uploads.
//!
//! Each request owns the temp files it creates and deletes them itself once
//! the upstream call resolves, success or failure. Deletion failures are
//! logged and swallowed.

use axum::extract::Multipart;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::config::AppConfig;
use crate::error::GatewayError;

/// One spooled upload: original name and content type, plus where the bytes
/// landed on disk.
#[derive(Debug, Clone)]
pub struct TempUpload {
    pub path: PathBuf,
    pub name: String,
    pub content_type: String,
    pub size: u64,
}

/// Drain a multipart body: file fields are spooled to the temp dir with the
/// per-file size limit enforced while writing, text fields are collected
/// into a map. On any error everything already written is removed before
/// the error propagates.
pub async fn collect(
    multipart: &mut Multipart,
    config: &AppConfig,
) -> Result<(Vec<TempUpload>, HashMap<String, String>), GatewayError> {
    let mut files: Vec<TempUpload> = Vec::new();
    let mut fields: HashMap<String, String> = HashMap::new();

    let result = collect_inner(multipart, config, &mut files, &mut fields).await;
    if let Err(err) = result {
        cleanup(&files).await;
        return Err(err);
    }
    Ok((files, fields))
}

async fn collect_inner(
    multipart: &mut Multipart,
    config: &AppConfig,
    files: &mut Vec<TempUpload>,
    fields: &mut HashMap<String, String>,
) -> Result<(), GatewayError> {
    let max_bytes = config.max_file_bytes();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::bad_request(e.to_string()))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            // plain text field (the legacy route carries `domain` this way)
            let name = field.name().unwrap_or_default().to_string();
            let value = field
                .text()
                .await
                .map_err(|e| GatewayError::bad_request(e.to_string()))?;
            if !name.is_empty() {
                fields.insert(name, value);
            }
            continue;
        };

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        tokio::fs::create_dir_all(&config.upload_tmp_dir)
            .await
            .map_err(GatewayError::internal)?;
        let path = config.upload_tmp_dir.join(temp_file_name(&file_name));
        let mut out = tokio::fs::File::create(&path)
            .await
            .map_err(GatewayError::internal)?;

        let mut written: u64 = 0;
        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    remove_quietly(&path).await;
                    return Err(GatewayError::bad_request(e.to_string()));
                }
            };
            written += chunk.len() as u64;
            if written > max_bytes {
                drop(out);
                remove_quietly(&path).await;
                return Err(GatewayError::TooLarge {
                    max_mb: config.max_file_mb,
                });
            }
            out.write_all(&chunk).await.map_err(|e| {
                GatewayError::internal(format!("writing upload to {}: {e}", path.display()))
            })?;
        }
        out.flush().await.map_err(GatewayError::internal)?;

        files.push(TempUpload {
            path,
            name: file_name,
            content_type,
            size: written,
        });
    }

    Ok(())
}

/// Remove every temp file of a finished request. Runs on success and on
/// failure; a file that will not delete is not the caller's problem.
pub async fn cleanup(files: &[TempUpload]) {
    for file in files {
        remove_quietly(&file.path).await;
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "failed to remove temp upload");
    }
}

/// `My Capture (1).wav` -> `My_Capture__1__<stamp>.wav`; stem capped at 40
/// chars, stamp keeps concurrent uploads of the same name apart.
fn temp_file_name(original: &str) -> String {
    let (stem, ext) = match original.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (original, None),
    };
    let mut safe: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .take(40)
        .collect();
    if safe.is_empty() {
        safe.push_str("file");
    }
    let stamp = base36(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default(),
    );
    match ext {
        Some(ext) => {
            let safe_ext: String = ext
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .take(10)
                .collect();
            format!("{safe}_{stamp}.{safe_ext}")
        }
        None => format!("{safe}_{stamp}"),
    }
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
