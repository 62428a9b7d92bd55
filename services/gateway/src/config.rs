use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_FASTAPI_BASE: &str = "http://127.0.0.1:8001";
const DEFAULT_FASTAPI_PREFIX: &str = "/api/v1";
const DEFAULT_TIMEOUT_MS: u64 = 5 * 60 * 1000;
const DEFAULT_MAX_FILE_MB: u64 = 1024;
const DEFAULT_PORT: u16 = 8080;

/// Immutable process configuration, read from the environment once at
/// startup and passed by reference into the request handlers.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    /// Fully resolved upstream base, prefix included.
    pub fastapi_url: String,
    pub fastapi_timeout: Duration,
    pub allowed_origins: Vec<String>,
    pub max_file_mb: u64,
    pub upload_tmp_dir: PathBuf,
    /// When set, presigned URLs returned to clients are rewritten onto this
    /// base (object storage behind a different public address).
    pub s3_public_base: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let prefix = prefix_path(
            &env::var("FASTAPI_PREFIX").unwrap_or_else(|_| DEFAULT_FASTAPI_PREFIX.to_string()),
        );

        let fastapi_url = match env::var("FASTAPI_URL").ok().map(|v| normalize(&v)) {
            Some(base) if !base.is_empty() => {
                if !prefix.is_empty() && !base.ends_with(&prefix) {
                    format!("{base}{prefix}")
                } else {
                    base
                }
            }
            _ => {
                let base = env::var("FASTAPI_BASE")
                    .ok()
                    .map(|v| normalize(&v))
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| DEFAULT_FASTAPI_BASE.to_string());
                format!("{base}{prefix}")
            }
        };

        let fastapi_timeout = Duration::from_millis(parse_positive(
            env::var("FASTAPI_TIMEOUT_MS").ok().as_deref(),
            DEFAULT_TIMEOUT_MS,
        ));

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let max_file_mb = parse_positive(
            env::var("MAX_FILE_MB").ok().as_deref(),
            DEFAULT_MAX_FILE_MB,
        );

        let upload_tmp_dir = env::var("UPLOAD_TMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir().join("phase45_uploads"));

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let s3_public_base = env::var("S3_PUBLIC_BASE")
            .ok()
            .map(|v| normalize(&v))
            .filter(|v| !v.is_empty());

        Self {
            port,
            fastapi_url,
            fastapi_timeout,
            allowed_origins,
            max_file_mb,
            upload_tmp_dir,
            s3_public_base,
        }
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_mb * 1024 * 1024
    }
}

/// Trim and strip trailing slashes.
fn normalize(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

/// "v1/x" and "/v1/x" both become "/v1/x"; empty stays empty.
fn prefix_path(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    format!("/{}", trimmed.trim_start_matches('/'))
}

fn parse_positive(value: Option<&str>, fallback: u64) -> u64 {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_normalization() {
        assert_eq!(prefix_path("api/v1"), "/api/v1");
        assert_eq!(prefix_path("/api/v1"), "/api/v1");
        assert_eq!(prefix_path("  "), "");
    }

    #[test]
    fn url_normalization() {
        assert_eq!(normalize("http://x:8001///"), "http://x:8001");
        assert_eq!(normalize("  http://x "), "http://x");
    }

    #[test]
    fn positive_parse_falls_back() {
        assert_eq!(parse_positive(Some("250"), 10), 250);
        assert_eq!(parse_positive(Some("0"), 10), 10);
        assert_eq!(parse_positive(Some("nope"), 10), 10);
        assert_eq!(parse_positive(None, 10), 10);
    }
}
