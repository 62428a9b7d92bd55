//! Gateway end-to-end behavior against a mocked prediction service.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use gateway::config::AppConfig;
use gateway::state::AppState;

const BOUNDARY: &str = "phase45testboundary";

/// Minimal multipart encoder for test requests.
/// Each part is (field name, optional filename, content type, bytes).
fn multipart_body(parts: &[(&str, Option<&str>, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, content_type, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
            }
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

struct TestGateway {
    app: axum::Router,
    upstream: mockito::ServerGuard,
    tmp_dir: tempfile::TempDir,
}

async fn gateway_with(max_file_mb: u64, s3_public_base: Option<String>) -> TestGateway {
    let upstream = mockito::Server::new_async().await;
    let tmp_dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        port: 0,
        fastapi_url: format!("{}/api/v1", upstream.url()),
        fastapi_timeout: Duration::from_secs(10),
        allowed_origins: vec![],
        max_file_mb,
        upload_tmp_dir: tmp_dir.path().to_path_buf(),
        s3_public_base,
    };
    let state = Arc::new(AppState::new(config).unwrap());
    TestGateway {
        app: gateway::app(state),
        upstream,
        tmp_dir,
    }
}

impl TestGateway {
    fn temp_files(&self) -> usize {
        std::fs::read_dir(self.tmp_dir.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_of(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn predict_relays_multipart_and_cleans_temp_files() {
    let mut gw = gateway_with(10, None).await;
    let upstream = gw
        .upstream
        .mock("POST", "/api/v1/predict")
        .match_body(mockito::Matcher::AllOf(vec![
            mockito::Matcher::Regex("name=\"domain\"".into()),
            mockito::Matcher::Regex("audio".into()),
            mockito::Matcher::Regex("name=\"files\"; filename=\"a.wav\"".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "results": [{"name": "a.wav", "ct_pred": 0.42, "domain": "audio"}],
                "r2": 0.91,
                "mae": 0.03
            })
            .to_string(),
        )
        .create_async()
        .await;

    let body = multipart_body(&[("files", Some("a.wav"), "audio/wav", b"RIFF-audio-bytes")]);
    // mixed-case domain must be lowercased before forwarding
    let resp = gw
        .app
        .clone()
        .oneshot(multipart_request("/api/predict/AUDIO", body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = json_of(resp).await;
    assert_eq!(json["results"][0]["ct_pred"], json!(0.42));
    assert_eq!(json["r2"], json!(0.91));

    upstream.assert_async().await;
    assert_eq!(gw.temp_files(), 0, "temp uploads must be deleted");
}

#[tokio::test]
async fn upstream_failure_maps_to_502_and_still_cleans_up() {
    let mut gw = gateway_with(10, None).await;
    gw.upstream
        .mock("POST", "/api/v1/predict")
        .with_status(500)
        .with_header("content-type", "application/json")
        .with_body(json!({"detail": "model failed"}).to_string())
        .create_async()
        .await;

    let body = multipart_body(&[("files", Some("a.wav"), "audio/wav", b"bytes")]);
    let resp = gw
        .app
        .clone()
        .oneshot(multipart_request("/api/predict/audio", body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let json = json_of(resp).await;
    assert_eq!(json["ok"], json!(false));
    assert_eq!(json["error"], json!("fastapi error"));
    assert_eq!(json["details"], json!({"detail": "model failed"}));

    assert_eq!(gw.temp_files(), 0, "cleanup must run on failure too");
}

#[tokio::test]
async fn oversize_file_yields_413_with_mb_message() {
    let gw = gateway_with(1, None).await;

    let oversize = vec![0u8; 1024 * 1024 + 1];
    let body = multipart_body(&[("files", Some("big.wav"), "audio/wav", &oversize)]);
    let resp = gw
        .app
        .clone()
        .oneshot(multipart_request("/api/predict/audio", body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let json = json_of(resp).await;
    assert_eq!(
        json["error"],
        json!("File too large. Maximum allowed size is 1 MB.")
    );

    assert_eq!(gw.temp_files(), 0, "partial spool must be removed");
}

#[tokio::test]
async fn legacy_predict_requires_domain() {
    let gw = gateway_with(10, None).await;

    let body = multipart_body(&[("files", Some("a.wav"), "audio/wav", b"bytes")]);
    let resp = gw
        .app
        .clone()
        .oneshot(multipart_request("/api/predict", body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = json_of(resp).await;
    assert_eq!(json["ok"], json!(false));
    assert_eq!(json["error"], json!("domain missing"));
    assert_eq!(
        json["hint"],
        json!("Use POST /api/predict/:domain (audio|eeg|ligo|grace)")
    );

    assert_eq!(gw.temp_files(), 0);
}

#[tokio::test]
async fn legacy_predict_accepts_domain_field() {
    let mut gw = gateway_with(10, None).await;
    let upstream = gw
        .upstream
        .mock("POST", "/api/v1/predict")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"results": []}).to_string())
        .create_async()
        .await;

    let body = multipart_body(&[
        ("domain", None, "", b"EEG"),
        ("files", Some("cap.edf"), "application/octet-stream", b"eeg-bytes"),
    ]);
    let resp = gw
        .app
        .clone()
        .oneshot(multipart_request("/api/predict", body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    upstream.assert_async().await;
}

#[tokio::test]
async fn predict_without_files_is_rejected() {
    let gw = gateway_with(10, None).await;

    let body = multipart_body(&[]);
    let resp = gw
        .app
        .clone()
        .oneshot(multipart_request("/api/predict/audio", body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = json_of(resp).await;
    assert_eq!(json["error"], json!("no files"));
}

#[tokio::test]
async fn spectrogram_json_requires_file() {
    let gw = gateway_with(10, None).await;

    let body = multipart_body(&[]);
    let resp = gw
        .app
        .clone()
        .oneshot(multipart_request("/api/spectrogram_json/audio", body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = json_of(resp).await;
    assert_eq!(json["error"], json!("file required"));
}

#[tokio::test]
async fn spectrogram_json_relays_single_file() {
    let mut gw = gateway_with(10, None).await;
    let upstream = gw
        .upstream
        .mock("POST", "/api/v1/spectrogram_json")
        .match_body(mockito::Matcher::Regex("name=\"file\"; filename=\"a.wav\"".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"t": [0.0], "f": [1.0], "sxx_db": [[-3.0]], "ct": 0.2, "meta": {}}).to_string())
        .create_async()
        .await;

    let body = multipart_body(&[("file", Some("a.wav"), "audio/wav", b"bytes")]);
    let resp = gw
        .app
        .clone()
        .oneshot(multipart_request("/api/spectrogram_json/audio", body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = json_of(resp).await;
    assert_eq!(json["ct"], json!(0.2));
    upstream.assert_async().await;
    assert_eq!(gw.temp_files(), 0);
}

#[tokio::test]
async fn from_s3_relays_domain_and_keys() {
    let mut gw = gateway_with(10, None).await;
    let upstream = gw
        .upstream
        .mock("POST", "/api/v1/predict_from_s3")
        .match_body(mockito::Matcher::Json(
            json!({"domain": "ligo", "keys": ["uploads/big.h5"]}),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"results": [{"name": "big.h5", "ct_pred": 1.7, "domain": "ligo"}]}).to_string(),
        )
        .create_async()
        .await;

    let resp = gw
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/predict/LIGO/from-s3")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"keys": ["uploads/big.h5"]}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = json_of(resp).await;
    assert_eq!(json["results"][0]["name"], json!("big.h5"));
    upstream.assert_async().await;
}

#[tokio::test]
async fn from_s3_rejects_empty_keys() {
    let gw = gateway_with(10, None).await;

    let resp = gw
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/predict/ligo/from-s3")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"keys": []}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn csv_export_streams_with_attachment_headers() {
    let mut gw = gateway_with(10, None).await;
    gw.upstream
        .mock("POST", "/api/v1/predict/csv")
        .with_status(200)
        .with_header("content-type", "text/csv")
        .with_body("name,ct\na.wav,0.42\n")
        .create_async()
        .await;

    let body = multipart_body(&[("files", Some("a.wav"), "audio/wav", b"bytes")]);
    let resp = gw
        .app
        .clone()
        .oneshot(multipart_request("/api/predict/audio/csv", body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/csv"
    );
    assert_eq!(
        resp.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"phase45_results.csv\""
    );
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"name,ct\na.wav,0.42\n");
    assert_eq!(gw.temp_files(), 0);
}

#[tokio::test]
async fn health_wraps_upstream_payload() {
    let mut gw = gateway_with(10, None).await;
    gw.upstream
        .mock("GET", "/api/v1/health")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"status": "ok", "model": "psi-45"}).to_string())
        .create_async()
        .await;

    let resp = gw
        .app
        .clone()
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = json_of(resp).await;
    assert_eq!(json["node"], json!("ok"));
    assert_eq!(json["fastapi"]["model"], json!("psi-45"));
}

#[tokio::test]
async fn psi_surface_forwards_query_params() {
    let mut gw = gateway_with(10, None).await;
    let upstream = gw
        .upstream
        .mock("GET", "/api/v1/psi-surface")
        .match_query(mockito::Matcher::AllOf(vec![
            mockito::Matcher::UrlEncoded("gmin".into(), "0".into()),
            mockito::Matcher::UrlEncoded("gmax".into(), "3".into()),
            mockito::Matcher::UrlEncoded("n".into(), "60".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"gamma": [0.0], "energy": [1.0], "ct": [[0.5]]}).to_string())
        .create_async()
        .await;

    let resp = gw
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/surface/psi-surface?gmin=0&gmax=3&n=60")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    upstream.assert_async().await;
}

#[tokio::test]
async fn presign_rewrites_url_onto_public_base() {
    let mut gw = gateway_with(10, Some("https://storage.example.com".to_string())).await;
    gw.upstream
        .mock("POST", "/api/v1/uploads/presign")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"url": "http://minio:9000/bucket/big.h5?X-Amz-Signature=abc", "key": "bucket/big.h5"})
                .to_string(),
        )
        .create_async()
        .await;

    let resp = gw
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/uploads/presign")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"name": "big.h5", "content_type": "application/x-hdf"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = json_of(resp).await;
    assert_eq!(
        json["url"],
        json!("https://storage.example.com/bucket/big.h5?X-Amz-Signature=abc")
    );
    assert_eq!(json["key"], json!("bucket/big.h5"));
}

#[tokio::test]
async fn root_reports_service_banner() {
    let gw = gateway_with(10, None).await;
    let resp = gw
        .app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = json_of(resp).await;
    assert_eq!(json["service"], json!("phase45-gateway"));
}

#[tokio::test]
async fn empty_origin_list_allows_any_origin() {
    let mut gw = gateway_with(10, None).await;
    gw.upstream
        .mock("GET", "/api/v1/health")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{}")
        .create_async()
        .await;

    let resp = gw
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .header(header::ORIGIN, "http://anywhere.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}
