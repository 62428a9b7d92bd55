//! Session walkthrough, no gateway required.
//!
//! Shows:
//! 1. Staging capture files
//! 2. An analyze run against a canned backend
//! 3. Per-row classification and the session stats behind it
//! 4. A failed run landing in history without touching the rows
//! 5. Restoring an earlier run from history

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};

use insights::{classify_row, inspector_summary, session_stats, Domain, ResultRow};
use session::{
    ApiError, PredictApi, PredictResponse, PresignedUpload, ProgressFn, PsiSurface,
    PsiSurfaceParams, SessionStore, SpectrogramData, UploadFile,
};

/// Canned backend: either answers with fixed rows or fails like a relayed
/// upstream error.
struct CannedBackend {
    rows: Vec<ResultRow>,
    fail: bool,
}

#[async_trait]
impl PredictApi for CannedBackend {
    async fn predict(
        &self,
        _domain: Domain,
        files: &[UploadFile],
        progress: ProgressFn,
    ) -> Result<PredictResponse, ApiError> {
        for i in 1..=files.len() {
            progress(((i * 100) / files.len()) as u8);
        }
        if self.fail {
            return Err(ApiError::Status {
                status: 502,
                body: json!({
                    "ok": false,
                    "error": "fastapi error",
                    "details": {"detail": "model failed"},
                }),
            });
        }
        Ok(PredictResponse {
            results: self.rows.clone(),
            r2: Some(0.91),
            mae: Some(0.03),
        })
    }

    async fn predict_csv(&self, _: Domain, _: &[UploadFile]) -> Result<Bytes, ApiError> {
        Ok(Bytes::from_static(b"name,ct\n"))
    }

    async fn spectrogram_json(
        &self,
        _: Domain,
        _: &UploadFile,
    ) -> Result<SpectrogramData, ApiError> {
        Ok(SpectrogramData::default())
    }

    async fn psi_surface(&self, _: &PsiSurfaceParams) -> Result<PsiSurface, ApiError> {
        Ok(PsiSurface::default())
    }

    async fn presign_upload(&self, name: &str, _: &str) -> Result<PresignedUpload, ApiError> {
        Ok(PresignedUpload {
            url: format!("http://storage.local/{name}"),
            key: format!("key-{name}"),
        })
    }

    async fn put_object(&self, _: &str, _: &str, _: Bytes) -> Result<(), ApiError> {
        Ok(())
    }

    async fn predict_from_keys(
        &self,
        domain: Domain,
        _: &[String],
    ) -> Result<PredictResponse, ApiError> {
        self.predict(domain, &[], std::sync::Arc::new(|_| {})).await
    }

    async fn health(&self) -> Result<Value, ApiError> {
        Ok(json!({"node": "ok"}))
    }
}

fn capture(name: &str, ct: f64, noise: f64) -> ResultRow {
    ResultRow {
        ct_pred: Some(ct),
        noise: Some(noise),
        domain: Some("audio".into()),
        ..ResultRow::named(name)
    }
}

#[tokio::main]
async fn main() {
    println!("SignalForge session walkthrough\n");

    // 1. Stage files
    println!("Step 1: stage capture files");
    let store = SessionStore::default();
    let names = [
        "hum_60hz.wav",
        "chirp.wav",
        "room_tone_a.wav",
        "room_tone_b.wav",
        "pink_noise.wav",
        "droneswarm.wav",
    ];
    store
        .stage_files(
            names
                .iter()
                .map(|n| UploadFile::new(*n, "audio/wav", Bytes::from_static(b"....")))
                .collect(),
        )
        .await;
    println!("   staged: {} files\n", store.snapshot().await.staged.len());

    // 2. Analyze against the canned backend
    println!("Step 2: analyze");
    let backend = CannedBackend {
        rows: vec![
            capture("hum_60hz.wav", 0.41, 0.12),
            capture("chirp.wav", 0.44, 0.75),
            capture("room_tone_a.wav", 0.40, 0.10),
            capture("room_tone_b.wav", 0.43, 0.15),
            capture("pink_noise.wav", 0.45, 0.55),
            capture("droneswarm.wav", 2.2, 0.30),
        ],
        fail: false,
    };
    store.analyze(&backend).await;
    let s = store.snapshot().await;
    println!(
        "   rows: {}, r2: {:?}, mae: {:?}, drawer open: {}\n",
        s.rows.len(),
        s.r2,
        s.mae,
        s.drawer_open
    );

    // 3. Classification
    println!("Step 3: classify each capture");
    for row in &s.rows {
        let c = classify_row(row, &s.rows);
        println!("   {:<16} {:?} ({})", row.name, c.label, c.reason);
    }
    let stats = session_stats(&s.rows, Some("audio"));
    println!(
        "   session: count={} mean={:.3} std={:.3} noisy={}\n",
        stats.count,
        stats.mean_ct.unwrap_or_default(),
        stats.std_ct.unwrap_or_default(),
        stats.noisy_count
    );

    if let Some(selected) = &s.selected {
        let note = inspector_summary(Some(selected), &s.rows);
        println!("   {}", note.title);
        for line in &note.lines {
            println!("     {line}");
        }
        println!();
    }

    // 4. A failed run
    println!("Step 4: a failing analyze run");
    let broken = CannedBackend { rows: vec![], fail: true };
    store.analyze(&broken).await;
    let s = store.snapshot().await;
    println!("   last error: {}", s.last_error.as_deref().unwrap_or("-"));
    println!(
        "   rows survived: {}, history: {} runs (newest status {:?})\n",
        s.rows.len(),
        s.runs.len(),
        s.runs[0].status
    );

    // 5. Restore from history
    println!("Step 5: restore the successful run");
    let ready_run = s.runs[1].clone();
    store.restore_run(&ready_run).await;
    let s = store.snapshot().await;
    println!(
        "   restored {} rows, selected: {}",
        s.rows.len(),
        s.selected.map(|r| r.name).unwrap_or_default()
    );
}
