//! Session/run state container.
//!
//! All client-observable state lives here, and the methods below are the only
//! mutation entry points. Derived data (stats, labels) is never stored;
//! consumers recompute it from the current rows via the `insights` crate.
//!
//! `analyzing` and `spectro_pending` are independent flags in atomics: an
//! analyze run and a spectrogram run may be in flight at once, and nothing
//! serializes them. The lock is only ever held between await points, so a
//! superseding run simply wins the last write per field.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use insights::{Domain, ResultRow};

use crate::client::{PredictApi, ProgressFn};
use crate::router::{self, UploadPolicy};
use crate::types::{RunRecord, RunStatus, SpectrogramData, UploadFile};

/// Most recent runs kept in history, newest first.
const RUN_HISTORY_CAP: usize = 50;

/// The lockable portion of the session state. Cloneable so UIs can take a
/// consistent snapshot without holding the lock.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub domain: Domain,
    pub staged: Vec<UploadFile>,
    pub rows: Vec<ResultRow>,
    pub spec: Option<SpectrogramData>,
    pub r2: Option<f64>,
    pub mae: Option<f64>,
    pub drawer_open: bool,
    pub selected: Option<ResultRow>,
    pub runs: Vec<RunRecord>,
    pub last_error: Option<String>,
}

impl SessionState {
    fn push_run(&mut self, run: RunRecord) {
        self.runs.insert(0, run);
        self.runs.truncate(RUN_HISTORY_CAP);
    }
}

pub struct SessionStore {
    policy: UploadPolicy,
    state: RwLock<SessionState>,
    analyzing: AtomicBool,
    spectro_pending: AtomicBool,
    progress: Arc<AtomicU8>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(UploadPolicy::default())
    }
}

impl SessionStore {
    pub fn new(policy: UploadPolicy) -> Self {
        Self {
            policy,
            state: RwLock::new(SessionState::default()),
            analyzing: AtomicBool::new(false),
            spectro_pending: AtomicBool::new(false),
            progress: Arc::new(AtomicU8::new(0)),
        }
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub fn analyzing(&self) -> bool {
        self.analyzing.load(Ordering::Relaxed)
    }

    pub fn spectro_pending(&self) -> bool {
        self.spectro_pending.load(Ordering::Relaxed)
    }

    /// Upload progress of the in-flight analyze run, 0..=100.
    pub fn analyze_progress(&self) -> u8 {
        self.progress.load(Ordering::Relaxed)
    }

    pub async fn set_domain(&self, domain: Domain) {
        self.state.write().await.domain = domain;
    }

    /// Append newly staged files to the queue. Existing staged files are
    /// never replaced; staging nothing changes nothing.
    pub async fn stage_files(&self, files: Vec<UploadFile>) {
        if files.is_empty() {
            return;
        }
        let mut s = self.state.write().await;
        s.staged.extend(files);
        s.last_error = None;
    }

    pub async fn clear_queue(&self) {
        let mut s = self.state.write().await;
        s.staged.clear();
        s.last_error = None;
    }

    /// Submit the staged queue for prediction.
    ///
    /// Success replaces the rows wholesale, opens the inspector on the first
    /// row and records a ready run. Failure records the normalized message as
    /// `last_error` and an error run, leaving previously displayed rows
    /// untouched. Either way the in-flight flag and progress gauge reset.
    pub async fn analyze(&self, client: &dyn PredictApi) {
        let (staged, domain) = {
            let s = self.state.read().await;
            if s.staged.is_empty() {
                return;
            }
            (s.staged.clone(), s.domain)
        };

        self.analyzing.store(true, Ordering::Relaxed);
        self.progress.store(0, Ordering::Relaxed);
        self.state.write().await.last_error = None;

        let stamp = Utc::now();
        let gauge = self.progress.clone();
        let progress: ProgressFn = Arc::new(move |pct| gauge.store(pct, Ordering::Relaxed));

        let result = router::submit(client, &self.policy, domain, &staged, progress).await;

        {
            let mut s = self.state.write().await;
            match result {
                Ok(res) => {
                    s.rows = res.results;
                    s.r2 = res.r2;
                    s.mae = res.mae;
                    s.drawer_open = !s.rows.is_empty();
                    s.selected = s.rows.first().cloned();
                    let data = s.rows.clone();
                    s.push_run(RunRecord {
                        id: Uuid::new_v4(),
                        at: stamp,
                        files: staged.len(),
                        domain,
                        status: RunStatus::Ready,
                        data: Some(data),
                        r2: res.r2,
                        mae: res.mae,
                        notes: None,
                    });
                }
                Err(err) => {
                    let message = err.human_message("Analysis failed");
                    warn!(error = %message, "analyze failed");
                    s.last_error = Some(message.clone());
                    s.push_run(RunRecord {
                        id: Uuid::new_v4(),
                        at: stamp,
                        files: staged.len(),
                        domain,
                        status: RunStatus::Error,
                        data: None,
                        r2: None,
                        mae: None,
                        notes: Some(message),
                    });
                }
            }
        }

        self.analyzing.store(false, Ordering::Relaxed);
        self.progress.store(0, Ordering::Relaxed);
    }

    /// Request a spectrogram for the first staged file.
    pub async fn spectrogram(&self, client: &dyn PredictApi) {
        let (first, domain) = {
            let s = self.state.read().await;
            let Some(first) = s.staged.first().cloned() else {
                return;
            };
            (first, s.domain)
        };

        self.spectro_pending.store(true, Ordering::Relaxed);
        self.state.write().await.last_error = None;

        match client.spectrogram_json(domain, &first).await {
            Ok(data) => self.state.write().await.spec = Some(data),
            Err(err) => {
                let message = err.human_message("Spectrogram failed");
                warn!(error = %message, "spectrogram failed");
                self.state.write().await.last_error = Some(message);
            }
        }

        self.spectro_pending.store(false, Ordering::Relaxed);
    }

    /// Export a CSV of the staged files into `dest_dir`, the client-side
    /// counterpart of the browser download. Only `last_error` changes on
    /// failure.
    pub async fn export_csv(&self, client: &dyn PredictApi, dest_dir: &Path) {
        let (staged, domain) = {
            let s = self.state.read().await;
            if s.staged.is_empty() {
                return;
            }
            (s.staged.clone(), s.domain)
        };

        let result = async {
            let blob = client.predict_csv(domain, &staged).await?;
            let path = dest_dir.join(format!("phase45_{domain}_results.csv"));
            tokio::fs::write(&path, &blob).await?;
            Ok::<_, crate::error::ApiError>(())
        }
        .await;

        if let Err(err) = result {
            let message = err.human_message("CSV export failed");
            warn!(error = %message, "csv export failed");
            self.state.write().await.last_error = Some(message);
        }
    }

    pub async fn open_drawer(&self, row: ResultRow) {
        let mut s = self.state.write().await;
        s.drawer_open = true;
        s.selected = Some(row);
    }

    pub async fn close_drawer(&self) {
        let mut s = self.state.write().await;
        s.drawer_open = false;
        s.selected = None;
    }

    /// Replay a run from history: a full snapshot replace of domain, rows and
    /// metrics, never a merge. Runs without data (failed runs) are ignored.
    pub async fn restore_run(&self, run: &RunRecord) {
        let Some(data) = run.data.as_ref().filter(|d| !d.is_empty()) else {
            return;
        };
        let mut s = self.state.write().await;
        s.domain = run.domain;
        s.rows = data.clone();
        s.r2 = run.r2;
        s.mae = run.mae;
        s.drawer_open = true;
        s.selected = data.first().cloned();
    }
}
