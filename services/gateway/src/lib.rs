pub mod config;
pub mod cors;
pub mod error;
pub mod routes_health;
pub mod routes_predict;
pub mod routes_spectro;
pub mod routes_surface;
pub mod routes_uploads;
pub mod state;
pub mod uploads;
pub mod upstream;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use state::SharedState;

pub fn app(state: SharedState) -> Router {
    let cors = cors::layer(&state.config.allowed_origins);

    let api = Router::new()
        .route("/health", get(routes_health::health))
        .route("/predict", post(routes_predict::predict_legacy))
        .route("/predict/:domain", post(routes_predict::predict))
        .route("/predict/:domain/csv", post(routes_predict::predict_csv))
        .route("/predict/:domain/from-s3", post(routes_predict::predict_from_s3))
        .route("/spectrogram_json/:domain", post(routes_spectro::spectrogram_json))
        .route("/spectrogram/:domain", post(routes_spectro::spectrogram_png))
        .route("/surface/psi-surface", get(routes_surface::psi_surface))
        .route("/uploads/presign", post(routes_uploads::presign));

    Router::new()
        .route("/", get(root))
        .nest("/api", api)
        // per-file limits are enforced while spooling uploads, with the
        // exact size in the 413 message; the framework default would trip
        // first with an opaque error
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "ok": true, "service": "phase45-gateway" }))
}
