use std::sync::Arc;

use crate::config::AppConfig;
use crate::upstream::UpstreamClient;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: AppConfig,
    pub upstream: UpstreamClient,
}

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let upstream = UpstreamClient::new(config.fastapi_url.clone(), config.fastapi_timeout)?;
        Ok(Self { config, upstream })
    }
}
