use std::sync::Arc;
use std::time::Duration;

use huddle_config::Settings;

use crate::routes::Backend;

#[derive(Clone)]
pub struct GatewayState {
    pub settings: Arc<Settings>,
    pub http: reqwest::Client,
}

impl GatewayState {
    pub fn new(settings: Arc<Settings>) -> Self {
        // No overall request timeout: long polls and streamed bodies are the
        // backend's business. Connect problems are what the gateway reports.
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self { settings, http }
    }

    pub fn backend_url(&self, backend: Backend) -> &str {
        match backend {
            Backend::Auth => &self.settings.gateway.auth_url,
            Backend::Chat => &self.settings.gateway.chat_url,
            Backend::Video => &self.settings.gateway.video_url,
        }
    }
}
