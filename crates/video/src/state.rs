use std::sync::Arc;

use huddle_config::Settings;
use huddle_services::auth::TokenVerifier;

use crate::engine::VideoEngine;

#[derive(Clone)]
pub struct VideoState {
    pub settings: Arc<Settings>,
    pub engine: Arc<VideoEngine>,
    pub verifier: Arc<dyn TokenVerifier>,
}
