use std::sync::Arc;

use huddle_config::Settings;
use huddle_services::auth::TokenVerifier;

use crate::engine::ChatEngine;

#[derive(Clone)]
pub struct ChatState {
    pub settings: Arc<Settings>,
    pub engine: Arc<ChatEngine>,
    pub verifier: Arc<dyn TokenVerifier>,
}
