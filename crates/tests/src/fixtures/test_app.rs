//! Spawns real service instances on ephemeral ports, wired to the in-memory
//! fakes. Each test gets isolated state.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use huddle_chat::engine::ChatEngine;
use huddle_chat::state::ChatState;
use huddle_config::Settings;
use huddle_gateway::state::GatewayState;
use huddle_video::engine::VideoEngine;
use huddle_video::state::VideoState;

use super::memory_store::{InMemoryChatStore, InMemoryVideoStore};
use super::ws_client::WsClient;
use super::StaticTokenVerifier;

fn base_settings() -> Settings {
    Settings::from_vars(&HashMap::new()).expect("default settings")
}

async fn serve(app: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

pub struct ChatApp {
    pub addr: SocketAddr,
    pub store: Arc<InMemoryChatStore>,
}

impl ChatApp {
    pub async fn spawn(user_ids: &[&str]) -> Self {
        let store = Arc::new(InMemoryChatStore::new());
        let state = ChatState {
            settings: Arc::new(base_settings()),
            engine: Arc::new(ChatEngine::new(store.clone())),
            verifier: Arc::new(StaticTokenVerifier::with_users(user_ids)),
        };
        let addr = serve(huddle_chat::build_router(state)).await;
        Self { addr, store }
    }

    pub async fn connect(&self, user_id: &str) -> WsClient {
        WsClient::connect(&format!("ws://{}/ws?token=token-{user_id}", self.addr)).await
    }
}

pub struct VideoApp {
    pub addr: SocketAddr,
    pub store: Arc<InMemoryVideoStore>,
    pub chat_store: Arc<InMemoryChatStore>,
}

impl VideoApp {
    pub async fn spawn(user_ids: &[&str]) -> Self {
        let store = Arc::new(InMemoryVideoStore::new());
        let chat_store = Arc::new(InMemoryChatStore::new());
        let state = VideoState {
            settings: Arc::new(base_settings()),
            engine: Arc::new(VideoEngine::new(store.clone(), chat_store.clone())),
            verifier: Arc::new(StaticTokenVerifier::with_users(user_ids)),
        };
        let addr = serve(huddle_video::build_router(state)).await;
        Self {
            addr,
            store,
            chat_store,
        }
    }

    pub async fn connect(&self, user_id: &str) -> WsClient {
        WsClient::connect(&format!("ws://{}/ws?token=token-{user_id}", self.addr)).await
    }

    pub async fn connect_anonymous(&self) -> WsClient {
        WsClient::connect(&format!("ws://{}/ws", self.addr)).await
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

pub struct GatewayApp {
    pub addr: SocketAddr,
}

impl GatewayApp {
    /// Gateway wired to the given upstream addresses. Pass an unbound port
    /// to simulate a dead backend.
    pub async fn spawn(auth: SocketAddr, chat: SocketAddr, video: SocketAddr) -> Self {
        let vars: HashMap<String, String> = [
            ("AUTH_SERVICE_URL", format!("http://{auth}")),
            ("CHAT_SERVICE_URL", format!("http://{chat}")),
            ("VIDEO_SERVICE_URL", format!("http://{video}")),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        let settings = Settings::from_vars(&vars).expect("gateway settings");

        let state = GatewayState::new(Arc::new(settings));
        let addr = serve(huddle_gateway::build_router(state)).await;
        Self { addr }
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn ws_url(&self, path_and_query: &str) -> String {
        format!("ws://{}{path_and_query}", self.addr)
    }
}

/// A socket address nothing listens on (dead-backend simulation).
pub fn unused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    addr
}
