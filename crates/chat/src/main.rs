//! Chat realtime service.
//!
//! Terminates authenticated WebSocket sessions, owns room subscriptions and
//! presence, and persists rooms/messages through the store.

use std::net::SocketAddr;
use std::sync::Arc;

use huddle_chat::engine::ChatEngine;
use huddle_chat::state::ChatState;
use huddle_config::Settings;
use huddle_services::auth::JwtVerifier;
use huddle_services::store::MongoChatStore;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    huddle_config::init_tracing("huddle_chat");

    let settings = Settings::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(port = settings.chat.port, "Starting chat service");

    let client = mongodb::Client::with_uri_str(&settings.mongo.url).await?;
    let db = client.database(&settings.mongo.database);
    if let Err(e) = huddle_db::indexes::ensure_indexes(&db).await {
        // List paths fall back to unordered queries, so start anyway.
        warn!(error = %e, "Failed to ensure indexes");
    }

    let store = Arc::new(MongoChatStore::new(&db));
    let verifier = Arc::new(JwtVerifier::new(&settings.auth.jwt_secret));

    let state = ChatState {
        engine: Arc::new(ChatEngine::new(store)),
        verifier,
        settings: Arc::new(settings.clone()),
    };

    let app = huddle_chat::build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.chat.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Chat service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Chat service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
