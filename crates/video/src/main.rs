//! Video signaling service.
//!
//! Relays WebRTC offers/answers/ICE between session peers, tracks
//! per-participant media state, and enforces room capacity. Media itself
//! flows peer-to-peer.

use std::net::SocketAddr;
use std::sync::Arc;

use huddle_config::Settings;
use huddle_services::auth::JwtVerifier;
use huddle_services::store::{MongoChatStore, MongoVideoStore};
use huddle_video::engine::VideoEngine;
use huddle_video::state::VideoState;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    huddle_config::init_tracing("huddle_video");

    let settings = Settings::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(port = settings.video.port, "Starting video service");

    let client = mongodb::Client::with_uri_str(&settings.mongo.url).await?;
    let db = client.database(&settings.mongo.database);
    if let Err(e) = huddle_db::indexes::ensure_indexes(&db).await {
        warn!(error = %e, "Failed to ensure indexes");
    }

    let store = Arc::new(MongoVideoStore::new(&db));
    let chat_store = Arc::new(MongoChatStore::new(&db));
    let verifier = Arc::new(JwtVerifier::new(&settings.auth.jwt_secret));

    let state = VideoState {
        engine: Arc::new(VideoEngine::new(store, chat_store)),
        verifier,
        settings: Arc::new(settings.clone()),
    };

    let app = huddle_video::build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.video.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Video service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Video service shutdown complete");
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
