//! Edge gateway.
//!
//! The single externally reachable endpoint: serves health and docs locally,
//! forwards identity traffic request/response, and splices upgraded duplex
//! connections through to the chat and video services.

use std::net::SocketAddr;
use std::sync::Arc;

use huddle_config::Settings;
use huddle_gateway::state::GatewayState;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    huddle_config::init_tracing("huddle_gateway");

    let settings = Settings::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        port = settings.gateway.port,
        auth = %settings.gateway.auth_url,
        chat = %settings.gateway.chat_url,
        video = %settings.gateway.video_url,
        "Starting gateway"
    );

    let state = GatewayState::new(Arc::new(settings.clone()));
    let app = huddle_gateway::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.gateway.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Gateway listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway shutdown complete");
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
