pub mod docs;
pub mod proxy;
pub mod routes;
pub mod state;
pub mod upgrade;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use state::GatewayState;
use std::time::{SystemTime, UNIX_EPOCH};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::debug;

pub fn build_router(state: GatewayState) -> Router {
    let cors = cors_layer(&state.settings.cors_origins);

    Router::new()
        .route("/health", get(health_check))
        .route("/api-docs", get(docs::index))
        .route("/api-docs/{service}", get(docs::service))
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|o| o.parse::<axum::http::HeaderValue>().ok()),
        )
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Everything that is not served locally goes through the routing table.
async fn dispatch(State(state): State<GatewayState>, req: Request) -> Response {
    let path = req.uri().path().to_string();
    let Some((backend, upstream_path)) = routes::route_for_path(&path) else {
        debug!(path, "No route for path");
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "NOT_FOUND" })),
        )
            .into_response();
    };

    if upgrade::wants_upgrade(&req) {
        upgrade::proxy_upgrade(&state, backend, &upstream_path, req).await
    } else {
        proxy::forward(&state, backend, &upstream_path, req).await
    }
}

async fn health_check(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "gateway",
        "timestamp": now_millis(),
        "backends": {
            "auth": state.settings.gateway.auth_url,
            "chat": state.settings.gateway.chat_url,
            "video": state.settings.gateway.video_url,
        },
    }))
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
