pub mod engine;
pub mod error;
pub mod routes;
pub mod signal;
pub mod state;
pub mod ws;

use axum::{routing::get, Json, Router};
use state::VideoState;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub fn build_router(state: VideoState) -> Router {
    let cors = cors_layer(&state.settings.cors_origins);

    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(ws::handler::ws_upgrade))
        .route("/rooms/{room_id}", get(routes::get_room))
        .route("/rooms/{room_id}/participants", get(routes::get_participants))
        .route(
            "/rooms/{room_id}/participants/{user_id}/screen-sharing",
            get(routes::get_screen_sharing),
        )
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

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "video",
        "timestamp": bson::DateTime::now().timestamp_millis(),
    }))
}
