//! Read-only HTTP surface: room lookups for pages that render before the
//! socket connects. All responses use the `{success, data|error}` envelope.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::VideoError;
use crate::state::VideoState;
use crate::ws::views::{ParticipantView, VideoRoomView};

fn ok(data: serde_json::Value) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

fn fail(status: StatusCode, err: &VideoError) -> Response {
    (
        status,
        Json(json!({ "success": false, "error": err.code() })),
    )
        .into_response()
}

pub async fn get_room(
    State(state): State<VideoState>,
    Path(room_id): Path<String>,
) -> Response {
    match state.engine.find_room(&room_id).await {
        Ok(Some(room)) => ok(serde_json::to_value(VideoRoomView::from(&room)).unwrap_or_default()),
        Ok(None) => fail(StatusCode::NOT_FOUND, &VideoError::RoomNotFound),
        Err(e) => fail(StatusCode::SERVICE_UNAVAILABLE, &e),
    }
}

pub async fn get_participants(
    State(state): State<VideoState>,
    Path(room_id): Path<String>,
) -> Response {
    match state.engine.room_participants(&room_id).await {
        Ok(Some(participants)) => {
            let views: Vec<ParticipantView> =
                participants.iter().map(ParticipantView::from).collect();
            ok(serde_json::to_value(views).unwrap_or_default())
        }
        Ok(None) => fail(StatusCode::NOT_FOUND, &VideoError::RoomNotFound),
        Err(e) => fail(StatusCode::SERVICE_UNAVAILABLE, &e),
    }
}

pub async fn get_screen_sharing(
    State(state): State<VideoState>,
    Path((room_id, user_id)): Path<(String, String)>,
) -> Response {
    match state.engine.participant_media_state(&room_id, &user_id).await {
        Ok(Some(p)) => ok(json!({
            "userId": p.user_id,
            "screenSharing": p.screen_sharing,
            "videoEnabled": p.video_enabled,
            "audioEnabled": p.audio_enabled,
        })),
        Ok(None) => fail(StatusCode::NOT_FOUND, &VideoError::TargetUserNotFound),
        Err(e) => fail(StatusCode::SERVICE_UNAVAILABLE, &e),
    }
}
