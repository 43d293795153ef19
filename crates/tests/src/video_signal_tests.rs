use crate::fixtures::test_app::VideoApp;
use crate::fixtures::ws_client::WsClient;
use serde_json::json;
use std::time::Duration;

async fn room_with_host(app: &VideoApp, host: &str) -> (WsClient, String) {
    let mut client = app.connect(host).await;
    client
        .send(json!({ "type": "video:room:create", "data": { "name": "Call" } }))
        .await;
    let room_id = client.recv_type("video:room:created").await["data"]["room"]["id"]
        .as_str()
        .unwrap()
        .to_string();
    (client, room_id)
}

async fn join(app: &VideoApp, user: &str, room_id: &str) -> WsClient {
    let mut client = app.connect(user).await;
    client
        .send(json!({ "type": "video:room:join", "data": { "roomId": room_id } }))
        .await;
    client.recv_type("video:room:joined").await;
    client
}

/// Scenario: targeted offer reaches exactly the target, enriched with the
/// sender's media state.
#[tokio::test]
async fn targeted_offer_reaches_only_the_target() {
    let app = VideoApp::spawn(&["u1", "u2", "u3"]).await;
    let (mut u1, room_id) = room_with_host(&app, "u1").await;
    let mut u2 = join(&app, "u2", &room_id).await;
    u1.recv_type("video:user:joined").await;
    let mut u3 = join(&app, "u3", &room_id).await;
    u1.recv_type("video:user:joined").await;
    u2.recv_type("video:user:joined").await;

    u1.send(json!({
        "type": "video:signal",
        "data": {
            "kind": "offer",
            "roomId": room_id,
            "targetUserId": "u2",
            "payload": { "sdp": "v=0 o=- 46117 2 IN IP4 127.0.0.1" }
        }
    }))
    .await;

    let signal = u2.recv_type("video:signal").await;
    assert_eq!(signal["data"]["fromUserId"], "u1");
    assert_eq!(signal["data"]["kind"], "offer");
    assert_eq!(
        signal["data"]["payload"]["sdp"],
        "v=0 o=- 46117 2 IN IP4 127.0.0.1"
    );
    assert_eq!(signal["data"]["metadata"]["streamType"], "camera");
    assert_eq!(signal["data"]["metadata"]["audioEnabled"], true);

    u3.expect_no_event("video:signal", Duration::from_millis(300))
        .await;
    u1.expect_no_event("video:signal", Duration::from_millis(300))
        .await;
}

#[tokio::test]
async fn ice_candidates_broadcast_to_everyone_but_the_sender() {
    let app = VideoApp::spawn(&["u1", "u2", "u3"]).await;
    let (mut u1, room_id) = room_with_host(&app, "u1").await;
    let mut u2 = join(&app, "u2", &room_id).await;
    u1.recv_type("video:user:joined").await;
    let mut u3 = join(&app, "u3", &room_id).await;
    u1.recv_type("video:user:joined").await;
    u2.recv_type("video:user:joined").await;

    u1.send(json!({
        "type": "video:signal",
        "data": {
            "kind": "ice-candidate",
            "roomId": room_id,
            "payload": { "candidate": "candidate:1 1 UDP 2122 192.0.2.1 54400 typ host", "sdpMLineIndex": 0, "sdpMid": "0" }
        }
    }))
    .await;

    for peer in [&mut u2, &mut u3] {
        let signal = peer.recv_type("video:signal").await;
        assert_eq!(signal["data"]["kind"], "ice-candidate");
        assert_eq!(signal["data"]["fromUserId"], "u1");
    }
    u1.expect_no_event("video:signal", Duration::from_millis(300))
        .await;
}

#[tokio::test]
async fn signal_validation_rejects_bad_input() {
    let app = VideoApp::spawn(&["u1", "u2"]).await;
    let (mut u1, room_id) = room_with_host(&app, "u1").await;

    // Unknown kind.
    u1.send(json!({
        "type": "video:signal",
        "data": { "kind": "renegotiate", "roomId": room_id, "payload": { "sdp": "x" } }
    }))
    .await;
    assert_eq!(
        u1.recv_type("error").await["data"]["code"],
        "INVALID_SIGNAL_TYPE"
    );

    // Missing payload.
    u1.send(json!({
        "type": "video:signal",
        "data": { "kind": "offer", "roomId": room_id, "targetUserId": "u2" }
    }))
    .await;
    assert_eq!(
        u1.recv_type("error").await["data"]["code"],
        "MISSING_SIGNAL_DATA"
    );

    // Structurally bad payload.
    u1.send(json!({
        "type": "video:signal",
        "data": { "kind": "offer", "roomId": room_id, "targetUserId": "u2", "payload": { "sdp": "" } }
    }))
    .await;
    assert_eq!(
        u1.recv_type("error").await["data"]["code"],
        "INVALID_SIGNAL_STRUCTURE"
    );

    // Offer with no target.
    u1.send(json!({
        "type": "video:signal",
        "data": { "kind": "offer", "roomId": room_id, "payload": { "sdp": "v=0" } }
    }))
    .await;
    assert_eq!(
        u1.recv_type("error").await["data"]["code"],
        "MUST_INCLUDE_TARGET"
    );
}

#[tokio::test]
async fn signal_authorization_checks_room_and_target() {
    let app = VideoApp::spawn(&["u1", "u2", "u3"]).await;
    let (mut u1, room_id) = room_with_host(&app, "u1").await;
    let mut u2 = join(&app, "u2", &room_id).await;
    u1.recv_type("video:user:joined").await;

    // Unknown room.
    u1.send(json!({
        "type": "video:signal",
        "data": { "kind": "ice-candidate", "roomId": "000000000000000000000000", "payload": { "candidate": "c" } }
    }))
    .await;
    assert_eq!(u1.recv_type("error").await["data"]["code"], "ROOM_NOT_FOUND");

    // Sender never joined.
    let mut outsider = app.connect("u3").await;
    outsider
        .send(json!({
            "type": "video:signal",
            "data": { "kind": "ice-candidate", "roomId": room_id, "payload": { "candidate": "c" } }
        }))
        .await;
    assert_eq!(
        outsider.recv_type("error").await["data"]["code"],
        "NOT_IN_ROOM"
    );

    // Target not in the room.
    u1.send(json!({
        "type": "video:signal",
        "data": { "kind": "offer", "roomId": room_id, "targetUserId": "u3", "payload": { "sdp": "v=0" } }
    }))
    .await;
    assert_eq!(
        u1.recv_type("error").await["data"]["code"],
        "TARGET_USER_NOT_FOUND"
    );

    // A well-addressed answer still flows.
    u2.send(json!({
        "type": "video:signal",
        "data": { "kind": "answer", "roomId": room_id, "targetUserId": "u1", "payload": { "sdp": "v=0 answer" } }
    }))
    .await;
    let signal = u1.recv_type("video:signal").await;
    assert_eq!(signal["data"]["kind"], "answer");
}

/// Scenario: screen-share toggle announces state, requests renegotiation,
/// and flips the stream type on subsequent signals.
#[tokio::test]
async fn screen_share_toggle_drives_renegotiation_and_stream_type() {
    let app = VideoApp::spawn(&["u1", "u2"]).await;
    let (mut u1, room_id) = room_with_host(&app, "u1").await;
    let mut u2 = join(&app, "u2", &room_id).await;
    u1.recv_type("video:user:joined").await;

    u1.send(json!({
        "type": "video:toggle-screen",
        "data": { "roomId": room_id, "enabled": true }
    }))
    .await;

    let toggled = u2.recv_type("video:screen:toggled").await;
    assert_eq!(toggled["data"]["userId"], "u1");
    assert_eq!(toggled["data"]["enabled"], true);
    let renegotiate = u2.recv_type("video:screen:negotiation:needed").await;
    assert_eq!(renegotiate["data"]["userId"], "u1");

    // The sender sees the toggle but not the renegotiation hint.
    u1.recv_type("video:screen:toggled").await;
    u1.expect_no_event("video:screen:negotiation:needed", Duration::from_millis(300))
        .await;

    u1.send(json!({
        "type": "video:signal",
        "data": { "kind": "offer", "roomId": room_id, "targetUserId": "u2", "payload": { "sdp": "v=0 screen" } }
    }))
    .await;
    let signal = u2.recv_type("video:signal").await;
    assert_eq!(signal["data"]["metadata"]["streamType"], "screen");
    assert_eq!(signal["data"]["metadata"]["screenSharing"], true);
}

#[tokio::test]
async fn audio_and_video_toggles_broadcast_state() {
    let app = VideoApp::spawn(&["u1", "u2"]).await;
    let (mut u1, room_id) = room_with_host(&app, "u1").await;
    let mut u2 = join(&app, "u2", &room_id).await;
    u1.recv_type("video:user:joined").await;

    u1.send(json!({
        "type": "video:toggle-audio",
        "data": { "roomId": room_id, "enabled": false }
    }))
    .await;
    let muted = u2.recv_type("video:audio:toggled").await;
    assert_eq!(muted["data"]["userId"], "u1");
    assert_eq!(muted["data"]["enabled"], false);

    u2.send(json!({
        "type": "video:toggle-video",
        "data": { "roomId": room_id, "enabled": false }
    }))
    .await;
    let camera_off = u1.recv_type("video:video:toggled").await;
    assert_eq!(camera_off["data"]["userId"], "u2");

    // Toggling in a room you never joined is refused.
    let mut outsider = app.connect_anonymous().await;
    outsider
        .send(json!({
            "type": "video:toggle-audio",
            "data": { "roomId": room_id, "enabled": false }
        }))
        .await;
    assert_eq!(
        outsider.recv_type("error").await["data"]["code"],
        "NOT_IN_ROOM"
    );
}

#[tokio::test]
async fn stream_ready_carries_type_and_id() {
    let app = VideoApp::spawn(&["u1", "u2"]).await;
    let (mut u1, room_id) = room_with_host(&app, "u1").await;
    let mut u2 = join(&app, "u2", &room_id).await;
    u1.recv_type("video:user:joined").await;

    // Explicit stream id and screen flag.
    u1.send(json!({
        "type": "video:stream:ready",
        "data": { "roomId": room_id, "streamId": "s-1", "screenSharing": true }
    }))
    .await;
    let ready = u2.recv_type("video:stream:ready").await;
    assert_eq!(ready["data"]["streamId"], "s-1");
    assert_eq!(ready["data"]["streamType"], "screen");

    // Server assigns an id when the client has none.
    u2.send(json!({
        "type": "video:stream:ready",
        "data": { "roomId": room_id }
    }))
    .await;
    let ready = u1.recv_type("video:stream:ready").await;
    assert!(!ready["data"]["streamId"].as_str().unwrap().is_empty());
    assert_eq!(ready["data"]["streamType"], "camera");
}

#[tokio::test]
async fn screen_start_and_stop_events() {
    let app = VideoApp::spawn(&["u1", "u2"]).await;
    let (mut u1, room_id) = room_with_host(&app, "u1").await;
    let mut u2 = join(&app, "u2", &room_id).await;
    u1.recv_type("video:user:joined").await;

    u1.send(json!({ "type": "video:screen:start", "data": { "roomId": room_id } }))
        .await;
    let started = u2.recv_type("video:screen:started").await;
    assert_eq!(started["data"]["userId"], "u1");
    u2.recv_type("video:screen:negotiation:needed").await;

    u1.send(json!({ "type": "video:screen:stop", "data": { "roomId": room_id } }))
        .await;
    let stopped = u2.recv_type("video:screen:stopped").await;
    assert_eq!(stopped["data"]["userId"], "u1");
}
