use crate::fixtures::test_app::ChatApp;
use std::time::Duration;

/// Presence across multiple sessions for one identity: online fires on the
/// first session only, offline on the last disconnect only.
#[tokio::test]
async fn presence_tracks_first_and_last_session() {
    let app = ChatApp::spawn(&["u1", "u2"]).await;

    let mut observer = app.connect("u2").await;
    observer.recv_type("rooms:list").await;

    // First session: observers see exactly one user:online.
    let s1 = app.connect("u1").await;
    let online = observer.recv_type("user:online").await;
    assert_eq!(online["data"]["userId"], "u1");

    // Second concurrent session: no repeat announcement.
    let s2 = app.connect("u1").await;
    observer
        .expect_no_event("user:online", Duration::from_millis(300))
        .await;

    // One session down, one still up: no user:offline yet.
    s1.close().await;
    observer
        .expect_no_event("user:offline", Duration::from_millis(300))
        .await;

    // Last session down: exactly one user:offline.
    s2.close().await;
    let offline = observer.recv_type("user:offline").await;
    assert_eq!(offline["data"]["userId"], "u1");
    observer
        .expect_no_event("user:offline", Duration::from_millis(300))
        .await;
}

#[tokio::test]
async fn a_session_does_not_see_its_own_online_announcement() {
    let app = ChatApp::spawn(&["u1"]).await;
    let mut u1 = app.connect("u1").await;
    u1.recv_type("rooms:list").await;
    u1.expect_no_event("user:online", Duration::from_millis(300))
        .await;
}

#[tokio::test]
async fn disconnect_stops_room_fanout_to_that_session() {
    let app = ChatApp::spawn(&["u1", "u2"]).await;
    let mut u1 = app.connect("u1").await;
    u1.recv_type("rooms:list").await;
    let mut u2 = app.connect("u2").await;
    u2.recv_type("rooms:list").await;
    u1.recv_type("user:online").await;

    u1.send(serde_json::json!({
        "type": "room:create",
        "data": { "name": "General", "kind": "group", "visibility": "public" }
    }))
    .await;
    let room_id = u1.recv_type("room:created").await["data"]["room"]["id"]
        .as_str()
        .unwrap()
        .to_string();
    u2.recv_type("room:created").await;

    u2.send(serde_json::json!({ "type": "room:join", "data": { "roomId": room_id } }))
        .await;
    u2.recv_type("room:joined").await;

    // u2 drops; a later message must still reach u1 without errors.
    u2.close().await;
    u1.recv_type("room:user-joined").await;
    u1.recv_type("user:offline").await;

    u1.send(serde_json::json!({
        "type": "message:send",
        "data": { "roomId": room_id, "content": "anyone there?" }
    }))
    .await;
    let event = u1.recv_type("message:new").await;
    assert_eq!(event["data"]["message"]["content"], "anyone there?");
}
