use crate::fixtures::test_app::ChatApp;
use serde_json::json;

/// Scenario: one public room, three connected users, one message.
#[tokio::test]
async fn message_fans_out_to_every_subscriber_including_sender() {
    let app = ChatApp::spawn(&["u1", "u2", "u3"]).await;
    let mut u1 = app.connect("u1").await;
    u1.recv_type("rooms:list").await;
    let mut u2 = app.connect("u2").await;
    u2.recv_type("rooms:list").await;
    let mut u3 = app.connect("u3").await;
    u3.recv_type("rooms:list").await;

    u1.send(json!({
        "type": "room:create",
        "data": { "name": "General", "kind": "group", "visibility": "public" }
    }))
    .await;
    let created = u1.recv_type("room:created").await;
    let room_id = created["data"]["room"]["id"].as_str().unwrap().to_string();

    u2.send(json!({ "type": "room:join", "data": { "roomId": room_id } }))
        .await;
    u2.recv_type("room:joined").await;
    u3.send(json!({ "type": "room:join", "data": { "roomId": room_id } }))
        .await;
    u3.recv_type("room:joined").await;

    u2.send(json!({
        "type": "message:send",
        "data": { "roomId": room_id, "content": "hi" }
    }))
    .await;

    for client in [&mut u1, &mut u2, &mut u3] {
        let event = client.recv_type("message:new").await;
        assert_eq!(event["data"]["message"]["senderId"], "u2");
        assert_eq!(event["data"]["message"]["content"], "hi");
        assert_eq!(event["data"]["message"]["kind"], "text");
        assert_eq!(event["data"]["message"]["senderName"], "User u2");
    }

    assert_eq!(app.store.message_count(&room_id), 1);
}

#[tokio::test]
async fn non_participants_cannot_send() {
    let app = ChatApp::spawn(&["u1", "u2"]).await;
    let mut u1 = app.connect("u1").await;
    u1.recv_type("rooms:list").await;
    let mut u2 = app.connect("u2").await;
    u2.recv_type("rooms:list").await;

    u1.send(json!({
        "type": "room:create",
        "data": { "name": "General", "kind": "group", "visibility": "public" }
    }))
    .await;
    let room_id = u1.recv_type("room:created").await["data"]["room"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    u2.send(json!({
        "type": "message:send",
        "data": { "roomId": room_id, "content": "sneaky" }
    }))
    .await;
    let err = u2.recv_type("error").await;
    assert_eq!(err["data"]["code"], "NOT_PARTICIPANT");
    assert_eq!(app.store.message_count(&room_id), 0);
}

#[tokio::test]
async fn empty_content_is_a_validation_error() {
    let app = ChatApp::spawn(&["u1"]).await;
    let mut u1 = app.connect("u1").await;
    u1.recv_type("rooms:list").await;

    u1.send(json!({
        "type": "room:create",
        "data": { "name": "General", "kind": "group", "visibility": "public" }
    }))
    .await;
    let room_id = u1.recv_type("room:created").await["data"]["room"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    u1.send(json!({
        "type": "message:send",
        "data": { "roomId": room_id, "content": "   " }
    }))
    .await;
    let err = u1.recv_type("error").await;
    assert_eq!(err["data"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn history_is_chronological_and_paginates_by_cursor() {
    let app = ChatApp::spawn(&["u1"]).await;
    let mut u1 = app.connect("u1").await;
    u1.recv_type("rooms:list").await;

    u1.send(json!({
        "type": "room:create",
        "data": { "name": "General", "kind": "group", "visibility": "public" }
    }))
    .await;
    let room_id = u1.recv_type("room:created").await["data"]["room"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    for i in 1..=5 {
        u1.send(json!({
            "type": "message:send",
            "data": { "roomId": room_id, "content": format!("m{i}") }
        }))
        .await;
        u1.recv_type("message:new").await;
    }

    // Latest page, ascending within the page.
    u1.send(json!({
        "type": "messages:get",
        "data": { "roomId": room_id, "limit": 2 }
    }))
    .await;
    let page = u1.recv_type("messages:list").await;
    let messages = page["data"]["messages"].as_array().unwrap().clone();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["content"], "m4");
    assert_eq!(messages[1]["content"], "m5");

    // Resume strictly before the oldest message of that page.
    let cursor = messages[0]["id"].as_str().unwrap();
    u1.send(json!({
        "type": "messages:get",
        "data": { "roomId": room_id, "limit": 2, "before": cursor }
    }))
    .await;
    let page = u1.recv_type("messages:list").await;
    let messages = page["data"]["messages"].as_array().unwrap().clone();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["content"], "m2");
    assert_eq!(messages[1]["content"], "m3");
}

#[tokio::test]
async fn limit_zero_returns_an_empty_page() {
    let app = ChatApp::spawn(&["u1"]).await;
    let mut u1 = app.connect("u1").await;
    u1.recv_type("rooms:list").await;

    u1.send(json!({
        "type": "room:create",
        "data": { "name": "General", "kind": "group", "visibility": "public" }
    }))
    .await;
    let room_id = u1.recv_type("room:created").await["data"]["room"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    u1.send(json!({
        "type": "message:send",
        "data": { "roomId": room_id, "content": "hello" }
    }))
    .await;
    u1.recv_type("message:new").await;

    u1.send(json!({
        "type": "messages:get",
        "data": { "roomId": room_id, "limit": 0 }
    }))
    .await;
    let page = u1.recv_type("messages:list").await;
    assert!(page["data"]["messages"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn sending_updates_room_activity_ordering() {
    let app = ChatApp::spawn(&["u1", "u2"]).await;
    let mut u1 = app.connect("u1").await;
    u1.recv_type("rooms:list").await;

    u1.send(json!({
        "type": "room:create",
        "data": { "name": "First", "kind": "group", "visibility": "public" }
    }))
    .await;
    let first_id = u1.recv_type("room:created").await["data"]["room"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    u1.send(json!({
        "type": "room:create",
        "data": { "name": "Second", "kind": "group", "visibility": "public" }
    }))
    .await;
    u1.recv_type("room:created").await;

    // A message in the older room bumps it back to the top of the list.
    u1.send(json!({
        "type": "message:send",
        "data": { "roomId": first_id, "content": "bump" }
    }))
    .await;
    u1.recv_type("message:new").await;

    let mut u2 = app.connect("u2").await;
    let list = u2.recv_type("rooms:list").await;
    let rooms = list["data"]["rooms"].as_array().unwrap();
    assert_eq!(rooms[0]["name"], "First");
    assert_eq!(rooms[1]["name"], "Second");
}
