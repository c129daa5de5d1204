//! Integration tests for the server: real WebSocket clients speaking JSON.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use loto_protocol::{ClientAction, ServerEvent};
use loto_server::LotoServerBuilder;
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port and returns the address.
async fn start_server() -> String {
    let server = LotoServerBuilder::new()
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");
    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("send");
}

async fn send_action(ws: &mut ClientWs, action: &ClientAction) {
    let text = serde_json::to_string(action).expect("encode");
    ws.send(Message::Text(text.into())).await.expect("send");
}

/// Next JSON frame from the server, or `None` on timeout or close.
async fn recv_json(ws: &mut ClientWs) -> Option<Value> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .ok()??
            .ok()?;
        match msg {
            Message::Text(text) => return serde_json::from_str(text.as_str()).ok(),
            Message::Close(_) => return None,
            _ => continue,
        }
    }
}

/// Skips frames until one of the given `type` arrives.
async fn recv_type(ws: &mut ClientWs, kind: &str) -> Value {
    loop {
        let value = recv_json(ws)
            .await
            .unwrap_or_else(|| panic!("no {kind} event"));
        if value["type"] == kind {
            return value;
        }
    }
}

async fn create_room(ws: &mut ClientWs) -> String {
    send(
        ws,
        json!({ "type": "create-room", "hostName": "Cô Ba", "ticketsPerPlayer": 2, "hostPlays": true }),
    )
    .await;
    let created = recv_type(ws, "room-created").await;
    created["code"].as_str().expect("code").to_string()
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_connect_sends_room_list() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    let first = recv_json(&mut ws).await.expect("room list");
    assert_eq!(first, json!({ "type": "room-list", "rooms": [] }));
}

#[tokio::test]
async fn test_create_room_wire_format() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    recv_type(&mut ws, "room-list").await;

    send(
        &mut ws,
        json!({ "type": "create-room", "hostName": "Cô Ba", "ticketsPerPlayer": 9, "hostPlays": true, "spinDuration": 0.2 }),
    )
    .await;
    let created = recv_type(&mut ws, "room-created").await;
    assert_eq!(created["code"].as_str().map(str::len), Some(4));
    assert_eq!(created["settings"]["ticketsPerPlayer"], 5);
    assert_eq!(created["settings"]["spinDuration"], 1.0);
    assert_eq!(created["tickets"].as_array().map(Vec::len), Some(5));

    let event: ServerEvent = serde_json::from_value(created).expect("typed event");
    assert!(matches!(event, ServerEvent::RoomCreated { .. }));

    let list = recv_type(&mut ws, "room-list").await;
    assert_eq!(list["rooms"][0]["hostName"], "Cô Ba");
    assert_eq!(list["rooms"][0]["status"], "waiting");
}

#[tokio::test]
async fn test_join_and_player_list() {
    let addr = start_server().await;
    let mut host = connect(&addr).await;
    let mut guest = connect(&addr).await;
    let code = create_room(&mut host).await;

    send(
        &mut guest,
        json!({ "type": "join-room", "code": code.to_lowercase(), "playerName": "Tư" }),
    )
    .await;
    let joined = recv_type(&mut guest, "room-joined").await;
    assert_eq!(joined["hostName"], "Cô Ba");
    assert_eq!(joined["tickets"].as_array().map(Vec::len), Some(2));

    let update = recv_type(&mut host, "player-list-updated").await;
    let names: Vec<&str> = update["players"]
        .as_array()
        .expect("players")
        .iter()
        .filter_map(|p| p["name"].as_str())
        .collect();
    assert_eq!(names, vec!["Cô Ba", "Tư"]);
}

#[tokio::test]
async fn test_malformed_frame_gets_error_and_connection_survives() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;
    recv_type(&mut ws, "room-list").await;

    ws.send(Message::Text("not json".into())).await.expect("send");
    let err = recv_type(&mut ws, "error-msg").await;
    assert!(err["message"].as_str().is_some_and(|m| !m.is_empty()));

    send_action(&mut ws, &ClientAction::ListRooms).await;
    recv_type(&mut ws, "room-list").await;
}

#[tokio::test]
async fn test_rejection_goes_to_requester_only() {
    let addr = start_server().await;
    let mut host = connect(&addr).await;
    let mut guest = connect(&addr).await;
    let code = create_room(&mut host).await;
    send(&mut guest, json!({ "type": "join-room", "code": code })).await;
    recv_type(&mut guest, "room-joined").await;
    recv_type(&mut host, "player-list-updated").await;

    send_action(&mut guest, &ClientAction::StartGame).await;
    let err = recv_type(&mut guest, "error-msg").await;
    assert_eq!(err["message"], "only the host can start-game");

    // The host hears nothing about it; the next thing it sees is its own start.
    send_action(&mut host, &ClientAction::StartGame).await;
    loop {
        let event = recv_json(&mut host).await.expect("event");
        assert_ne!(event["type"], "error-msg");
        if event["type"] == "game-started" {
            break;
        }
    }
}

#[tokio::test]
async fn test_draw_reaches_everyone() {
    let addr = start_server().await;
    let mut host = connect(&addr).await;
    let mut guest = connect(&addr).await;
    let code = create_room(&mut host).await;
    send(&mut guest, json!({ "type": "join-room", "code": code })).await;
    recv_type(&mut guest, "room-joined").await;

    send_action(&mut host, &ClientAction::StartGame).await;
    recv_type(&mut guest, "game-started").await;
    send_action(&mut host, &ClientAction::DrawNumber).await;

    for ws in [&mut host, &mut guest] {
        let drawn = recv_type(ws, "number-drawn").await;
        let number = drawn["number"].as_u64().expect("number");
        assert!((1..=90).contains(&number));
        assert_eq!(drawn["drawnNumbers"], json!([number]));
        assert_eq!(drawn["remaining"], 89);
        assert_eq!(drawn["spinDuration"], 3.0);
    }
}

#[tokio::test]
async fn test_host_disconnect_closes_room_for_guest() {
    let addr = start_server().await;
    let mut host = connect(&addr).await;
    let mut guest = connect(&addr).await;
    let code = create_room(&mut host).await;
    send(&mut guest, json!({ "type": "join-room", "code": code })).await;
    recv_type(&mut guest, "room-joined").await;

    host.close(None).await.expect("close");
    drop(host);

    recv_type(&mut guest, "room-closed").await;
    let list = recv_type(&mut guest, "room-list").await;
    assert_eq!(list["rooms"], json!([]));
}
