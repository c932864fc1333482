use std::{path::Path, sync::Arc, time::Duration};

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use shared_scheduler::server::{create_app, AppState};
use shared_scheduler::store::MemoryStore;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve() -> (AppState, String) {
    let state = AppState::new(Arc::new(MemoryStore::new())).unwrap();
    let app = create_app(state.clone(), Path::new("static"));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (state, format!("ws://{addr}/ws"))
}

async fn connect(url: &str) -> Client {
    let (ws, _) = connect_async(url).await.unwrap();
    ws
}

async fn send(ws: &mut Client, frame: Value) {
    ws.send(Message::text(frame.to_string())).await.unwrap();
}

async fn next_frame(ws: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("no frame within 5s")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

fn join(group: &str) -> Value {
    json!({ "type": "join-group", "groupId": group })
}

#[tokio::test]
async fn join_then_replace_reaches_every_member() {
    let (state, url) = serve().await;
    let mut a = connect(&url).await;
    let mut b = connect(&url).await;

    send(&mut a, join("g1")).await;
    assert_eq!(next_frame(&mut a).await, json!({ "type": "tasks-updated", "groupId": "g1", "tasks": [] }));
    send(&mut b, join("g1")).await;
    assert_eq!(next_frame(&mut b).await["tasks"], json!([]));
    assert_eq!(state.hub.member_count("g1"), 2);

    let task = json!({ "id": "x", "type": "single", "title": "taskX", "time": "09:00", "duration": 30, "date": "2025-03-10" });
    send(&mut b, json!({ "type": "update-tasks", "groupId": "g1", "tasks": [task] })).await;

    for ws in [&mut a, &mut b] {
        let frame = next_frame(ws).await;
        assert_eq!(frame["type"], "tasks-updated");
        assert_eq!(frame["tasks"][0]["id"], "x");
    }
    assert_eq!(state.hub.tasks("g1").len(), 1);
}

#[tokio::test]
async fn undecodable_frame_keeps_socket_open() {
    let (_state, url) = serve().await;
    let mut a = connect(&url).await;

    a.send(Message::text("not json")).await.unwrap();
    send(&mut a, json!({ "type": "no-such-frame" })).await;
    send(&mut a, join("g2")).await;

    let frame = next_frame(&mut a).await;
    assert_eq!(frame["groupId"], "g2");
}

#[tokio::test]
async fn closing_socket_leaves_every_group() {
    let (state, url) = serve().await;
    let mut a = connect(&url).await;

    for group in ["g1", "g2"] {
        send(&mut a, join(group)).await;
        next_frame(&mut a).await;
    }
    assert_eq!(state.hub.member_count("g1"), 1);
    assert_eq!(state.hub.member_count("g2"), 1);

    a.close(None).await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while state.hub.member_count("g1") + state.hub.member_count("g2") > 0 {
        assert!(tokio::time::Instant::now() < deadline, "client still a member after close");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
