mod common;

use common::TestApp;
use futures_util::StreamExt;
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Observer = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server(app: &TestApp) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router.clone();

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    addr
}

async fn next_json(observer: &mut Observer) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), observer.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("websocket error");

        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn connect_observer(addr: SocketAddr) -> Observer {
    let (mut observer, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();

    let init = next_json(&mut observer).await;
    assert_eq!(init["type"], "init");
    assert_eq!(init["version"], "1.0");
    assert!(init["payload"]["connection_id"].is_u64());

    observer
}

#[tokio::test]
async fn test_observer_receives_created_and_status_events() {
    let app = TestApp::new().await;
    let addr = start_server(&app).await;
    let mut observer = connect_observer(addr).await;
    let client = reqwest::Client::new();

    let created: Value = client
        .post(format!("http://{}/api/devices", addr))
        .json(&serde_json::json!({ "name": "Camera", "mac": "10:20:30:40:50:60" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let event = next_json(&mut observer).await;
    assert_eq!(event["type"], "device:created");
    assert_eq!(event["payload"], created);
    assert!(event["timestamp"].is_string());

    let response = client
        .patch(format!(
            "http://{}/api/devices/{}/status",
            addr, created["id"]
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let event = next_json(&mut observer).await;
    assert_eq!(event["type"], "device:status");
    assert_eq!(event["payload"]["id"], created["id"]);
    assert_eq!(event["payload"]["status"], "INACTIVE");
}

#[tokio::test]
async fn test_every_observer_receives_the_event() {
    let app = TestApp::new().await;
    let addr = start_server(&app).await;
    let mut first = connect_observer(addr).await;
    let mut second = connect_observer(addr).await;
    assert_eq!(app.state.ws_state.observer_count().await, 2);

    app.create_device("Sensor", "10:20:30:40:50:61").await;

    for observer in [&mut first, &mut second] {
        let event = next_json(observer).await;
        assert_eq!(event["type"], "device:created");
        assert_eq!(event["payload"]["mac"], "10:20:30:40:50:61");
    }
}

#[tokio::test]
async fn test_rejected_request_broadcasts_nothing() {
    let app = TestApp::new().await;
    let addr = start_server(&app).await;
    let mut observer = connect_observer(addr).await;

    let (status, _) = app
        .post_json("/api/devices", r#"{"name":"","mac":"zz"}"#)
        .await;
    assert_eq!(status, 400);
    let (status, _) = app.patch("/api/devices/4242/status").await;
    assert_eq!(status, 404);

    // A later valid creation must be the first frame the observer sees
    app.create_device("Valid", "10:20:30:40:50:62").await;
    let event = next_json(&mut observer).await;
    assert_eq!(event["type"], "device:created");
    assert_eq!(event["payload"]["name"], "Valid");
}

#[tokio::test]
async fn test_disconnected_observer_is_unregistered() {
    let app = TestApp::new().await;
    let addr = start_server(&app).await;
    let mut observer = connect_observer(addr).await;
    assert_eq!(app.state.ws_state.observer_count().await, 1);

    observer.close(None).await.unwrap();
    drop(observer);

    let mut remaining = 1;
    for _ in 0..50 {
        remaining = app.state.ws_state.observer_count().await;
        if remaining == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(remaining, 0);

    // Broadcasting with nobody listening is a no-op
    app.create_device("Alone", "10:20:30:40:50:63").await;
}
