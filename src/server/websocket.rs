// WebSocket fan-out of device events to connected observers

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::notifications::{DeviceEvent, EventSink, ProtocolMessage};
use async_trait::async_trait;

const HEARTBEAT_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);

/// Connected observer entry
#[derive(Debug)]
pub struct ObserverConnection {
    pub tx: tokio::sync::mpsc::UnboundedSender<Message>,
    pub connected_at: chrono::DateTime<chrono::Utc>,
}

/// Shared WebSocket state
#[derive(Clone, Default)]
pub struct WebSocketState {
    /// Connection id → observer
    pub observers: Arc<RwLock<HashMap<u64, ObserverConnection>>>,
    next_id: Arc<AtomicU64>,
}

impl WebSocketState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer queue and return its connection id.
    pub async fn register(&self, tx: tokio::sync::mpsc::UnboundedSender<Message>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let conn = ObserverConnection {
            tx,
            connected_at: chrono::Utc::now(),
        };
        self.observers.write().await.insert(id, conn);
        id
    }

    pub async fn unregister(&self, id: u64) {
        self.observers.write().await.remove(&id);
    }

    pub async fn observer_count(&self) -> usize {
        self.observers.read().await.len()
    }

    /// Queue a text frame for every observer. Never waits on socket I/O.
    pub async fn broadcast(&self, message: &str) {
        let connections = self.observers.read().await;
        for conn in connections.values() {
            let _ = conn.tx.send(Message::Text(message.to_string()));
        }
    }
}

#[async_trait]
impl EventSink for WebSocketState {
    async fn publish(&self, event: &DeviceEvent) {
        let json = match event.to_message().to_json() {
            Ok(j) => j,
            Err(e) => {
                tracing::warn!(error = %e, event = event.name(), "Failed to serialize device event");
                return;
            },
        };

        self.broadcast(&json).await;
        tracing::debug!(
            event = event.name(),
            device_id = event.device().id,
            "Device event broadcast"
        );
    }
}

#[derive(Debug, Serialize)]
struct InitPayload {
    connection_id: u64,
    connected_at: String,
}

#[derive(Debug, Serialize)]
struct EmptyPayload {}

fn frame<T: Serialize>(message_type: &str, payload: T) -> Option<Message> {
    ProtocolMessage::new(message_type, payload)
        .to_json()
        .ok()
        .map(Message::Text)
}

/// Handle observer WebSocket connections
pub async fn handle_observer_websocket(
    ws: WebSocketUpgrade,
    State(state): State<WebSocketState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_observer_socket(socket, state))
}

async fn handle_observer_socket(socket: WebSocket, state: WebSocketState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    // Forward queued frames to the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let conn_id = state.register(tx.clone()).await;

    if let Some(init) = frame(
        "init",
        InitPayload {
            connection_id: conn_id,
            connected_at: chrono::Utc::now().to_rfc3339(),
        },
    ) {
        let _ = tx.send(init);
    }

    tracing::info!(connection_id = conn_id, "Observer connected");

    let heartbeat_tx = tx.clone();
    let mut heartbeat_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let Some(ping) = frame("ping", EmptyPayload {}) else {
                continue;
            };
            if heartbeat_tx.send(ping).is_err() {
                break;
            }
            tracing::trace!("Sent heartbeat ping to observer");
        }
    });

    // Observers only listen; incoming frames are drained until close
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    tracing::trace!("Received from observer: {}", text);
                },
                Message::Close(_) => {
                    break;
                },
                _ => {},
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
            heartbeat_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
            heartbeat_task.abort();
        }
        _ = (&mut heartbeat_task) => {
            send_task.abort();
            recv_task.abort();
        }
    }

    state.unregister(conn_id).await;
    tracing::info!(connection_id = conn_id, "Observer disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Device, DeviceStatus};

    fn device() -> Device {
        Device {
            id: 1,
            name: "Router".to_string(),
            mac: "AA:BB:CC:DD:EE:FF".to_string(),
            status: DeviceStatus::Active,
            created_at: chrono::Utc::now(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_every_observer() {
        let state = WebSocketState::new();
        let (tx1, mut rx1) = tokio::sync::mpsc::unbounded_channel();
        let (tx2, mut rx2) = tokio::sync::mpsc::unbounded_channel();
        state.register(tx1).await;
        state.register(tx2).await;

        state.publish(&DeviceEvent::Created(device())).await;

        for rx in [&mut rx1, &mut rx2] {
            let Some(Message::Text(text)) = rx.recv().await else {
                panic!("expected a text frame");
            };
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(value["type"], "device:created");
            assert_eq!(value["payload"]["mac"], "AA:BB:CC:DD:EE:FF");
        }
    }

    #[tokio::test]
    async fn test_publish_without_observers_is_noop() {
        let state = WebSocketState::new();
        state.publish(&DeviceEvent::StatusChanged(device())).await;
        assert_eq!(state.observer_count().await, 0);
    }

    #[tokio::test]
    async fn test_closed_observer_does_not_block_others() {
        let state = WebSocketState::new();
        let (dead_tx, dead_rx) = tokio::sync::mpsc::unbounded_channel();
        let (live_tx, mut live_rx) = tokio::sync::mpsc::unbounded_channel();
        state.register(dead_tx).await;
        state.register(live_tx).await;
        drop(dead_rx);

        state.publish(&DeviceEvent::Created(device())).await;

        assert!(matches!(live_rx.recv().await, Some(Message::Text(_))));
    }

    #[tokio::test]
    async fn test_unregister_removes_observer() {
        let state = WebSocketState::new();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let id = state.register(tx).await;
        assert_eq!(state.observer_count().await, 1);

        state.unregister(id).await;
        assert_eq!(state.observer_count().await, 0);
    }
}
