//! Change notifications for connected observers.
//!
//! The device service publishes [`DeviceEvent`]s through an [`EventSink`];
//! the sink decides how (and whether) they reach anyone. The WebSocket hub in
//! `server::websocket` is the production sink.

use crate::db::models::Device;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "1.0";

pub const DEVICE_CREATED: &str = "device:created";
pub const DEVICE_STATUS: &str = "device:status";

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    Created(Device),
    StatusChanged(Device),
}

impl DeviceEvent {
    /// Event name as seen by observers.
    pub fn name(&self) -> &'static str {
        match self {
            DeviceEvent::Created(_) => DEVICE_CREATED,
            DeviceEvent::StatusChanged(_) => DEVICE_STATUS,
        }
    }

    pub fn device(&self) -> &Device {
        match self {
            DeviceEvent::Created(device) | DeviceEvent::StatusChanged(device) => device,
        }
    }

    pub fn to_message(&self) -> ProtocolMessage<&Device> {
        ProtocolMessage::new(self.name(), self.device())
    }
}

/// Fan-out target for device events.
///
/// Delivery is best effort: implementations must not block on slow
/// observers and have no way to report failure back to the publisher.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: &DeviceEvent);
}

/// Wire envelope for every frame pushed to observers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolMessage<T> {
    pub version: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub payload: T,
    pub timestamp: String,
}

impl<T: Serialize> ProtocolMessage<T> {
    pub fn new(message_type: impl Into<String>, payload: T) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            message_type: message_type.into(),
            payload,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
