use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Operational state of a registered device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum DeviceStatus {
    #[default]
    Active,
    Inactive,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Active => "ACTIVE",
            DeviceStatus::Inactive => "INACTIVE",
        }
    }

    /// The opposite status.
    pub fn toggled(self) -> Self {
        match self {
            DeviceStatus::Active => DeviceStatus::Inactive,
            DeviceStatus::Inactive => DeviceStatus::Active,
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub mac: String,
    pub status: DeviceStatus,
    pub created_at: DateTime<Utc>,
    pub description: Option<String>,
}

/// Row data for an insert; the store assigns `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDevice {
    pub name: String,
    pub mac: String,
    pub status: DeviceStatus,
    pub created_at: DateTime<Utc>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_toggle_round_trips() {
        assert_eq!(DeviceStatus::Active.toggled(), DeviceStatus::Inactive);
        assert_eq!(DeviceStatus::Inactive.toggled(), DeviceStatus::Active);
        assert_eq!(DeviceStatus::Active.toggled().toggled(), DeviceStatus::Active);
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&DeviceStatus::Inactive).unwrap(),
            "\"INACTIVE\""
        );
        let parsed: DeviceStatus = serde_json::from_str("\"ACTIVE\"").unwrap();
        assert_eq!(parsed, DeviceStatus::Active);
        assert_eq!(DeviceStatus::default(), DeviceStatus::Active);
    }

    #[test]
    fn test_device_serialization() {
        let device = Device {
            id: 1,
            name: "Router".to_string(),
            mac: "AA:BB:CC:DD:EE:FF".to_string(),
            status: DeviceStatus::Active,
            created_at: Utc::now(),
            description: None,
        };

        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["status"], "ACTIVE");
        assert_eq!(json["mac"], "AA:BB:CC:DD:EE:FF");
        assert!(json["description"].is_null());
    }
}
