//! SQL query constants for the `devices` table
//!
//! Column order matches the field order of [`crate::db::models::Device`].

pub const DEVICE_COLUMNS: &str = "id, name, mac, status, created_at, description";

/// Base SELECT query for devices. Add WHERE clauses as needed.
pub const SELECT_DEVICE_FULL: &str = const_format::formatcp!("SELECT {} FROM devices", DEVICE_COLUMNS);

pub const SELECT_DEVICE_BY_ID: &str = const_format::formatcp!("{} WHERE id = ?", SELECT_DEVICE_FULL);

pub const SELECT_DEVICE_BY_MAC: &str = const_format::formatcp!("{} WHERE mac = ?", SELECT_DEVICE_FULL);

/// Store-native order is insertion order, which is ascending id.
pub const SELECT_ALL_DEVICES: &str = const_format::formatcp!("{} ORDER BY id ASC", SELECT_DEVICE_FULL);

pub const INSERT_DEVICE: &str = r#"
    INSERT INTO devices (name, mac, status, created_at, description)
    VALUES (?, ?, ?, ?, ?)
"#;

/// Flip ACTIVE <-> INACTIVE in a single statement and return the new row.
pub const TOGGLE_DEVICE_STATUS: &str = const_format::formatcp!(
    "UPDATE devices SET status = CASE status WHEN 'ACTIVE' THEN 'INACTIVE' ELSE 'ACTIVE' END WHERE id = ? RETURNING {}",
    DEVICE_COLUMNS
);

pub const COUNT_DEVICES: &str = "SELECT COUNT(*) FROM devices";
