//! Request boundary: validation and sanitization of inbound data.
//!
//! Everything here is pure. A rejected input never reaches the device
//! service, so no store access or broadcast happens for it.

use crate::error::{FieldError, RegistryError, Result};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;

pub const NAME_MIN_CHARS: usize = 1;
pub const NAME_MAX_CHARS: usize = 100;

/// Characters stripped from device names before storage.
const STRIPPED_NAME_CHARS: [char; 5] = ['<', '>', '"', '\'', '&'];

/// Six hex octets separated uniformly by `:` or by `-`.
static MAC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[0-9A-Fa-f]{2}:){5}[0-9A-Fa-f]{2}$|^(?:[0-9A-Fa-f]{2}-){5}[0-9A-Fa-f]{2}$")
        .expect("MAC pattern is valid")
});

/// A MAC address in canonical form: upper-case hex octets joined by `:`.
///
/// The only way to obtain one is [`MacAddress::parse`], so holding a value
/// means it has already passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MacAddress(String);

impl MacAddress {
    pub fn parse(raw: &str) -> Option<Self> {
        if !MAC_PATTERN.is_match(raw) {
            return None;
        }
        Some(Self(raw.to_ascii_uppercase().replace('-', ":")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A create request that has passed the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDevice {
    pub name: String,
    pub mac: MacAddress,
}

/// Trim surrounding whitespace and drop `< > " ' &`.
pub fn sanitize_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !STRIPPED_NAME_CHARS.contains(c))
        .collect()
}

fn check_name(raw: Option<&str>) -> std::result::Result<String, FieldError> {
    let Some(raw) = raw else {
        return Err(FieldError::new("name", "Name is required"));
    };

    let len = raw.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len) {
        return Err(FieldError::new(
            "name",
            format!(
                "Name must be between {} and {} characters",
                NAME_MIN_CHARS, NAME_MAX_CHARS
            ),
        )
        .with_value(raw));
    }

    let sanitized = sanitize_name(raw);
    if sanitized.is_empty() {
        return Err(
            FieldError::new("name", "Name must contain at least one valid character")
                .with_value(raw),
        );
    }

    Ok(sanitized)
}

fn check_mac(raw: Option<&str>) -> std::result::Result<MacAddress, FieldError> {
    let Some(raw) = raw else {
        return Err(FieldError::new("mac", "MAC address is required"));
    };

    MacAddress::parse(raw).ok_or_else(|| {
        FieldError::new(
            "mac",
            "Invalid MAC address format (use XX:XX:XX:XX:XX:XX or XX-XX-XX-XX-XX-XX)",
        )
        .with_value(raw)
    })
}

/// Read a JSON field that must be a string when present. `null` counts as
/// absent.
fn text_field<'a>(
    value: Option<&'a Value>,
    field: &str,
    message: &str,
) -> std::result::Result<Option<&'a str>, FieldError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(other) => Err(FieldError::new(field, message).with_value(other.to_string())),
    }
}

fn combine(
    name: std::result::Result<String, FieldError>,
    mac: std::result::Result<MacAddress, FieldError>,
) -> Result<CreateDevice> {
    match (name, mac) {
        (Ok(name), Ok(mac)) => Ok(CreateDevice { name, mac }),
        (name, mac) => {
            let errors = [name.err(), mac.err()].into_iter().flatten().collect();
            Err(RegistryError::Validation(errors))
        },
    }
}

/// Validate and normalize the fields of a create request.
///
/// Both fields are checked so the caller gets every problem at once.
pub fn validate_create(name: Option<&str>, mac: Option<&str>) -> Result<CreateDevice> {
    combine(check_name(name), check_mac(mac))
}

/// Like [`validate_create`], for fields taken straight from a JSON body.
///
/// A field of the wrong JSON type is reported on that field alongside any
/// problem with the other one.
pub fn validate_create_json(name: Option<&Value>, mac: Option<&Value>) -> Result<CreateDevice> {
    let name = text_field(name, "name", "Name must be a string").and_then(check_name);
    let mac = text_field(mac, "mac", "MAC address must be a string").and_then(check_mac);
    combine(name, mac)
}

/// Parse the `{id}` path segment of the status toggle route.
///
/// Only plain ASCII digit strings that fit in an `i64` are accepted.
pub fn parse_device_id(raw: &str) -> Result<i64> {
    let invalid = || {
        RegistryError::Validation(vec![
            FieldError::new("id", "Invalid device ID").with_value(raw)
        ])
    };

    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    raw.parse::<i64>().map_err(|_| invalid())
}
