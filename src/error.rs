use serde::Serialize;
use thiserror::Error;

/// A single field-level validation problem reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("MAC address must be unique: {0}")]
    DuplicateMac(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(i64),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    OtherError(#[from] anyhow::Error),
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl RegistryError {
    /// Shorthand for a validation failure on a single field.
    pub fn invalid(field: &str, message: &str) -> Self {
        RegistryError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn to_error_code(&self) -> &'static str {
        match self {
            RegistryError::Validation(_) => "VALIDATION_ERROR",
            RegistryError::DuplicateMac(_) => "DUPLICATE_MAC",
            RegistryError::DeviceNotFound(_) => "DEVICE_NOT_FOUND",
            RegistryError::DatabaseError(_) => "DATABASE_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }

    /// True for errors the caller caused and can correct.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RegistryError::Validation(_)
                | RegistryError::DuplicateMac(_)
                | RegistryError::DeviceNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            RegistryError::DuplicateMac("AA:BB:CC:DD:EE:FF".into()).to_error_code(),
            "DUPLICATE_MAC"
        );
        assert_eq!(
            RegistryError::DeviceNotFound(7).to_error_code(),
            "DEVICE_NOT_FOUND"
        );
        assert_eq!(
            RegistryError::invalid("mac", "bad").to_error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            RegistryError::OtherError(anyhow::anyhow!("boom")).to_error_code(),
            "INTERNAL_ERROR"
        );
    }

    #[test]
    fn test_validation_message_lists_fields() {
        let err = RegistryError::Validation(vec![
            FieldError::new("name", "Name is required"),
            FieldError::new("mac", "Invalid MAC address format").with_value("zz"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("name: Name is required"));
        assert!(msg.contains("mac: Invalid MAC address format"));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(RegistryError::DeviceNotFound(1).is_client_error());
        assert!(!RegistryError::DatabaseError(sqlx::Error::RowNotFound).is_client_error());
    }

    #[test]
    fn test_field_error_skips_missing_value() {
        let json = serde_json::to_string(&FieldError::new("name", "too long")).unwrap();
        assert!(!json.contains("value"));
    }
}
