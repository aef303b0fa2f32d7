use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;

use crate::error::{FieldError, RegistryError};

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ApiFieldError>>,
}

/// Field-level error as it appears on the wire
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiFieldError {
    pub field: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl From<&FieldError> for ApiFieldError {
    fn from(e: &FieldError) -> Self {
        Self {
            field: e.field.clone(),
            message: e.message.clone(),
            value: e.value.clone(),
        }
    }
}

/// Create device request
///
/// Fields stay untyped so a value of the wrong JSON type is reported on its
/// own field instead of failing the whole body.
#[derive(Debug, Deserialize)]
pub struct CreateDeviceRequest {
    #[serde(default)]
    pub name: Option<serde_json::Value>,
    #[serde(default)]
    pub mac: Option<serde_json::Value>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

pub fn status_for(err: &RegistryError) -> StatusCode {
    match err {
        RegistryError::Validation(_) | RegistryError::DuplicateMac(_) => StatusCode::BAD_REQUEST,
        RegistryError::DeviceNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let status = status_for(&self);

        let body = match &self {
            RegistryError::Validation(errors) => ApiError {
                code: self.to_error_code().to_string(),
                message: "Validation failed".to_string(),
                errors: Some(errors.iter().map(ApiFieldError::from).collect()),
            },
            RegistryError::DuplicateMac(_) => ApiError {
                code: self.to_error_code().to_string(),
                message: "MAC address must be unique".to_string(),
                errors: None,
            },
            RegistryError::DeviceNotFound(_) => ApiError {
                code: self.to_error_code().to_string(),
                message: "Device not found".to_string(),
                errors: None,
            },
            // Internal detail stays in the logs
            _ => ApiError {
                code: "INTERNAL_ERROR".to_string(),
                message: "Internal server error".to_string(),
                errors: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Best-known address of the caller, for logging.
///
/// Prefers the first `X-Forwarded-For` hop, then the socket peer address.
#[derive(Debug, Clone)]
pub struct ClientOrigin(pub String);

impl fmt::Display for ClientOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for ClientOrigin
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        if let Some(addr) = forwarded {
            return Ok(ClientOrigin(addr));
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        Ok(ClientOrigin(peer))
    }
}
