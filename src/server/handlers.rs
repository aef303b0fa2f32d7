use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
};

use super::models::{ClientOrigin, CreateDeviceRequest, HealthResponse};
use super::server::AppState;
use crate::db::models::Device;
use crate::error::{FieldError, RegistryError};
use crate::validation::{parse_device_id, validate_create_json};
use crate::{log_device_operation, log_error};

/// Log a failed operation at the level its cause deserves.
fn log_failure(operation: &str, origin: &ClientOrigin, err: &RegistryError) {
    if err.is_client_error() {
        tracing::warn!(
            operation,
            client = %origin,
            code = err.to_error_code(),
            error = %err,
            "Request rejected"
        );
    } else {
        log_error!(err, operation, client = %origin);
    }
}

async fn create(
    state: &AppState,
    payload: Result<Json<CreateDeviceRequest>, JsonRejection>,
) -> Result<Device, RegistryError> {
    let Json(req) = payload.map_err(|rejection| {
        RegistryError::Validation(vec![FieldError::new("body", rejection.body_text())])
    })?;

    let input = validate_create_json(req.name.as_ref(), req.mac.as_ref())?;
    state.service.create(input).await
}

async fn toggle_status(state: &AppState, raw_id: &str) -> Result<Device, RegistryError> {
    let id = parse_device_id(raw_id)?;
    state.service.toggle_status(id).await
}

/// Create a new device
pub async fn create_device(
    State(state): State<AppState>,
    origin: ClientOrigin,
    payload: Result<Json<CreateDeviceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Device>), RegistryError> {
    match create(&state, payload).await {
        Ok(device) => {
            log_device_operation!("create", origin, device_id = device.id, mac = %device.mac);
            Ok((StatusCode::CREATED, Json(device)))
        },
        Err(e) => {
            log_failure("create", &origin, &e);
            Err(e)
        },
    }
}

/// List all devices
pub async fn list_devices(
    State(state): State<AppState>,
    origin: ClientOrigin,
) -> Result<Json<Vec<Device>>, RegistryError> {
    match state.service.list().await {
        Ok(devices) => {
            log_device_operation!("list", origin, count = devices.len());
            Ok(Json(devices))
        },
        Err(e) => {
            log_failure("list", &origin, &e);
            Err(e)
        },
    }
}

/// Flip a device between ACTIVE and INACTIVE
pub async fn toggle_device_status(
    State(state): State<AppState>,
    origin: ClientOrigin,
    Path(raw_id): Path<String>,
) -> Result<Json<Device>, RegistryError> {
    match toggle_status(&state, &raw_id).await {
        Ok(device) => {
            log_device_operation!(
                "toggle_status",
                origin,
                device_id = device.id,
                status = %device.status
            );
            Ok(Json(device))
        },
        Err(e) => {
            tracing::debug!(raw_id = %raw_id, "Status toggle failed");
            log_failure("toggle_status", &origin, &e);
            Err(e)
        },
    }
}

/// Health check handler
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "device-registry".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
