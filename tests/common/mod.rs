#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use device_registry::db::{create_pool, init_schema};
use device_registry::devices::DeviceService;
use device_registry::enrichment::{DescriptionEnricher, DisabledEnricher, EnrichmentFailure};
use device_registry::server::rate_limit::{RateLimitConfig, RateLimiter};
use device_registry::server::websocket::WebSocketState;
use device_registry::server::{create_router, AppState};
use device_registry::store::SqliteDeviceStore;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Enricher that always answers with the same text.
pub struct FixedEnricher(pub &'static str);

#[async_trait]
impl DescriptionEnricher for FixedEnricher {
    async fn describe(&self, _name: &str, _mac: &str) -> Result<String, EnrichmentFailure> {
        Ok(self.0.to_string())
    }
}

/// A fully wired application over a throwaway database.
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    _temp_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(Arc::new(DisabledEnricher), RateLimitConfig::default()).await
    }

    pub async fn with_enricher(enricher: Arc<dyn DescriptionEnricher>) -> Self {
        Self::build(enricher, RateLimitConfig::default()).await
    }

    pub async fn with_rate_limit(rate_limit: RateLimitConfig) -> Self {
        Self::build(Arc::new(DisabledEnricher), rate_limit).await
    }

    async fn build(enricher: Arc<dyn DescriptionEnricher>, rate_limit: RateLimitConfig) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let pool = create_pool(&temp_dir.path().join("devices.db"))
            .await
            .unwrap();
        init_schema(&pool).await.unwrap();

        let ws_state = WebSocketState::new();
        let service = DeviceService::new(
            Arc::new(SqliteDeviceStore::new(pool)),
            enricher,
            Arc::new(ws_state.clone()),
        );
        let state = AppState {
            service: Arc::new(service),
            ws_state,
            rate_limiter: RateLimiter::new(rate_limit),
        };

        Self {
            router: create_router(state.clone(), None),
            state,
            _temp_dir: temp_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        self.send(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn patch(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::patch(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn create_device(&self, name: &str, mac: &str) -> Value {
        let body = serde_json::json!({ "name": name, "mac": mac }).to_string();
        let (status, device) = self.post_json("/api/devices", &body).await;
        assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", device);
        device
    }
}
