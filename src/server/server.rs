use anyhow::{Context, Result};
use axum::{
    extract::FromRef,
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use super::models::ApiError;
use super::rate_limit::{cleanup_task, rate_limit_middleware, RateLimiter, CLEANUP_INTERVAL};
use super::websocket::{handle_observer_websocket, WebSocketState};
use crate::config::ServerConfig;
use crate::db::{create_pool, init_schema};
use crate::devices::DeviceService;
use crate::enrichment::{DescriptionEnricher, DisabledEnricher, LlmEnricher};
use crate::store::SqliteDeviceStore;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DeviceService>,
    pub ws_state: WebSocketState,
    pub rate_limiter: RateLimiter,
}

impl FromRef<AppState> for WebSocketState {
    fn from_ref(state: &AppState) -> Self {
        state.ws_state.clone()
    }
}

/// Device registry server instance
pub struct RegistryServer {
    config: ServerConfig,
}

impl RegistryServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Pick the enricher the configuration asks for.
    pub fn build_enricher(config: &ServerConfig) -> Result<Arc<dyn DescriptionEnricher>> {
        match &config.llm {
            Some(llm) => {
                tracing::info!(model = %llm.model, endpoint = %llm.endpoint, "Description generation enabled");
                let enricher = LlmEnricher::new(llm.clone(), config.enrichment_timeout)
                    .context("Failed to build LLM client")?;
                Ok(Arc::new(enricher))
            },
            None => {
                tracing::info!("Description generation not configured, using fallback descriptions");
                Ok(Arc::new(DisabledEnricher))
            },
        }
    }

    /// Run the server until Ctrl-C
    pub async fn run(self) -> Result<()> {
        let pool = create_pool(&self.config.db_path)
            .await
            .with_context(|| format!("Failed to open database {}", self.config.db_path.display()))?;
        init_schema(&pool)
            .await
            .context("Failed to initialize database schema")?;

        let ws_state = WebSocketState::new();
        let service = DeviceService::new(
            Arc::new(SqliteDeviceStore::new(pool.clone())),
            Self::build_enricher(&self.config)?,
            Arc::new(ws_state.clone()),
        )
        .with_enrichment_timeout(self.config.enrichment_timeout);

        let rate_limiter = RateLimiter::new(self.config.rate_limit);
        if self.config.rate_limit.max_requests > 0 {
            tokio::spawn(cleanup_task(rate_limiter.clone(), CLEANUP_INTERVAL));
        }

        let state = AppState {
            service: Arc::new(service),
            ws_state,
            rate_limiter,
        };

        let app = create_router(state, self.config.static_dir.clone());

        let addr = self.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;

        tracing::info!("Device registry listening on {}", addr);
        tracing::info!("Database: {}", self.config.db_path.display());

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

        pool.close().await;
        tracing::info!("Device registry stopped");

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Create the Axum router with all routes and middleware
pub fn create_router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    use super::routes;

    let api = routes::api_routes().route_layer(middleware::from_fn_with_state(
        state.rate_limiter.clone(),
        rate_limit_middleware,
    ));

    let router = Router::new()
        .nest("/api", api)
        .route("/ws", get(handle_observer_websocket));

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router.fallback(not_found_handler),
    };

    router
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PATCH])
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// 404 Not Found handler
async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError {
            code: "NOT_FOUND".to_string(),
            message: "Not found".to_string(),
            errors: None,
        }),
    )
}
