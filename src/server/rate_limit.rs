//! Per-client request rate limiting for the HTTP API.
//!
//! Each peer address keeps a sliding window of request instants. Once a
//! client has made `max_requests` within `window`, further requests are
//! answered with 429 until the oldest one ages out.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::models::ApiError;

pub const DEFAULT_MAX_REQUESTS: u32 = 100;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(15 * 60);

/// How often idle client entries are swept.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests allowed per window. Zero disables limiting.
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: DEFAULT_WINDOW,
        }
    }
}

/// Shared limiter state, cheap to clone.
#[derive(Clone)]
pub struct RateLimiter {
    clients: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            clients: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Record a request from `client`, or refuse it if the window is full.
    pub async fn check(&self, client: &str) -> Result<(), RateLimitExceeded> {
        if self.config.max_requests == 0 {
            return Ok(());
        }

        let now = Instant::now();
        let mut clients = self.clients.lock().await;
        let history = clients.entry(client.to_string()).or_default();

        while history
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.config.window)
        {
            history.pop_front();
        }

        if history.len() >= self.config.max_requests as usize {
            let retry_after = history
                .front()
                .map(|oldest| self.config.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.config.window);
            return Err(RateLimitExceeded { retry_after });
        }

        history.push_back(now);
        Ok(())
    }

    /// Drop clients with no requests left inside the window.
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let window = self.config.window;
        self.clients.lock().await.retain(|_, history| {
            history.retain(|t| now.duration_since(*t) < window);
            !history.is_empty()
        });
    }

    pub async fn tracked_clients(&self) -> usize {
        self.clients.lock().await.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitExceeded {
    pub retry_after: Duration,
}

impl RateLimitExceeded {
    /// Whole seconds to wait, never zero.
    pub fn retry_after_secs(&self) -> u64 {
        self.retry_after.as_secs_f64().ceil().max(1.0) as u64
    }
}

impl IntoResponse for RateLimitExceeded {
    fn into_response(self) -> Response {
        (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, self.retry_after_secs().to_string())],
            Json(ApiError {
                code: "RATE_LIMITED".to_string(),
                message: "Too many requests, please try again later".to_string(),
                errors: None,
            }),
        )
            .into_response()
    }
}

/// Key requests by peer IP. Forwarded headers are not trusted here.
fn client_key(connect_info: Option<&ConnectInfo<SocketAddr>>) -> String {
    connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_key(connect_info.as_ref());

    match limiter.check(&client).await {
        Ok(()) => next.run(request).await,
        Err(e) => {
            tracing::warn!(
                client = %client,
                retry_after_secs = e.retry_after_secs(),
                path = %request.uri().path(),
                "Rate limit exceeded"
            );
            e.into_response()
        },
    }
}

/// Periodically sweep idle clients so the table does not grow unbounded.
pub async fn cleanup_task(limiter: RateLimiter, interval: Duration) {
    let mut timer = tokio::time::interval(interval);
    loop {
        timer.tick().await;
        limiter.cleanup().await;
    }
}
