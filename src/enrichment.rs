//! Best-effort device descriptions from an OpenAI-compatible LLM endpoint.
//!
//! Enrichment never fails device creation: every failure mode collapses into
//! [`Description::Fallback`] carrying the reason.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default upper bound on how long creation waits for a description.
pub const DEFAULT_ENRICHMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a generated description is not available.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentFailure {
    #[error("description generation is not configured")]
    NotConfigured,

    #[error("description generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("LLM API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("LLM returned an empty description")]
    Empty,
}

/// Produces a short human-readable description for a device.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DescriptionEnricher: Send + Sync {
    async fn describe(&self, name: &str, mac: &str) -> Result<String, EnrichmentFailure>;
}

/// Outcome of an enrichment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Description {
    Generated(String),
    Fallback {
        text: String,
        reason: EnrichmentFailure,
    },
}

impl Description {
    pub fn into_text(self) -> String {
        match self {
            Description::Generated(text) => text,
            Description::Fallback { text, .. } => text,
        }
    }
}

/// Deterministic description used whenever enrichment is unavailable.
pub fn fallback_description(name: &str, mac: &str) -> String {
    format!("Device {} with MAC {}", name, mac)
}

/// Ask `enricher` for a description, bounded by `timeout`.
pub async fn enrich(
    enricher: &dyn DescriptionEnricher,
    name: &str,
    mac: &str,
    timeout: Duration,
) -> Description {
    let outcome = match tokio::time::timeout(timeout, enricher.describe(name, mac)).await {
        Ok(Ok(text)) => {
            let text = text.trim();
            if text.is_empty() {
                Err(EnrichmentFailure::Empty)
            } else {
                Ok(text.to_string())
            }
        },
        Ok(Err(failure)) => Err(failure),
        Err(_) => Err(EnrichmentFailure::Timeout(timeout)),
    };

    match outcome {
        Ok(text) => Description::Generated(text),
        Err(reason) => Description::Fallback {
            text: fallback_description(name, mac),
            reason,
        },
    }
}

/// LLM configuration resolved from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

impl LlmConfig {
    pub const ENDPOINT_ENV: &'static str = "DEVICE_REGISTRY_LLM_ENDPOINT";
    pub const API_KEY_ENV: &'static str = "DEVICE_REGISTRY_LLM_API_KEY";
    pub const MODEL_ENV: &'static str = "DEVICE_REGISTRY_LLM_MODEL";

    /// Returns Some only when endpoint, api_key and model are all set.
    pub fn from_env() -> Option<Self> {
        let endpoint = Self::resolve_field(Self::ENDPOINT_ENV)?;
        let api_key = Self::resolve_field(Self::API_KEY_ENV)?;
        let model = Self::resolve_field(Self::MODEL_ENV)?;

        Some(Self {
            endpoint,
            api_key,
            model,
        })
    }

    fn resolve_field(env_var: &str) -> Option<String> {
        std::env::var(env_var).ok().filter(|val| !val.is_empty())
    }
}

/// A chat message for the OpenAI-compatible API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// OpenAI-compatible chat completion request
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

/// OpenAI-compatible chat completion response
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// OpenAI-compatible LLM client
pub struct LlmEnricher {
    config: LlmConfig,
    client: reqwest::Client,
}

impl LlmEnricher {
    pub fn new(config: LlmConfig, request_timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self { config, client })
    }

    fn prompt(name: &str, mac: &str) -> String {
        format!(
            "Write a short, useful description for a network device named \"{}\" with MAC address \"{}\". \
             Focus on likely technical characteristics and possible uses. \
             Answer with the description only, in at most two sentences.",
            name, mac
        )
    }

    async fn chat(&self, prompt: String) -> Result<String, EnrichmentFailure> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EnrichmentFailure::Transport(format!("request timed out: {}", e))
                } else {
                    EnrichmentFailure::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "(no body)".to_string());
            return Err(EnrichmentFailure::Api { status, body });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| EnrichmentFailure::Malformed(e.to_string()))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| EnrichmentFailure::Malformed("LLM returned empty choices".to_string()))
    }
}

#[async_trait]
impl DescriptionEnricher for LlmEnricher {
    async fn describe(&self, name: &str, mac: &str) -> Result<String, EnrichmentFailure> {
        self.chat(Self::prompt(name, mac)).await
    }
}

/// Enricher used when no LLM is configured; always falls back.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledEnricher;

#[async_trait]
impl DescriptionEnricher for DisabledEnricher {
    async fn describe(&self, _name: &str, _mac: &str) -> Result<String, EnrichmentFailure> {
        Err(EnrichmentFailure::NotConfigured)
    }
}
