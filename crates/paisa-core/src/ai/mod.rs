//! Pluggable AI classifier abstraction
//!
//! The classifier's last layer and the monthly insight both go through
//! [`AIBackend`]. The core never implements a model, it only calls one.
//!
//! # Architecture
//!
//! - `AIBackend` trait: the interface every backend implements
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backends: `OllamaBackend`, `EndpointBackend`, `MockBackend`
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: ollama, endpoint, mock. Default: endpoint if
//!   `PAISA_AI_ENDPOINT` is set, else ollama
//! - `OLLAMA_HOST`, `OLLAMA_MODEL` (default llama3.2)
//! - `PAISA_AI_ENDPOINT`, `PAISA_INSIGHT_ENDPOINT`, `PAISA_AI_TOKEN`

mod endpoint;
mod mock;
mod ollama;
pub mod parsing;
pub mod types;

pub use endpoint::EndpointBackend;
pub use mock::MockBackend;
pub use ollama::OllamaBackend;
pub use types::*;

use async_trait::async_trait;

use crate::error::Result;

/// Trait defining the interface for all AI backends
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Pick a category (and read an amount) from free text
    async fn classify_expense(&self, text: &str) -> Result<ExpenseClassification>;

    /// Short spending advice for a month summary
    async fn generate_insight(&self, request: &InsightRequest) -> Result<String>;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Model name (for logging)
    fn model(&self) -> &str;

    /// Host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
#[derive(Clone)]
pub enum AIClient {
    /// Ollama `/api/generate`
    Ollama(OllamaBackend),
    /// Hosted `{prompt}` -> `{amount, category}` function
    Endpoint(EndpointBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from environment variables
    ///
    /// Returns None if the selected backend is missing its required variables.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("AI_BACKEND").unwrap_or_else(|_| {
            if std::env::var("PAISA_AI_ENDPOINT").is_ok() {
                "endpoint".to_string()
            } else {
                "ollama".to_string()
            }
        });

        match backend.to_lowercase().as_str() {
            "ollama" => OllamaBackend::from_env().map(AIClient::Ollama),
            "endpoint" | "http" | "function" => EndpointBackend::from_env().map(AIClient::Endpoint),
            "mock" => Some(AIClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to ollama");
                OllamaBackend::from_env().map(AIClient::Ollama)
            }
        }
    }

    pub fn ollama(host: &str, model: &str) -> Self {
        AIClient::Ollama(OllamaBackend::new(host, model))
    }

    pub fn endpoint(url: &str) -> Self {
        AIClient::Endpoint(EndpointBackend::new(url))
    }

    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            AIClient::Ollama(_) => "ollama",
            AIClient::Endpoint(_) => "endpoint",
            AIClient::Mock(_) => "mock",
        }
    }
}

#[async_trait]
impl AIBackend for AIClient {
    async fn classify_expense(&self, text: &str) -> Result<ExpenseClassification> {
        match self {
            AIClient::Ollama(b) => b.classify_expense(text).await,
            AIClient::Endpoint(b) => b.classify_expense(text).await,
            AIClient::Mock(b) => b.classify_expense(text).await,
        }
    }

    async fn generate_insight(&self, request: &InsightRequest) -> Result<String> {
        match self {
            AIClient::Ollama(b) => b.generate_insight(request).await,
            AIClient::Endpoint(b) => b.generate_insight(request).await,
            AIClient::Mock(b) => b.generate_insight(request).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::Ollama(b) => b.health_check().await,
            AIClient::Endpoint(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.model(),
            AIClient::Endpoint(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.host(),
            AIClient::Endpoint(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}
