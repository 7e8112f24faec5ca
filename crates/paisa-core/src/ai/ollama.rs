//! Ollama backend implementation
//!
//! HTTP client for the Ollama `/api/generate` endpoint. Prompts come from the
//! prompt library so users can tune them without rebuilding.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::prompts::{PromptId, PromptLibrary};

use super::parsing::parse_expense_classification;
use super::types::{ExpenseClassification, InsightRequest};
use super::AIBackend;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Ollama backend
#[derive(Clone)]
pub struct OllamaBackend {
    http_client: Client,
    base_url: String,
    model: String,
    prompts: Arc<RwLock<PromptLibrary>>,
    request_timeout: Duration,
}

impl OllamaBackend {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self::with_prompts(base_url, model, PromptLibrary::new())
    }

    /// Create with a specific prompt library (tests use `embedded_only`)
    pub fn with_prompts(base_url: &str, model: &str, prompts: PromptLibrary) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            prompts: Arc::new(RwLock::new(prompts)),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("OLLAMA_HOST").ok()?;
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());
        Some(Self::new(&host, &model))
    }

    fn render(&self, id: PromptId, vars: &HashMap<&str, &str>) -> Result<String> {
        let mut prompts = self
            .prompts
            .write()
            .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
        Ok(prompts.get(id)?.render_user(vars))
    }

    async fn generate(&self, prompt: String) -> Result<String> {
        let request = OllamaRequest {
            model: self.model.clone(),
            prompt,
            stream: false,
        };

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .timeout(self.request_timeout)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let ollama_response: OllamaResponse = response.json().await?;
        debug!("Ollama response: {}", ollama_response.response);
        Ok(ollama_response.response)
    }
}

/// Request to Ollama API
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
}

/// Response from Ollama API
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[async_trait]
impl AIBackend for OllamaBackend {
    async fn classify_expense(&self, text: &str) -> Result<ExpenseClassification> {
        let mut vars = HashMap::new();
        vars.insert("text", text);
        let prompt = self.render(PromptId::ClassifyExpense, &vars)?;

        let response = self.generate(prompt).await?;
        parse_expense_classification(&response)
    }

    async fn generate_insight(&self, request: &InsightRequest) -> Result<String> {
        let budget = if request.budget > 0.0 {
            format!("{:.2}", request.budget)
        } else {
            String::new()
        };
        let spent = format!("{:.2}", request.spent);

        let mut vars = HashMap::new();
        vars.insert("period", "this month");
        vars.insert("lines", request.prompt.as_str());
        vars.insert("budget", budget.as_str());
        vars.insert("spent", spent.as_str());
        vars.insert("prediction", request.prediction.as_str());
        let prompt = self.render(PromptId::SpendingInsight, &vars)?;

        let reply = self.generate(prompt).await?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(Error::Ai("Ollama returned an empty insight".into()));
        }
        Ok(reply.to_string())
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
