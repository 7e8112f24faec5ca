//! Prompt-endpoint backend
//!
//! Talks to a hosted classification function that accepts `{"prompt": ...}`
//! and answers `{"amount": number, "category": string}`. A second, optional
//! URL serves the monthly insight call and answers `{"reply": string}`.
//! Replies that are not clean JSON are still searched for a JSON object.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::prompts::{PromptId, PromptLibrary};

use super::parsing::{parse_expense_classification, parse_insight_reply};
use super::types::{ExpenseClassification, InsightRequest};
use super::AIBackend;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct EndpointBackend {
    http_client: Client,
    classify_url: String,
    insight_url: Option<String>,
    token: Option<String>,
    prompts: Arc<RwLock<PromptLibrary>>,
    request_timeout: Duration,
}

#[derive(Debug, Serialize)]
struct PromptRequest<'a> {
    prompt: &'a str,
}

impl EndpointBackend {
    pub fn new(classify_url: &str) -> Self {
        Self {
            http_client: Client::new(),
            classify_url: classify_url.to_string(),
            insight_url: None,
            token: None,
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_insight_url(mut self, url: &str) -> Self {
        self.insight_url = Some(url.to_string());
        self
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = Arc::new(RwLock::new(prompts));
        self
    }

    /// Create from environment variables
    ///
    /// Requires `PAISA_AI_ENDPOINT`; `PAISA_INSIGHT_ENDPOINT` and
    /// `PAISA_AI_TOKEN` are optional.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("PAISA_AI_ENDPOINT").ok()?;
        let mut backend = Self::new(&url);
        if let Ok(insight) = std::env::var("PAISA_INSIGHT_ENDPOINT") {
            backend = backend.with_insight_url(&insight);
        }
        if let Ok(token) = std::env::var("PAISA_AI_TOKEN") {
            backend = backend.with_token(&token);
        }
        Some(backend)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<String> {
        let response = self
            .authorized(self.http_client.post(url))
            .timeout(self.request_timeout)
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        let text = response.text().await?;
        debug!(url = %url, "Endpoint response: {}", text);
        Ok(text)
    }
}

#[async_trait]
impl AIBackend for EndpointBackend {
    async fn classify_expense(&self, text: &str) -> Result<ExpenseClassification> {
        let prompt = {
            let mut prompts = self
                .prompts
                .write()
                .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
            let mut vars = HashMap::new();
            vars.insert("text", text);
            prompts.get(PromptId::ClassifyExpense)?.render_user(&vars)
        };

        let body = self
            .post_json(&self.classify_url, &PromptRequest { prompt: &prompt })
            .await?;
        parse_expense_classification(&body)
    }

    async fn generate_insight(&self, request: &InsightRequest) -> Result<String> {
        let url = self
            .insight_url
            .as_deref()
            .ok_or_else(|| Error::Ai("No insight endpoint configured".into()))?;
        let body = self.post_json(url, request).await?;
        parse_insight_reply(&body)
    }

    async fn health_check(&self) -> bool {
        // Any HTTP answer means the function is reachable
        self.authorized(self.http_client.get(&self.classify_url))
            .send()
            .await
            .map(|resp| !resp.status().is_server_error())
            .unwrap_or(false)
    }

    fn model(&self) -> &str {
        "endpoint"
    }

    fn host(&self) -> &str {
        &self.classify_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockClassifierServer;

    fn backend(server: &MockClassifierServer, path: &str) -> EndpointBackend {
        EndpointBackend::new(&format!("{}{}", server.url(), path))
            .with_insight_url(&format!("{}/insight", server.url()))
            .with_prompts(PromptLibrary::embedded_only())
    }

    #[tokio::test]
    async fn test_classify() {
        let server = MockClassifierServer::start().await;
        let c = backend(&server, "/classify")
            .classify_expense("paid 250 for pharmacy")
            .await
            .unwrap();
        assert_eq!(c.category, "Health");
        assert_eq!(c.amount, Some(250.0));
    }

    #[tokio::test]
    async fn test_malformed_reply_is_error() {
        let server = MockClassifierServer::start().await;
        let result = backend(&server, "/garbage").classify_expense("anything").await;
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[tokio::test]
    async fn test_server_error_is_error() {
        let server = MockClassifierServer::start().await;
        let result = backend(&server, "/broken").classify_expense("anything").await;
        assert!(matches!(result, Err(Error::Http(_))));
    }

    #[tokio::test]
    async fn test_insight() {
        let server = MockClassifierServer::start().await;
        let reply = backend(&server, "/classify")
            .generate_insight(&InsightRequest {
                prompt: "Food: 300.00\n".into(),
                budget: 5000.0,
                spent: 300.0,
                prediction: "On track".into(),
            })
            .await
            .unwrap();
        assert!(reply.contains("On track"));
    }

    #[tokio::test]
    async fn test_insight_without_url() {
        let backend = EndpointBackend::new("http://127.0.0.1:1/classify");
        let request = InsightRequest {
            prompt: String::new(),
            budget: 0.0,
            spent: 0.0,
            prediction: "On track".into(),
        };
        assert!(matches!(
            backend.generate_insight(&request).await,
            Err(Error::Ai(_))
        ));
    }
}
