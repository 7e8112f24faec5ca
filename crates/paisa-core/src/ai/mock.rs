//! Mock backend for testing
//!
//! Returns predictable responses without a running model server. Tests can
//! pin a reply, force failures, or add latency to exercise timeouts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::types::{ExpenseClassification, InsightRequest};
use super::AIBackend;

/// Mock AI backend for testing
#[derive(Clone, Default)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    /// Fixed classification reply
    pub reply: Option<ExpenseClassification>,
    /// Every call errors
    pub fail: bool,
    /// Sleep before answering
    pub delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            ..Default::default()
        }
    }

    pub fn unhealthy() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_reply(category: &str, amount: Option<f64>) -> Self {
        Self {
            reply: Some(ExpenseClassification {
                amount,
                category: category.to_string(),
            }),
            ..Self::new()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of AI calls made so far (shared across clones)
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn begin_call(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(Error::Ai("mock backend configured to fail".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn classify_expense(&self, text: &str) -> Result<ExpenseClassification> {
        self.begin_call().await?;

        if let Some(reply) = &self.reply {
            return Ok(reply.clone());
        }

        let lower = text.to_lowercase();
        let category = match lower.as_str() {
            t if t.contains("movie") || t.contains("netflix") || t.contains("pvr") => {
                "Entertainment"
            }
            t if t.contains("pharmacy") || t.contains("clinic") => "Health",
            t if t.contains("dominos") || t.contains("cafe") => "Food",
            _ => "Other",
        };

        // First number in the text, if any
        let amount = lower
            .split(|c: char| !(c.is_ascii_digit() || c == '.'))
            .find_map(|tok| tok.trim_matches('.').parse::<f64>().ok());

        Ok(ExpenseClassification {
            amount,
            category: category.to_string(),
        })
    }

    async fn generate_insight(&self, request: &InsightRequest) -> Result<String> {
        self.begin_call().await?;
        Ok(format!(
            "{}: spent {:.2} of {:.2}.",
            request.prediction, request.spent, request.budget
        ))
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
