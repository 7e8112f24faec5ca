//! Layered category classifier
//!
//! Layers are evaluated in order and the first hit wins:
//! 1. Vendor map (merchant substring)
//! 2. Keyword clusters (config-declared order)
//! 3. The user's learned keywords
//! 4. AI fallback, normalized against the closed category set
//!
//! The AI call is bounded by a timeout. A failed, timed-out or malformed AI
//! answer resolves to "Other" and keeps the locally extracted amount.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::ai::{AIBackend, AIClient, ExpenseClassification};
use crate::config::CategoryRules;
use crate::error::Error;
use crate::models::Category;

/// Which layer decided the category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationLayer {
    Vendor,
    KeywordCluster,
    Learned,
    Ai,
    /// Nothing matched and the AI was unavailable or failed
    Fallback,
}

impl ClassificationLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vendor => "vendor",
            Self::KeywordCluster => "keyword",
            Self::Learned => "learned",
            Self::Ai => "ai",
            Self::Fallback => "fallback",
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Vendor | Self::KeywordCluster | Self::Learned)
    }
}

/// A local (layers 1-3) hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMatch {
    pub category: String,
    pub layer: ClassificationLayer,
    /// The vendor key or keyword that matched
    pub matched: String,
}

/// Inputs for one classification
#[derive(Debug, Clone)]
pub struct ClassifyRequest<'a> {
    pub merchant: &'a str,
    /// Normalized text
    pub text: &'a str,
    /// Original text, sent to the AI fallback
    pub raw_text: &'a str,
    pub learned: &'a BTreeMap<String, String>,
    /// Zero when extraction found nothing
    pub local_amount: Decimal,
}

/// Final category and amount
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub category: String,
    pub amount: Decimal,
    pub layer: ClassificationLayer,
    /// The AI was called (whether or not it answered)
    pub ai_consulted: bool,
}

pub struct CategoryClassifier {
    rules: Arc<CategoryRules>,
    ai: Option<AIClient>,
    ai_timeout: Duration,
}

impl CategoryClassifier {
    pub fn new(rules: CategoryRules) -> Self {
        Self {
            rules: Arc::new(rules),
            ai: None,
            ai_timeout: Duration::from_secs(15),
        }
    }

    pub fn with_ai(mut self, ai: AIClient, timeout: Duration) -> Self {
        self.ai = Some(ai);
        self.ai_timeout = timeout;
        self
    }

    pub fn has_ai(&self) -> bool {
        self.ai.is_some()
    }

    pub fn rules(&self) -> &CategoryRules {
        &self.rules
    }

    /// Layers 1-3 only, no I/O
    pub fn classify_local(
        &self,
        merchant: &str,
        text: &str,
        learned: &BTreeMap<String, String>,
    ) -> Option<LocalMatch> {
        let haystack = format!("{} {}", text, merchant).to_lowercase();

        if let Some((key, category)) = self.rules.vendor_match(&haystack) {
            debug!(vendor = key, category, "Vendor layer hit");
            return Some(LocalMatch {
                category: category.to_string(),
                layer: ClassificationLayer::Vendor,
                matched: key.to_string(),
            });
        }

        if let Some((keyword, category)) = self.rules.cluster_match(&haystack) {
            debug!(keyword, category, "Keyword cluster hit");
            return Some(LocalMatch {
                category: category.to_string(),
                layer: ClassificationLayer::KeywordCluster,
                matched: keyword.to_string(),
            });
        }

        let learned_hit = learned
            .iter()
            .find(|(keyword, _)| !keyword.is_empty() && haystack.contains(keyword.as_str()));
        if let Some((keyword, category)) = learned_hit {
            debug!(keyword = %keyword, category = %category, "Learned keyword hit");
            return Some(LocalMatch {
                category: category.clone(),
                layer: ClassificationLayer::Learned,
                matched: keyword.clone(),
            });
        }

        debug!("No local classification layer matched");
        None
    }

    /// Full chain
    ///
    /// The AI is consulted when no local layer hits, and also when the amount
    /// is unknown; a local category always stays authoritative and the AI
    /// amount is only used to fill an unknown one.
    pub async fn classify(&self, request: &ClassifyRequest<'_>) -> Classification {
        let local = self.classify_local(request.merchant, request.text, request.learned);
        let amount_known = request.local_amount > Decimal::ZERO;

        if let Some(hit) = &local {
            if amount_known {
                return Classification {
                    category: hit.category.clone(),
                    amount: request.local_amount,
                    layer: hit.layer,
                    ai_consulted: false,
                };
            }
        }

        let remote = self.classify_remote(request.raw_text).await;
        let ai_consulted = self.ai.is_some();

        match (local, remote) {
            (Some(hit), remote) => Classification {
                category: hit.category,
                amount: remote
                    .and_then(|r| r.amount_decimal())
                    .unwrap_or(request.local_amount),
                layer: hit.layer,
                ai_consulted,
            },
            (None, Some(remote)) => {
                let category = Category::normalize(&remote.category);
                Classification {
                    category: category.as_str().to_string(),
                    amount: if amount_known {
                        request.local_amount
                    } else {
                        remote.amount_decimal().unwrap_or(request.local_amount)
                    },
                    layer: ClassificationLayer::Ai,
                    ai_consulted,
                }
            }
            (None, None) => Classification {
                category: Category::Other.as_str().to_string(),
                amount: request.local_amount,
                layer: ClassificationLayer::Fallback,
                ai_consulted,
            },
        }
    }

    /// Layer 4: None when no backend is configured or the call fails
    pub async fn classify_remote(&self, raw_text: &str) -> Option<ExpenseClassification> {
        let ai = self.ai.as_ref()?;

        let result = match tokio::time::timeout(self.ai_timeout, ai.classify_expense(raw_text)).await
        {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.ai_timeout.as_secs())),
        };

        match result {
            Ok(classification) => {
                debug!(
                    category = %classification.category,
                    amount = ?classification.amount,
                    model = ai.model(),
                    "AI classification"
                );
                Some(classification)
            }
            Err(e) => {
                warn!(error = %e, host = ai.host(), "AI classification failed, using local fallback");
                None
            }
        }
    }
}
