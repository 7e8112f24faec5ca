//! AI backend request/response types
//!
//! These types are backend-agnostic and used across all AI implementations.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Result of expense classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseClassification {
    /// Amount the model read from the text, if any
    #[serde(default)]
    pub amount: Option<f64>,
    /// Raw category label, not yet normalized against the closed set
    pub category: String,
}

impl ExpenseClassification {
    /// Positive amounts only, rounded to paise
    pub fn amount_decimal(&self) -> Option<Decimal> {
        self.amount
            .filter(|a| a.is_finite() && *a > 0.0)
            .and_then(Decimal::from_f64)
            .map(|d| d.round_dp(2))
    }
}

/// Payload for the monthly insight call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRequest {
    /// One "Category: amount" line per category
    pub prompt: String,
    pub budget: f64,
    pub spent: f64,
    /// "Over budget" or "On track"
    pub prediction: String,
}

/// Endpoint reply to an insight request
#[derive(Debug, Clone, Deserialize)]
pub struct InsightReply {
    pub reply: String,
}
