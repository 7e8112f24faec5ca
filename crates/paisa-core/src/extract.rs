//! Field extraction from normalized transaction text
//!
//! - [`normalize`]: lower-case and trim
//! - [`AmountExtractor`]: currency-marked amounts (any number for manual entry)
//! - [`DirectionClassifier`]: debit vs credit keywords, outgoing wins
//! - [`MerchantExtractor`]: counterparty after "paid to" / "to" / "at"
//!
//! None of these fail: a miss yields amount 0 or merchant "Unknown".

use std::str::FromStr;

use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::Result;
use crate::models::{Direction, EventSource};

/// Merchant placeholder when no anchor matched
pub const UNKNOWN_MERCHANT: &str = "Unknown";

/// Lower-case and trim raw input
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Finds the first monetary amount in normalized text
#[derive(Debug, Clone)]
pub struct AmountExtractor {
    currency: Regex,
    bare: Regex,
}

impl AmountExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            // Accepts both 1,234,567 and Indian 12,34,567 grouping
            currency: Regex::new(
                r"(?:₹|\brs\.?|\binr)\s*([0-9]+(?:,[0-9]{2,3})*(?:\.[0-9]{1,2})?)",
            )?,
            bare: Regex::new(r"\b([0-9]+(?:,[0-9]{2,3})*(?:\.[0-9]+)?)\b")?,
        })
    }

    /// Returns zero when nothing matched; zero means "amount unknown"
    pub fn extract(&self, text: &str, source: EventSource) -> Decimal {
        if let Some(amount) = first_amount(&self.currency, text) {
            return amount;
        }
        if source == EventSource::ManualEntry {
            if let Some(amount) = first_amount(&self.bare, text) {
                return amount;
            }
        }
        debug!("No amount found in text");
        Decimal::ZERO
    }
}

fn first_amount(re: &Regex, text: &str) -> Option<Decimal> {
    let token = re.captures(text)?.get(1)?.as_str().replace(',', "");
    match Decimal::from_str(&token) {
        Ok(amount) if amount >= Decimal::ZERO => Some(amount),
        Ok(_) => None,
        Err(e) => {
            debug!(token = %token, error = %e, "Amount token did not parse");
            None
        }
    }
}

/// Decides debit vs credit
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectionClassifier;

impl DirectionClassifier {
    pub const INCOMING: [&'static str; 5] =
        ["credited", "received", "refund", "cashback", "reversal"];
    pub const OUTGOING: [&'static str; 8] = [
        "debit",
        "debited",
        "spent",
        "paid",
        "purchase",
        "sent",
        "withdrawn",
        "transfer",
    ];

    /// Any outgoing keyword forces debit; no keywords at all is also debit
    pub fn classify(&self, text: &str) -> Direction {
        if Self::OUTGOING.iter().any(|kw| text.contains(kw)) {
            return Direction::Debit;
        }
        if Self::INCOMING.iter().any(|kw| text.contains(kw)) {
            return Direction::Credit;
        }
        Direction::Debit
    }
}

/// Pulls a counterparty name out of preposition patterns
#[derive(Debug, Clone, Copy, Default)]
pub struct MerchantExtractor;

impl MerchantExtractor {
    /// Tried in order; the first anchor present wins
    pub const ANCHORS: [&'static str; 3] = ["paid to ", "to ", "at "];
    const STOPS: [&'static str; 3] = [" via", " on", "."];

    pub fn extract(&self, text: &str) -> String {
        for anchor in Self::ANCHORS {
            if let Some(idx) = find_anchor(text, anchor) {
                let rest = &text[idx + anchor.len()..];
                let end = Self::STOPS
                    .iter()
                    .filter_map(|stop| rest.find(stop))
                    .min()
                    .unwrap_or(rest.len());
                let token = rest[..end]
                    .split_whitespace()
                    .next()
                    .map(|t| t.trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '!')))
                    .unwrap_or("");
                if token.is_empty() {
                    return UNKNOWN_MERCHANT.to_string();
                }
                return capitalize(token);
            }
        }
        UNKNOWN_MERCHANT.to_string()
    }
}

/// Anchor must start the text or follow whitespace ("auto " is not "to ")
fn find_anchor(text: &str, anchor: &str) -> Option<usize> {
    text.match_indices(anchor)
        .map(|(idx, _)| idx)
        .find(|&idx| idx == 0 || text[..idx].ends_with(char::is_whitespace))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
