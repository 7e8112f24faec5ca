//! Domain models for Paisa

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Where a raw event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// Bank / UPI SMS broadcast
    Sms,
    /// Payment app push notification
    PushNotification,
    /// Typed in by the user
    ManualEntry,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::PushNotification => "notification",
            Self::ManualEntry => "manual",
        }
    }
}

impl std::str::FromStr for EventSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sms" => Ok(Self::Sms),
            "notification" | "push" | "push_notification" => Ok(Self::PushNotification),
            "manual" | "manual_entry" => Ok(Self::ManualEntry),
            _ => Err(format!("Unknown event source: {}", s)),
        }
    }
}

impl std::fmt::Display for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Free-form financial text delivered by an event source
///
/// Consumed once by the pipeline and discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub source: EventSource,
    pub text: String,
    /// SMS sender id or notification package name
    pub sender: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl RawEvent {
    pub fn sms(text: &str, sender: &str, received_at: DateTime<Utc>) -> Self {
        Self {
            source: EventSource::Sms,
            text: text.to_string(),
            sender: Some(sender.to_string()),
            received_at,
        }
    }

    /// Notification title and body are joined with a single space
    pub fn notification(
        package: &str,
        title: &str,
        body: &str,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source: EventSource::PushNotification,
            text: format!("{} {}", title, body),
            sender: Some(package.to_string()),
            received_at,
        }
    }

    pub fn manual(text: &str, received_at: DateTime<Utc>) -> Self {
        Self {
            source: EventSource::ManualEntry,
            text: text.to_string(),
            sender: None,
            received_at,
        }
    }
}

/// Money flow direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Debit,
    Credit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The closed category set the AI fallback may answer with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Food,
    Transport,
    Shopping,
    Health,
    Bills,
    Entertainment,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Self::Food,
        Self::Transport,
        Self::Shopping,
        Self::Health,
        Self::Bills,
        Self::Entertainment,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "Food",
            Self::Transport => "Transport",
            Self::Shopping => "Shopping",
            Self::Health => "Health",
            Self::Bills => "Bills",
            Self::Entertainment => "Entertainment",
            Self::Other => "Other",
        }
    }

    /// Case- and whitespace-insensitive match against the closed set,
    /// anything unrecognized becomes `Other`
    pub fn normalize(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().to_lowercase() == label)
            .unwrap_or(Self::Other)
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().to_lowercase() == trimmed)
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured transaction produced by the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTransaction {
    /// Zero means the amount could not be determined
    pub amount: Decimal,
    pub direction: Direction,
    pub merchant: String,
    pub category: String,
    pub note: String,
    pub timestamp: DateTime<Utc>,
}

/// A persisted expense document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredExpense {
    pub id: String,
    pub amount: Decimal,
    pub category: String,
    pub note: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-category average daily spend, computed out of band
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselineStats {
    pub category_averages: HashMap<String, Decimal>,
}

impl BaselineStats {
    pub fn average_for(&self, category: &str) -> Option<Decimal> {
        self.category_averages.get(category).copied()
    }
}

/// Kind of same-day spike
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    AmountSpike,
    FrequencySpike,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AmountSpike => "amount_spike",
            Self::FrequencySpike => "frequency_spike",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::AmountSpike => "Amount Spike",
            Self::FrequencySpike => "Frequency Spike",
        }
    }
}

impl std::str::FromStr for AlertType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace(' ', "_").as_str() {
            "amount_spike" => Ok(Self::AmountSpike),
            "frequency_spike" => Ok(Self::FrequencySpike),
            _ => Err(format!("Unknown alert type: {}", s)),
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One alert per (user, category), overwritten on each trigger
///
/// Stale once its timestamp falls on an earlier calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub category: String,
    pub alert_type: AlertType,
    pub amount: Decimal,
    pub count: u32,
    pub timestamp: DateTime<Utc>,
}

/// One push from an expense subscription
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseChange {
    pub added_or_changed: Vec<StoredExpense>,
    /// Keys of expenses that no longer exist
    pub removed: Vec<String>,
}

impl ExpenseChange {
    pub fn is_empty(&self) -> bool {
        self.added_or_changed.is_empty() && self.removed.is_empty()
    }
}
