//! Persistence seams for the pipeline
//!
//! - [`ExpenseStore`]: per-user expenses, baseline, alerts and budget
//! - [`LearningStore`]: per-user learned keyword -> category map
//! - [`ExpenseSubscription`]: cancellable stream of expense changes
//!
//! Two implementations ship with the crate: [`MemoryStore`] and the SQLite
//! [`Database`](crate::db::Database).

mod memory;

pub use memory::MemoryStore;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tracing::warn;

use crate::error::Result;
use crate::models::{AlertRecord, BaselineStats, ExpenseChange, ParsedTransaction, StoredExpense};

/// Capacity of the change broadcast channel
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Expense query: always ordered by timestamp, newest first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseQuery {
    /// Equality filter
    pub category: Option<String>,
    /// Inclusive lower bound
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl ExpenseQuery {
    pub fn since(since: DateTime<Utc>) -> Self {
        Self {
            since: Some(since),
            ..Default::default()
        }
    }

    pub fn between(since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self {
            since: Some(since),
            until: Some(until),
            ..Default::default()
        }
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, expense: &StoredExpense) -> bool {
        self.category
            .as_deref()
            .map_or(true, |c| expense.category == c)
            && self.since.map_or(true, |s| expense.timestamp >= s)
            && self.until.map_or(true, |u| expense.timestamp < u)
    }
}

#[async_trait]
pub trait ExpenseStore: Send + Sync {
    /// Append an expense; the store assigns the key
    async fn add_expense(&self, user_id: &str, tx: &ParsedTransaction) -> Result<StoredExpense>;

    async fn query_expenses(&self, user_id: &str, query: &ExpenseQuery)
        -> Result<Vec<StoredExpense>>;

    /// None when no baseline has been computed yet
    async fn baseline(&self, user_id: &str) -> Result<Option<BaselineStats>>;

    async fn set_baseline(&self, user_id: &str, stats: &BaselineStats) -> Result<()>;

    async fn alert(&self, user_id: &str, category: &str) -> Result<Option<AlertRecord>>;

    /// Overwrite the category's alert record
    async fn put_alert(&self, user_id: &str, alert: &AlertRecord) -> Result<()>;

    async fn alerts(&self, user_id: &str) -> Result<Vec<AlertRecord>>;

    async fn monthly_budget(&self, user_id: &str) -> Result<Option<Decimal>>;

    async fn set_monthly_budget(&self, user_id: &str, budget: Decimal) -> Result<()>;

    /// Current snapshot first, then every later change for this user
    async fn subscribe(&self, user_id: &str) -> Result<ExpenseSubscription>;
}

#[async_trait]
pub trait LearningStore: Send + Sync {
    /// Keyword -> category, keywords lower-cased
    async fn learned_keywords(&self, user_id: &str) -> Result<BTreeMap<String, String>>;

    async fn learn_keyword(&self, user_id: &str, keyword: &str, category: &str) -> Result<()>;
}

/// A change broadcast by a store, tagged with its owner
#[derive(Debug, Clone)]
pub(crate) struct StoreEvent {
    pub user_id: String,
    pub change: ExpenseChange,
}

/// Cancellable stream of [`ExpenseChange`]s for one user
///
/// Dropping the subscription also cancels it.
pub struct ExpenseSubscription {
    user_id: String,
    initial: Option<ExpenseChange>,
    rx: broadcast::Receiver<StoreEvent>,
    cancelled: bool,
}

impl ExpenseSubscription {
    pub(crate) fn new(
        user_id: &str,
        snapshot: Vec<StoredExpense>,
        rx: broadcast::Receiver<StoreEvent>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            initial: Some(ExpenseChange {
                added_or_changed: snapshot,
                removed: Vec::new(),
            }),
            rx,
            cancelled: false,
        }
    }

    /// Next change, or None once cancelled or the store is gone
    pub async fn next(&mut self) -> Option<ExpenseChange> {
        if self.cancelled {
            return None;
        }
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        loop {
            match self.rx.recv().await {
                Ok(event) if event.user_id == self.user_id => return Some(event.change),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(user = %self.user_id, skipped, "Expense subscription lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.initial = None;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}
