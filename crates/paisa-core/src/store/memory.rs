//! In-process store
//!
//! Backs tests and ephemeral CLI runs. Keys are sequential per store.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::{broadcast, RwLock};

use crate::error::Result;
use crate::models::{AlertRecord, BaselineStats, ExpenseChange, ParsedTransaction, StoredExpense};

use super::{
    ExpenseQuery, ExpenseStore, ExpenseSubscription, LearningStore, StoreEvent,
    CHANGE_CHANNEL_CAPACITY,
};

#[derive(Default)]
struct UserData {
    expenses: Vec<StoredExpense>,
    baseline: Option<BaselineStats>,
    alerts: BTreeMap<String, AlertRecord>,
    budget: Option<Decimal>,
    learned: BTreeMap<String, String>,
}

#[derive(Clone)]
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<String, UserData>>>,
    next_id: Arc<AtomicU64>,
    changes: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            changes,
        }
    }

    /// Remove an expense and notify subscribers
    pub async fn remove_expense(&self, user_id: &str, id: &str) -> bool {
        let removed = {
            let mut users = self.users.write().await;
            match users.get_mut(user_id) {
                Some(data) => {
                    let before = data.expenses.len();
                    data.expenses.retain(|e| e.id != id);
                    data.expenses.len() != before
                }
                None => false,
            }
        };
        if removed {
            self.publish(
                user_id,
                ExpenseChange {
                    added_or_changed: Vec::new(),
                    removed: vec![id.to_string()],
                },
            );
        }
        removed
    }

    fn publish(&self, user_id: &str, change: ExpenseChange) {
        // No receivers is fine
        let _ = self.changes.send(StoreEvent {
            user_id: user_id.to_string(),
            change,
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExpenseStore for MemoryStore {
    async fn add_expense(&self, user_id: &str, tx: &ParsedTransaction) -> Result<StoredExpense> {
        let expense = StoredExpense {
            id: self.next_id.fetch_add(1, Ordering::SeqCst).to_string(),
            amount: tx.amount,
            category: tx.category.clone(),
            note: tx.note.clone(),
            timestamp: tx.timestamp,
        };
        self.users
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .expenses
            .push(expense.clone());

        self.publish(
            user_id,
            ExpenseChange {
                added_or_changed: vec![expense.clone()],
                removed: Vec::new(),
            },
        );
        Ok(expense)
    }

    async fn query_expenses(
        &self,
        user_id: &str,
        query: &ExpenseQuery,
    ) -> Result<Vec<StoredExpense>> {
        let users = self.users.read().await;
        let mut found: Vec<StoredExpense> = users
            .get(user_id)
            .map(|d| d.expenses.iter().filter(|e| query.matches(e)).cloned().collect())
            .unwrap_or_default();
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = query.limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    async fn baseline(&self, user_id: &str) -> Result<Option<BaselineStats>> {
        Ok(self
            .users
            .read()
            .await
            .get(user_id)
            .and_then(|d| d.baseline.clone()))
    }

    async fn set_baseline(&self, user_id: &str, stats: &BaselineStats) -> Result<()> {
        self.users
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .baseline = Some(stats.clone());
        Ok(())
    }

    async fn alert(&self, user_id: &str, category: &str) -> Result<Option<AlertRecord>> {
        Ok(self
            .users
            .read()
            .await
            .get(user_id)
            .and_then(|d| d.alerts.get(category).cloned()))
    }

    async fn put_alert(&self, user_id: &str, alert: &AlertRecord) -> Result<()> {
        self.users
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .alerts
            .insert(alert.category.clone(), alert.clone());
        Ok(())
    }

    async fn alerts(&self, user_id: &str) -> Result<Vec<AlertRecord>> {
        Ok(self
            .users
            .read()
            .await
            .get(user_id)
            .map(|d| d.alerts.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn monthly_budget(&self, user_id: &str) -> Result<Option<Decimal>> {
        Ok(self.users.read().await.get(user_id).and_then(|d| d.budget))
    }

    async fn set_monthly_budget(&self, user_id: &str, budget: Decimal) -> Result<()> {
        self.users
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .budget = Some(budget);
        Ok(())
    }

    async fn subscribe(&self, user_id: &str) -> Result<ExpenseSubscription> {
        // Subscribe before the snapshot so nothing falls in between
        let rx = self.changes.subscribe();
        let snapshot = self
            .query_expenses(user_id, &ExpenseQuery::default())
            .await?;
        Ok(ExpenseSubscription::new(user_id, snapshot, rx))
    }
}

#[async_trait]
impl LearningStore for MemoryStore {
    async fn learned_keywords(&self, user_id: &str) -> Result<BTreeMap<String, String>> {
        Ok(self
            .users
            .read()
            .await
            .get(user_id)
            .map(|d| d.learned.clone())
            .unwrap_or_default())
    }

    async fn learn_keyword(&self, user_id: &str, keyword: &str, category: &str) -> Result<()> {
        self.users
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .learned
            .insert(keyword.trim().to_lowercase(), category.trim().to_string());
        Ok(())
    }
}
