//! Async store adapters
//!
//! rusqlite is blocking, so every call hops onto tokio's blocking pool with
//! a cloned handle. The pipeline only ever sees the async traits.

use std::collections::BTreeMap;

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::Database;
use crate::error::{Error, Result};
use crate::models::{AlertRecord, BaselineStats, ParsedTransaction, StoredExpense};
use crate::store::{ExpenseQuery, ExpenseStore, ExpenseSubscription, LearningStore};

impl Database {
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Database) -> Result<T> + Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || f(db))
            .await
            .map_err(|e| Error::Store(format!("Blocking database task failed: {}", e)))?
    }
}

#[async_trait]
impl ExpenseStore for Database {
    async fn add_expense(&self, user_id: &str, tx: &ParsedTransaction) -> Result<StoredExpense> {
        let (user_id, tx) = (user_id.to_string(), tx.clone());
        self.blocking(move |db| db.insert_expense(&user_id, &tx)).await
    }

    async fn query_expenses(
        &self,
        user_id: &str,
        query: &ExpenseQuery,
    ) -> Result<Vec<StoredExpense>> {
        let (user_id, query) = (user_id.to_string(), query.clone());
        self.blocking(move |db| db.list_expenses(&user_id, &query)).await
    }

    async fn baseline(&self, user_id: &str) -> Result<Option<BaselineStats>> {
        let user_id = user_id.to_string();
        self.blocking(move |db| db.get_baseline(&user_id)).await
    }

    async fn set_baseline(&self, user_id: &str, stats: &BaselineStats) -> Result<()> {
        let (user_id, stats) = (user_id.to_string(), stats.clone());
        self.blocking(move |db| db.replace_baseline(&user_id, &stats)).await
    }

    async fn alert(&self, user_id: &str, category: &str) -> Result<Option<AlertRecord>> {
        let (user_id, category) = (user_id.to_string(), category.to_string());
        self.blocking(move |db| db.get_alert(&user_id, &category)).await
    }

    async fn put_alert(&self, user_id: &str, alert: &AlertRecord) -> Result<()> {
        let (user_id, alert) = (user_id.to_string(), alert.clone());
        self.blocking(move |db| db.upsert_alert(&user_id, &alert)).await
    }

    async fn alerts(&self, user_id: &str) -> Result<Vec<AlertRecord>> {
        let user_id = user_id.to_string();
        self.blocking(move |db| db.list_alerts(&user_id)).await
    }

    async fn monthly_budget(&self, user_id: &str) -> Result<Option<Decimal>> {
        let user_id = user_id.to_string();
        self.blocking(move |db| db.get_monthly_budget(&user_id)).await
    }

    async fn set_monthly_budget(&self, user_id: &str, budget: Decimal) -> Result<()> {
        let user_id = user_id.to_string();
        self.blocking(move |db| db.set_budget(&user_id, budget)).await
    }

    async fn subscribe(&self, user_id: &str) -> Result<ExpenseSubscription> {
        let rx = self.subscribe_changes();
        let snapshot = self.query_expenses(user_id, &ExpenseQuery::default()).await?;
        Ok(ExpenseSubscription::new(user_id, snapshot, rx))
    }
}

#[async_trait]
impl LearningStore for Database {
    async fn learned_keywords(&self, user_id: &str) -> Result<BTreeMap<String, String>> {
        let user_id = user_id.to_string();
        self.blocking(move |db| db.get_learned_keywords(&user_id)).await
    }

    async fn learn_keyword(&self, user_id: &str, keyword: &str, category: &str) -> Result<()> {
        let (user_id, keyword, category) =
            (user_id.to_string(), keyword.to_string(), category.to_string());
        self.blocking(move |db| db.upsert_learned_keyword(&user_id, &keyword, &category))
            .await
    }
}
