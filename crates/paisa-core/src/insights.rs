//! Monthly spending summaries and AI advice
//!
//! Totals are grouped per category for the current month (open ended) or
//! the previous calendar month. The monthly budget decides the status
//! badge, and the same numbers feed the insight prompt.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use crate::ai::{AIBackend, AIClient, InsightRequest};
use crate::calendar::Calendar;
use crate::error::{Error, Result};
use crate::store::{ExpenseQuery, ExpenseStore};

/// Reply used when there is nothing to summarize
pub const NOT_ENOUGH_DATA: &str = "Not enough data to generate insights.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    ThisMonth,
    LastMonth,
}

impl std::str::FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "this_month" | "this" | "current" => Ok(Self::ThisMonth),
            "last_month" | "last" | "previous" => Ok(Self::LastMonth),
            _ => Err(format!("Unknown period: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    /// Spent no more than a positive budget
    BudgetChampion,
    BudgetExceeded,
    /// No budget set
    Summary,
}

impl BudgetStatus {
    pub fn evaluate(spent: Decimal, budget: Option<Decimal>) -> Self {
        match budget {
            Some(budget) if budget > Decimal::ZERO && spent <= budget => Self::BudgetChampion,
            Some(budget) if budget > Decimal::ZERO => Self::BudgetExceeded,
            _ => Self::Summary,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::BudgetChampion => "Budget Champion!",
            Self::BudgetExceeded => "Budget Exceeded",
            Self::Summary => "Monthly Summary",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendingSummary {
    pub period: Period,
    /// e.g. "March 2025"
    pub label: String,
    /// Largest first
    pub totals: Vec<CategoryTotal>,
    pub spent: Decimal,
    pub budget: Option<Decimal>,
    pub status: BudgetStatus,
}

impl SpendingSummary {
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn top_category(&self) -> Option<&CategoryTotal> {
        self.totals.first().filter(|t| t.amount > Decimal::ZERO)
    }

    /// "Over budget" once spending passes a set budget, else "On track"
    pub fn prediction(&self) -> &'static str {
        match self.budget {
            Some(budget) if self.spent > budget => "Over budget",
            _ => "On track",
        }
    }

    /// One `Category: amount` line per category, amounts rounded
    pub fn prompt_lines(&self) -> String {
        self.totals
            .iter()
            .map(|t| format!("{}: {}\n", t.category, t.amount.round()))
            .collect()
    }

    pub fn insight_request(&self) -> InsightRequest {
        InsightRequest {
            prompt: self.prompt_lines(),
            budget: self.budget.and_then(|b| b.to_f64()).unwrap_or(0.0),
            spent: self.spent.to_f64().unwrap_or(0.0),
            prediction: self.prediction().to_string(),
        }
    }
}

pub struct InsightService {
    calendar: Calendar,
    store: Arc<dyn ExpenseStore>,
    ai: Option<AIClient>,
    ai_timeout: Duration,
}

impl InsightService {
    pub fn new(calendar: Calendar, store: Arc<dyn ExpenseStore>) -> Self {
        Self {
            calendar,
            store,
            ai: None,
            ai_timeout: Duration::from_secs(15),
        }
    }

    pub fn with_ai(mut self, ai: AIClient, timeout: Duration) -> Self {
        self.ai = Some(ai);
        self.ai_timeout = timeout;
        self
    }

    pub async fn summary(
        &self,
        user_id: &str,
        period: Period,
        now: DateTime<Utc>,
    ) -> Result<SpendingSummary> {
        let this_month = self.calendar.start_of_month(now);
        let (query, label_instant) = match period {
            Period::ThisMonth => (ExpenseQuery::since(this_month), now),
            Period::LastMonth => {
                let start = self.calendar.start_of_previous_month(now);
                (ExpenseQuery::between(start, this_month), start)
            }
        };

        let expenses = self.store.query_expenses(user_id, &query).await?;
        let mut by_category: BTreeMap<String, Decimal> = BTreeMap::new();
        for expense in &expenses {
            *by_category.entry(expense.category.clone()).or_default() += expense.amount;
        }

        let mut totals: Vec<CategoryTotal> = by_category
            .into_iter()
            .map(|(category, amount)| CategoryTotal { category, amount })
            .collect();
        totals.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.category.cmp(&b.category)));

        let spent: Decimal = totals.iter().map(|t| t.amount).sum();
        let budget = self.store.monthly_budget(user_id).await?;
        debug!(user = user_id, expenses = expenses.len(), %spent, "Built spending summary");

        Ok(SpendingSummary {
            period,
            label: self.calendar.month_label(label_instant),
            totals,
            spent,
            budget,
            status: BudgetStatus::evaluate(spent, budget),
        })
    }

    /// Ask the AI backend for advice on a summary
    pub async fn insight(&self, summary: &SpendingSummary) -> Result<String> {
        if summary.is_empty() {
            return Ok(NOT_ENOUGH_DATA.to_string());
        }
        let ai = self
            .ai
            .as_ref()
            .ok_or_else(|| Error::Ai("No AI backend configured".to_string()))?;

        let request = summary.insight_request();
        match tokio::time::timeout(self.ai_timeout, ai.generate_insight(&request)).await {
            Ok(reply) => reply,
            Err(_) => Err(Error::Timeout(self.ai_timeout.as_secs())),
        }
    }

    /// Like [`insight`](Self::insight) but never fails
    pub async fn insight_or_fallback(&self, summary: &SpendingSummary) -> String {
        match self.insight(summary).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Insight unavailable, using local summary");
                local_insight(summary)
            }
        }
    }
}

/// Plain summary sentence built without a model
pub fn local_insight(summary: &SpendingSummary) -> String {
    let Some(top) = summary.top_category() else {
        return NOT_ENOUGH_DATA.to_string();
    };
    let mut text = format!(
        "{}: spent {} in {}, most of it on {} ({}).",
        summary.prediction(),
        summary.spent.round(),
        summary.label,
        top.category,
        top.amount.round()
    );
    if let Some(budget) = summary.budget.filter(|b| *b > Decimal::ZERO) {
        text.push_str(&format!(" Budget: {}.", budget.round()));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockBackend;
    use crate::models::{Direction, ParsedTransaction};
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn calendar() -> Calendar {
        Calendar::new(chrono_tz::Asia::Kolkata)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 6, 30, 0).unwrap()
    }

    async fn spend(store: &MemoryStore, category: &str, amount: &str, at: DateTime<Utc>) {
        store
            .add_expense(
                "u",
                &ParsedTransaction {
                    amount: amount.parse().unwrap(),
                    direction: Direction::Debit,
                    merchant: "Shop".into(),
                    category: category.into(),
                    note: "Shop | x".into(),
                    timestamp: at,
                },
            )
            .await
            .unwrap();
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        spend(&store, "Food", "300", now()).await;
        spend(&store, "Food", "150.40", now()).await;
        spend(&store, "Bills", "1200", now()).await;
        // 1 March 00:10 IST, still this month
        spend(&store, "Shopping", "99", Utc.with_ymd_and_hms(2025, 2, 28, 18, 40, 0).unwrap()).await;
        // February
        spend(&store, "Food", "800", Utc.with_ymd_and_hms(2025, 2, 10, 6, 0, 0).unwrap()).await;
        store
    }

    #[tokio::test]
    async fn test_this_month_totals() {
        let store = seeded().await;
        let service = InsightService::new(calendar(), Arc::new(store));
        let summary = service.summary("u", Period::ThisMonth, now()).await.unwrap();

        assert_eq!(summary.label, "March 2025");
        let categories: Vec<_> = summary.totals.iter().map(|t| t.category.as_str()).collect();
        assert_eq!(categories, vec!["Bills", "Food", "Shopping"]);
        assert_eq!(summary.spent, "1749.40".parse::<Decimal>().unwrap());
        assert_eq!(summary.status, BudgetStatus::Summary);
        assert_eq!(summary.top_category().unwrap().category, "Bills");
        assert_eq!(summary.prompt_lines(), "Bills: 1200\nFood: 450\nShopping: 99\n");
    }

    #[tokio::test]
    async fn test_last_month_and_budget_status() {
        let store = seeded().await;
        store.set_monthly_budget("u", Decimal::from(1000)).await.unwrap();
        let service = InsightService::new(calendar(), Arc::new(store.clone()));

        let last = service.summary("u", Period::LastMonth, now()).await.unwrap();
        assert_eq!(last.label, "February 2025");
        assert_eq!(last.spent, Decimal::from(800));
        assert_eq!(last.status, BudgetStatus::BudgetChampion);
        assert_eq!(last.prediction(), "On track");

        let this = service.summary("u", Period::ThisMonth, now()).await.unwrap();
        assert_eq!(this.status, BudgetStatus::BudgetExceeded);
        assert_eq!(this.prediction(), "Over budget");
        assert_eq!(this.status.title(), "Budget Exceeded");
    }

    #[test]
    fn test_budget_status_edges() {
        let d = |v: i64| Decimal::from(v);
        assert_eq!(BudgetStatus::evaluate(d(100), Some(d(100))), BudgetStatus::BudgetChampion);
        assert_eq!(BudgetStatus::evaluate(d(0), Some(d(0))), BudgetStatus::Summary);
        assert_eq!(BudgetStatus::evaluate(d(5), None), BudgetStatus::Summary);
    }

    #[tokio::test]
    async fn test_ai_insight_and_fallback() {
        let store = seeded().await;
        let service = InsightService::new(calendar(), Arc::new(store.clone()))
            .with_ai(AIClient::Mock(MockBackend::new()), Duration::from_secs(1));
        let summary = service.summary("u", Period::ThisMonth, now()).await.unwrap();

        let reply = service.insight(&summary).await.unwrap();
        assert!(reply.starts_with("On track"));

        let offline = InsightService::new(calendar(), Arc::new(store))
            .with_ai(AIClient::Mock(MockBackend::failing()), Duration::from_secs(1));
        assert!(offline.insight(&summary).await.is_err());
        let text = offline.insight_or_fallback(&summary).await;
        assert!(text.contains("most of it on Bills"));
    }

    #[tokio::test]
    async fn test_empty_month_needs_no_ai() {
        let service = InsightService::new(calendar(), Arc::new(MemoryStore::new()));
        let summary = service.summary("u", Period::ThisMonth, now()).await.unwrap();
        assert!(summary.is_empty());
        assert_eq!(service.insight(&summary).await.unwrap(), NOT_ENOUGH_DATA);
    }

    #[test]
    fn test_period_parse() {
        assert_eq!("last-month".parse::<Period>().unwrap(), Period::LastMonth);
        assert_eq!("this".parse::<Period>().unwrap(), Period::ThisMonth);
        assert!("next".parse::<Period>().is_err());
    }
}
