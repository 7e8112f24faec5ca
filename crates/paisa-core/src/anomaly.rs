//! Same-day spending spike detection
//!
//! After an expense is persisted, today's total and count for its category
//! are compared against the user's baseline average:
//!
//! - Amount spike: `total >= max(avg * multiplier, avg + margin)`
//! - Frequency spike: `count >= frequency_threshold`
//!
//! The per-category alert record is overwritten only when today's total or
//! count strictly exceeds what an alert from the same calendar day already
//! carries. An alert from an earlier day counts as zero; an alert from a
//! later day is never replaced by a backdated event. Nothing ever deletes
//! alerts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::calendar::Calendar;
use crate::config::AnomalyConfig;
use crate::error::Result;
use crate::models::{AlertRecord, AlertType};
use crate::store::{ExpenseQuery, ExpenseStore};

/// Today's spend in one category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DayTotals {
    pub total: Decimal,
    pub count: u32,
}

#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    config: AnomalyConfig,
    calendar: Calendar,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig, calendar: Calendar) -> Self {
        Self { config, calendar }
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    /// Pure transition rule
    ///
    /// Returns the record to write, or None when the state stays as it is.
    pub fn evaluate(
        &self,
        category: &str,
        average: Decimal,
        today: DayTotals,
        previous: Option<&AlertRecord>,
        now: DateTime<Utc>,
    ) -> Option<AlertRecord> {
        let amount_spike = today.total >= self.config.threshold(average);
        let frequency_spike = today.count >= self.config.frequency_threshold;
        if !amount_spike && !frequency_spike {
            return None;
        }

        let day = self.calendar.date_of(now);
        if previous.is_some_and(|a| self.calendar.date_of(a.timestamp) > day) {
            debug!(category, "Newer alert exists, backdated spike not recorded");
            return None;
        }

        let (prev_amount, prev_count) = match previous {
            Some(alert) if self.calendar.same_day(alert.timestamp, now) => {
                (alert.amount, alert.count)
            }
            _ => (Decimal::ZERO, 0),
        };
        if today.total <= prev_amount && today.count <= prev_count {
            debug!(category, "Spike already covered by today's alert");
            return None;
        }

        Some(AlertRecord {
            category: category.to_string(),
            alert_type: if amount_spike {
                AlertType::AmountSpike
            } else {
                AlertType::FrequencySpike
            },
            amount: today.total,
            count: today.count,
            timestamp: now,
        })
    }

    /// Today's total and count for a category
    pub async fn day_totals(
        &self,
        store: &dyn ExpenseStore,
        user_id: &str,
        category: &str,
        now: DateTime<Utc>,
    ) -> Result<DayTotals> {
        let (start, end) = self.calendar.day_bounds(now);
        let query = ExpenseQuery::between(start, end).category(category);
        let expenses = store.query_expenses(user_id, &query).await?;
        Ok(DayTotals {
            total: expenses.iter().map(|e| e.amount).sum(),
            count: u32::try_from(expenses.len()).unwrap_or(u32::MAX),
        })
    }

    /// Run detection for the category of a just-persisted expense
    ///
    /// Returns the alert written, if any. No baseline for the category means
    /// there is not enough history yet, which is not an error.
    pub async fn check(
        &self,
        store: &dyn ExpenseStore,
        user_id: &str,
        category: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AlertRecord>> {
        let average = match store.baseline(user_id).await? {
            Some(baseline) => baseline.average_for(category),
            None => None,
        };
        let Some(average) = average else {
            debug!(category, "No baseline average, skipping spike check");
            return Ok(None);
        };

        let today = self.day_totals(store, user_id, category, now).await?;
        let previous = store.alert(user_id, category).await?;

        let Some(alert) = self.evaluate(category, average, today, previous.as_ref(), now) else {
            return Ok(None);
        };

        store.put_alert(user_id, &alert).await?;
        info!(
            category,
            alert_type = alert.alert_type.as_str(),
            total = %alert.amount,
            count = alert.count,
            "Spending spike recorded"
        );
        Ok(Some(alert))
    }

    /// Alerts still valid on `now`'s calendar day
    pub fn active<'a>(
        &self,
        alerts: &'a [AlertRecord],
        now: DateTime<Utc>,
    ) -> Vec<&'a AlertRecord> {
        alerts
            .iter()
            .filter(|a| self.calendar.same_day(a.timestamp, now))
            .collect()
    }
}
