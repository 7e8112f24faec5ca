//! Same-day duplicate suppression
//!
//! The same payment often arrives twice (SMS plus app notification). A
//! candidate is a duplicate when an expense recorded earlier today has the
//! same amount and its note mentions the same merchant.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use crate::calendar::Calendar;
use crate::error::Result;
use crate::store::{ExpenseQuery, ExpenseStore};

#[derive(Debug, Clone, Copy)]
pub struct DuplicateGuard {
    calendar: Calendar,
}

impl DuplicateGuard {
    pub fn new(calendar: Calendar) -> Self {
        Self { calendar }
    }

    /// Whether an equal expense was already recorded on `now`'s calendar day
    pub async fn is_duplicate(
        &self,
        store: &dyn ExpenseStore,
        user_id: &str,
        amount: Decimal,
        merchant: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let (start, end) = self.calendar.day_bounds(now);
        let today = ExpenseQuery::between(start, end);
        let expenses = store.query_expenses(user_id, &today).await?;

        let found = expenses
            .iter()
            .find(|e| e.amount == amount && e.note.contains(merchant));

        if let Some(existing) = found {
            debug!(existing = %existing.id, merchant, %amount, "Duplicate of today's expense");
        }
        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, ParsedTransaction};
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn calendar() -> Calendar {
        Calendar::new(chrono_tz::Asia::Kolkata)
    }

    async fn record(store: &MemoryStore, amount: i64, note: &str, at: DateTime<Utc>) {
        store
            .add_expense(
                "u",
                &ParsedTransaction {
                    amount: Decimal::from(amount),
                    direction: Direction::Debit,
                    merchant: String::new(),
                    category: "Food".into(),
                    note: note.into(),
                    timestamp: at,
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_same_amount_and_merchant_today() {
        let store = MemoryStore::new();
        // 10:00 IST
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 4, 30, 0).unwrap();
        record(&store, 450, "Dominos | paid rs 450 to dominos", now).await;

        let guard = DuplicateGuard::new(calendar());
        let later = now + chrono::Duration::minutes(2);
        assert!(guard
            .is_duplicate(&store, "u", Decimal::from(450), "Dominos", later)
            .await
            .unwrap());
        assert!(!guard
            .is_duplicate(&store, "u", Decimal::from(451), "Dominos", later)
            .await
            .unwrap());
        assert!(!guard
            .is_duplicate(&store, "u", Decimal::from(450), "Pvr", later)
            .await
            .unwrap());
        assert!(!guard
            .is_duplicate(&store, "other", Decimal::from(450), "Dominos", later)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_day_boundary_is_local() {
        let store = MemoryStore::new();
        // 23:50 IST on the 13th
        let yesterday = Utc.with_ymd_and_hms(2025, 3, 13, 18, 20, 0).unwrap();
        record(&store, 450, "Dominos | x", yesterday).await;

        let guard = DuplicateGuard::new(calendar());
        // 00:10 IST on the 14th, twenty minutes later
        let now = Utc.with_ymd_and_hms(2025, 3, 13, 18, 40, 0).unwrap();
        assert!(!guard
            .is_duplicate(&store, "u", Decimal::from(450), "Dominos", now)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_backdated_event_ignores_later_days() {
        let store = MemoryStore::new();
        // 13:00 IST on the 15th
        let day2 = Utc.with_ymd_and_hms(2025, 3, 15, 7, 30, 0).unwrap();
        record(&store, 450, "Swiggy | rs 450 paid to swiggy", day2).await;

        let guard = DuplicateGuard::new(calendar());
        let day1 = day2 - chrono::Duration::days(1);
        assert!(!guard
            .is_duplicate(&store, "u", Decimal::from(450), "Swiggy", day1)
            .await
            .unwrap());
        assert!(guard
            .is_duplicate(&store, "u", Decimal::from(450), "Swiggy", day2)
            .await
            .unwrap());
    }
}
