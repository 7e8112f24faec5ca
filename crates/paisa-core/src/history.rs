//! Expense history grouped by month, keyword search, and per-day totals
//! for a month's spending calendar

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::calendar::Calendar;
use crate::models::StoredExpense;

/// Expenses of one calendar month, newest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthGroup {
    /// e.g. "January 2026"
    pub label: String,
    pub expenses: Vec<StoredExpense>,
}

/// Group expenses by month label, keeping the newest-first order
///
/// Input order is preserved inside each group, and groups appear in the
/// order their first expense does.
pub fn group_by_month(calendar: &Calendar, expenses: &[StoredExpense]) -> Vec<MonthGroup> {
    let mut groups: Vec<MonthGroup> = Vec::new();
    for expense in expenses {
        let label = calendar.month_label(expense.timestamp);
        match groups.iter_mut().find(|g| g.label == label) {
            Some(group) => group.expenses.push(expense.clone()),
            None => groups.push(MonthGroup {
                label,
                expenses: vec![expense.clone()],
            }),
        }
    }
    groups
}

/// Every whitespace-separated term must appear in "note category amount"
///
/// Matching is case-insensitive. An empty query matches everything.
pub fn matches_query(expense: &StoredExpense, query: &str) -> bool {
    let content = format!("{} {} {}", expense.note, expense.category, expense.amount).to_lowercase();
    query
        .to_lowercase()
        .split_whitespace()
        .all(|term| content.contains(term))
}

pub fn search<'a>(expenses: &'a [StoredExpense], query: &str) -> Vec<&'a StoredExpense> {
    expenses.iter().filter(|e| matches_query(e, query)).collect()
}

/// Spend on one local calendar day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayTotal {
    pub date: NaiveDate,
    pub total: Decimal,
    pub count: u32,
}

/// Every day of one month, including days without spend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthActivity {
    pub label: String,
    pub days: Vec<DayTotal>,
}

impl MonthActivity {
    pub fn total(&self) -> Decimal {
        self.days.iter().map(|d| d.total).sum()
    }

    /// Largest single-day total, zero for an empty month
    pub fn peak(&self) -> Decimal {
        self.days
            .iter()
            .map(|d| d.total)
            .max()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        self.days.first().map(|d| d.date)
    }
}

/// Per-day totals for the local month containing `month`
///
/// Expenses outside that month are ignored, so callers may pass a wider set.
pub fn daily_totals(
    calendar: &Calendar,
    month: DateTime<Utc>,
    expenses: &[StoredExpense],
) -> MonthActivity {
    let (start, end) = calendar.month_bounds(month);
    let first = calendar.date_of(start);
    let next_month = calendar.date_of(end);

    let mut days: Vec<DayTotal> = first
        .iter_days()
        .take_while(|date| *date < next_month)
        .map(|date| DayTotal {
            date,
            total: Decimal::ZERO,
            count: 0,
        })
        .collect();

    for expense in expenses
        .iter()
        .filter(|e| e.timestamp >= start && e.timestamp < end)
    {
        let index = calendar.date_of(expense.timestamp).day0() as usize;
        if let Some(day) = days.get_mut(index) {
            day.total += expense.amount;
            day.count += 1;
        }
    }

    MonthActivity {
        label: calendar.month_label(start),
        days,
    }
}
