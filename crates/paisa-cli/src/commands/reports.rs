//! Report command implementations (summary, insight, history, calendar)

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Utc};
use paisa_core::history::{daily_totals, group_by_month, search};
use paisa_core::insights::local_insight;
use paisa_core::{
    AIClient, BudgetStatus, Calendar, Database, ExpenseQuery, InsightService, MonthActivity,
    PaisaConfig, Period, SpendingSummary,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::{rupees, truncate};

fn insight_service(db: &Database, config: &PaisaConfig, ai: Option<AIClient>) -> InsightService {
    let service = InsightService::new(Calendar::new(config.timezone), Arc::new(db.clone()));
    match ai {
        Some(ai) => service.with_ai(ai, config.ai_timeout),
        None => service,
    }
}

fn print_summary(summary: &SpendingSummary) {
    let badge = match summary.status {
        BudgetStatus::BudgetChampion => "🏆",
        BudgetStatus::BudgetExceeded => "🚨",
        BudgetStatus::Summary => "📊",
    };

    println!();
    println!("{} {} ({})", badge, summary.status.title(), summary.label);
    println!("   ─────────────────────────────────────────────");

    let widest = summary
        .totals
        .first()
        .map(|t| t.amount)
        .filter(|a| !a.is_zero());
    for total in &summary.totals {
        // Bars are scaled to the largest category
        let bar_len = match widest {
            Some(max) => (total.amount * Decimal::from(20) / max)
                .round()
                .to_usize()
                .unwrap_or(0),
            None => 0,
        };
        println!(
            "   {:<13} {:>12}  {}",
            total.category,
            rupees(total.amount),
            "█".repeat(bar_len)
        );
    }

    println!("   ─────────────────────────────────────────────");
    println!("   {:<13} {:>12}", "Total", rupees(summary.spent));
    if let Some(budget) = summary.budget {
        println!("   {:<13} {:>12}  ({})", "Budget", rupees(budget), summary.prediction());
    }
}

pub async fn cmd_summary(
    db: &Database,
    config: &PaisaConfig,
    user: &str,
    period: Period,
    json: bool,
) -> Result<()> {
    let summary = insight_service(db, config, None)
        .summary(user, period, Utc::now())
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    if summary.is_empty() {
        println!("No expenses for {}.", summary.label);
        return Ok(());
    }
    print_summary(&summary);
    Ok(())
}

pub async fn cmd_insight(
    db: &Database,
    config: &PaisaConfig,
    ai: Option<AIClient>,
    user: &str,
    period: Period,
) -> Result<()> {
    let has_ai = ai.is_some();
    let service = insight_service(db, config, ai);
    let summary = service.summary(user, period, Utc::now()).await?;

    let text = if has_ai {
        println!("🤖 Asking for advice on {}...", summary.label);
        service.insight_or_fallback(&summary).await
    } else {
        local_insight(&summary)
    };

    println!();
    println!("💡 {}", text);
    Ok(())
}

pub fn cmd_history(
    db: &Database,
    config: &PaisaConfig,
    user: &str,
    query: Option<&str>,
) -> Result<()> {
    let calendar = Calendar::new(config.timezone);
    let expenses = db.list_expenses(user, &ExpenseQuery::default())?;
    let matched: Vec<_> = match query {
        Some(q) => search(&expenses, q).into_iter().cloned().collect(),
        None => expenses,
    };

    if matched.is_empty() {
        println!("No matching expenses.");
        return Ok(());
    }

    for group in group_by_month(&calendar, &matched) {
        let total: Decimal = group.expenses.iter().map(|e| e.amount).sum();
        println!();
        println!("📅 {} ({})", group.label, rupees(total));
        println!("   ─────────────────────────────────────────────────────────────");
        for expense in &group.expenses {
            println!(
                "   {} │ {:>10} │ {:<13} │ {}",
                expense.timestamp.with_timezone(&calendar.timezone()).format("%d %b"),
                rupees(expense.amount),
                expense.category,
                truncate(&expense.note, 40)
            );
        }
    }
    Ok(())
}

const SHADES: [&str; 5] = ["  ", "░░", "▒▒", "▓▓", "██"];

/// Shade index for a day: 0 for no spend, else 1-4 relative to the month's peak
pub fn heat_level(total: Decimal, peak: Decimal) -> usize {
    if total <= Decimal::ZERO || peak <= Decimal::ZERO {
        return 0;
    }
    (total * Decimal::from(4) / peak)
        .ceil()
        .to_usize()
        .unwrap_or(4)
        .clamp(1, 4)
}

fn parse_month(month: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{}', expected YYYY-MM", month))
}

fn print_calendar(activity: &MonthActivity) {
    let peak = activity.peak();
    let offset = activity
        .first_day()
        .map(|d| d.weekday().num_days_from_sunday() as usize)
        .unwrap_or(0);

    println!();
    println!("🗓  {} ({})", activity.label, rupees(activity.total()));
    println!("   Su Mo Tu We Th Fr Sa");

    let mut line = "   ".to_string() + &"   ".repeat(offset);
    for (i, day) in activity.days.iter().enumerate() {
        line.push_str(SHADES[heat_level(day.total, peak)]);
        line.push(' ');
        if (offset + i + 1) % 7 == 0 {
            println!("{}", line.trim_end());
            line = "   ".to_string();
        }
    }
    if !line.trim().is_empty() {
        println!("{}", line.trim_end());
    }

    println!();
    for day in activity.days.iter().filter(|d| d.count > 0) {
        println!(
            "   {} │ {:>10} │ {} expense{}",
            day.date.format("%a %d"),
            rupees(day.total),
            day.count,
            if day.count == 1 { "" } else { "s" }
        );
    }
}

pub fn cmd_calendar(
    db: &Database,
    config: &PaisaConfig,
    user: &str,
    month: Option<&str>,
    json: bool,
) -> Result<()> {
    let calendar = Calendar::new(config.timezone);
    let anchor = match month {
        Some(m) => calendar.start_of_date(parse_month(m)?),
        None => Utc::now(),
    };
    let (start, end) = calendar.month_bounds(anchor);
    let expenses = db.list_expenses(user, &ExpenseQuery::between(start, end))?;
    let activity = daily_totals(&calendar, anchor, &expenses);

    if json {
        println!("{}", serde_json::to_string_pretty(&activity)?);
        return Ok(());
    }
    if activity.days.iter().all(|d| d.count == 0) {
        println!("No expenses for {}.", activity.label);
        return Ok(());
    }
    print_calendar(&activity);
    Ok(())
}
