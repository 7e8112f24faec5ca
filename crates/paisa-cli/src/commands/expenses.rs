//! Expense and alert command implementations

use anyhow::Result;
use chrono::Utc;
use paisa_core::{AnomalyDetector, Calendar, Database, ExpenseQuery, PaisaConfig};

use super::{rupees, truncate};

pub fn cmd_expenses_list(
    db: &Database,
    config: &PaisaConfig,
    user: &str,
    limit: usize,
    category: Option<&str>,
    today: bool,
) -> Result<()> {
    let calendar = Calendar::new(config.timezone);
    let mut query = if today {
        ExpenseQuery::since(calendar.start_of_day(Utc::now()))
    } else {
        ExpenseQuery::default()
    };
    if let Some(category) = category {
        query = query.category(category);
    }
    let expenses = db.list_expenses(user, &query.limit(limit))?;

    if expenses.is_empty() {
        println!("No expenses found. Record one with:");
        println!("  paisa ingest \"coffee 120\"");
        return Ok(());
    }

    println!();
    println!("📝 Recent Expenses");
    println!("   ─────────────────────────────────────────────────────────────");

    let tz = calendar.timezone();
    for expense in expenses {
        println!(
            "   [{}] {} │ {:>10} │ {:<13} │ {}",
            expense.id,
            expense.timestamp.with_timezone(&tz).format("%Y-%m-%d %H:%M"),
            rupees(expense.amount),
            expense.category,
            truncate(&expense.note, 40)
        );
    }

    Ok(())
}

pub fn cmd_expenses_remove(db: &Database, user: &str, id: &str) -> Result<()> {
    let expense = db
        .get_expense(user, id)?
        .ok_or_else(|| anyhow::anyhow!("Expense {} not found", id))?;

    db.delete_expense(user, id)?;
    println!(
        "🗑️  Removed expense {}: {} {}",
        id,
        rupees(expense.amount),
        truncate(&expense.note, 40)
    );
    Ok(())
}

pub fn cmd_alerts(db: &Database, config: &PaisaConfig, user: &str, all: bool) -> Result<()> {
    let alerts = db.list_alerts(user)?;
    let detector = AnomalyDetector::new(config.anomaly.clone(), Calendar::new(config.timezone));
    let active = detector.active(&alerts, Utc::now());

    let shown: Vec<_> = if all {
        alerts.iter().collect()
    } else {
        active.clone()
    };

    if shown.is_empty() {
        println!("✅ No spending spikes today.");
        return Ok(());
    }

    println!();
    println!("⚠️  Spending Alerts");
    println!("   ─────────────────────────────────────────────────────────────");
    for alert in shown {
        let status = if active.contains(&alert) { "today" } else { "expired" };
        println!(
            "   {:<13} │ {:<15} │ {:>10} │ {:>3} expenses │ {}",
            alert.category,
            alert.alert_type.label(),
            rupees(alert.amount),
            alert.count,
            status
        );
    }

    Ok(())
}
