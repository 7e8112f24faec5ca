//! Baseline, budget and learned keyword commands

use anyhow::{bail, Result};
use paisa_core::{Category, Database};
use rust_decimal::Decimal;

use super::rupees;

/// Canonical spelling for known categories; custom labels pass through
pub fn canonical_category(name: &str) -> String {
    name.parse::<Category>()
        .map(|c| c.as_str().to_string())
        .unwrap_or_else(|_| name.trim().to_string())
}

pub fn cmd_baseline_show(db: &Database, user: &str) -> Result<()> {
    let Some(baseline) = db.get_baseline(user)? else {
        println!("No baseline yet. Spike detection is skipped until one is set:");
        println!("  paisa baseline set Food 300");
        return Ok(());
    };

    let mut averages: Vec<_> = baseline.category_averages.iter().collect();
    averages.sort_by(|a, b| a.0.cmp(b.0));

    println!();
    println!("📊 Average Daily Spend");
    println!("   ─────────────────────────────");
    for (category, average) in averages {
        println!("   {:<15} {:>12}", category, rupees(*average));
    }
    Ok(())
}

pub fn cmd_baseline_set(db: &Database, user: &str, category: &str, average: Decimal) -> Result<()> {
    if average < Decimal::ZERO {
        bail!("Average must not be negative");
    }
    let category = canonical_category(category);
    if category.is_empty() {
        bail!("Category must not be empty");
    }

    let mut baseline = db.get_baseline(user)?.unwrap_or_default();
    baseline.category_averages.insert(category.clone(), average);
    db.replace_baseline(user, &baseline)?;

    println!("✅ Baseline for {} set to {}", category, rupees(average));
    Ok(())
}

pub fn cmd_budget_show(db: &Database, user: &str) -> Result<()> {
    match db.get_monthly_budget(user)? {
        Some(budget) => println!("💰 Monthly budget: {}", rupees(budget)),
        None => {
            println!("No monthly budget set. Set one with:");
            println!("  paisa budget set 20000");
        }
    }
    Ok(())
}

pub fn cmd_budget_set(db: &Database, user: &str, amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        bail!("Budget must be positive");
    }
    db.set_budget(user, amount)?;
    println!("✅ Monthly budget set to {}", rupees(amount));
    Ok(())
}

pub fn cmd_learn_list(db: &Database, user: &str) -> Result<()> {
    let learned = db.get_learned_keywords(user)?;
    if learned.is_empty() {
        println!("No learned keywords. Teach one with:");
        println!("  paisa learn add netflix Entertainment");
        return Ok(());
    }

    println!();
    println!("🧠 Learned Keywords");
    println!("   ─────────────────────────────");
    for (keyword, category) in &learned {
        println!("   {:<20} → {}", keyword, category);
    }
    Ok(())
}

pub fn cmd_learn_add(db: &Database, user: &str, keyword: &str, category: &str) -> Result<()> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        bail!("Keyword must not be empty");
    }
    let category = canonical_category(category);
    db.upsert_learned_keyword(user, keyword, &category)?;
    println!("✅ \"{}\" now maps to {}", keyword.to_lowercase(), category);
    Ok(())
}

pub fn cmd_learn_remove(db: &Database, user: &str, keyword: &str) -> Result<()> {
    if !db.delete_learned_keyword(user, keyword)? {
        bail!("Keyword \"{}\" not found", keyword);
    }
    println!("🗑️  Forgot \"{}\"", keyword);
    Ok(())
}
