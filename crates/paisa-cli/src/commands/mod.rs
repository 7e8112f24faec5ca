//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - init and shared utilities (open_db, load_config, ai_client)
//! - `ingest` - Run payment text through the pipeline
//! - `expenses` - Expense list/remove and alerts
//! - `profile` - Baseline, budget and learned keywords
//! - `reports` - Summary, insight, history and calendar
//! - `watch` - Live expense change stream
//! - `ai` - AI backend test and prompt library commands

pub mod ai;
pub mod core;
pub mod expenses;
pub mod ingest;
pub mod profile;
pub mod reports;
pub mod watch;

// Re-export command functions for main.rs
pub use ai::*;
pub use core::*;
pub use expenses::*;
pub use ingest::*;
pub use profile::*;
pub use reports::*;
pub use watch::*;

use rust_decimal::Decimal;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Rupee amount with two decimals
pub fn rupees(amount: Decimal) -> String {
    format!("₹{:.2}", amount)
}
