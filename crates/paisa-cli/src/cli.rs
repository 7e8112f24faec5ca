//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use paisa_core::{EventSource, Period};
use rust_decimal::Decimal;

/// Paisa - Turn payment messages into categorized expenses
#[derive(Parser)]
#[command(name = "paisa")]
#[command(about = "Expense ingestion with spending spike alerts", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "paisa.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set PAISA_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Configuration file (vendor map, keyword clusters, thresholds)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// User the expenses belong to
    #[arg(short, long, default_value = "default", global = true)]
    pub user: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Run payment text through the pipeline
    Ingest {
        /// Message text, or "-" to read one message per line from stdin
        text: String,

        /// Event source: sms, notification, manual
        #[arg(short, long, default_value = "manual")]
        source: EventSource,

        /// SMS sender id or notification package name
        #[arg(long)]
        sender: Option<String>,

        /// Notification title, joined in front of the text
        #[arg(long)]
        title: Option<String>,

        /// When the message arrived (RFC 3339, defaults to now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,

        /// Parse and classify only, do not store
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage recorded expenses (list, remove)
    Expenses {
        #[command(subcommand)]
        action: Option<ExpensesAction>,
    },

    /// List spending spike alerts
    Alerts {
        /// Include alerts from earlier days
        #[arg(long)]
        all: bool,
    },

    /// Per-category average daily spend used for spike detection
    Baseline {
        #[command(subcommand)]
        action: Option<BaselineAction>,
    },

    /// Learned keyword -> category mappings
    Learn {
        #[command(subcommand)]
        action: Option<LearnAction>,
    },

    /// Monthly budget
    Budget {
        #[command(subcommand)]
        action: Option<BudgetAction>,
    },

    /// Spending by category for a month
    Summary {
        /// this-month or last-month
        #[arg(long, default_value = "this-month")]
        period: Period,

        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Ask the AI backend for spending advice
    Insight {
        /// this-month or last-month
        #[arg(long, default_value = "this-month")]
        period: Period,
    },

    /// Expense history grouped by month
    History {
        /// Only expenses matching every word
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Per-day spend for a month
    Calendar {
        /// Month as YYYY-MM (default: current month)
        #[arg(short, long)]
        month: Option<String>,

        /// Output JSON instead of a grid
        #[arg(long)]
        json: bool,
    },

    /// Ingest messages from stdin and stream expense changes until interrupted
    Watch {
        /// Event source for every line: sms, notification, manual
        #[arg(short, long, default_value = "manual")]
        source: EventSource,

        /// SMS sender id or notification package name
        #[arg(long)]
        sender: Option<String>,
    },

    /// Test the AI classifier backend
    Ai {
        #[command(subcommand)]
        action: AiAction,
    },

    /// Manage AI prompts (list available prompts, view override status)
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },
}

#[derive(Subcommand)]
pub enum ExpensesAction {
    /// List recent expenses
    List {
        /// Maximum number of expenses
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Only this category
        #[arg(short, long)]
        category: Option<String>,

        /// Only today's expenses
        #[arg(long)]
        today: bool,
    },

    /// Remove an expense by id
    Remove {
        /// Expense ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum BaselineAction {
    /// Show the stored averages
    Show,

    /// Set the average daily spend for a category
    Set {
        /// Category name (e.g., "Food")
        category: String,
        /// Average daily spend
        average: Decimal,
    },
}

#[derive(Subcommand)]
pub enum LearnAction {
    /// List learned keywords
    List,

    /// Map a keyword to a category
    Add {
        /// Keyword to look for in payment text
        keyword: String,
        /// Category to assign
        category: String,
    },

    /// Forget a keyword
    Remove {
        keyword: String,
    },
}

#[derive(Subcommand)]
pub enum BudgetAction {
    /// Show the monthly budget
    Show,

    /// Set the monthly budget
    Set {
        amount: Decimal,
    },
}

#[derive(Subcommand)]
pub enum AiAction {
    /// Check backend health and classify a sample message
    Test {
        /// Sample text to classify
        #[arg(default_value = "Paid Rs 450 to Dominos")]
        text: String,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List all prompts and their override status
    List,

    /// Show the content of a prompt
    Show {
        /// Prompt ID (e.g., "classify_expense")
        id: String,
    },
}
