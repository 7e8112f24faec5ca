//! Paisa Core Library
//!
//! Turns free-form payment text into categorized expenses:
//! - Field extraction (amount, direction, merchant)
//! - Layered category classifier with a pluggable AI fallback
//! - Same-day duplicate suppression and spending spike alerts
//! - Store seams with in-memory and SQLite implementations
//! - Monthly summaries, AI insights, month-grouped history and per-day
//!   spending calendars
//! - Prompt library for customizable AI prompts

pub mod ai;
pub mod anomaly;
pub mod calendar;
pub mod classify;
pub mod config;
pub mod db;
pub mod dedupe;
pub mod error;
pub mod extract;
pub mod history;
pub mod insights;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod store;

/// Test utilities including the mock classifier server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIBackend, AIClient, EndpointBackend, ExpenseClassification, InsightRequest, MockBackend,
    OllamaBackend,
};
pub use anomaly::{AnomalyDetector, DayTotals};
pub use calendar::Calendar;
pub use classify::{CategoryClassifier, Classification, ClassificationLayer};
pub use config::{AnomalyConfig, CategoryRules, PaisaConfig, SourceFilter};
pub use db::Database;
pub use dedupe::DuplicateGuard;
pub use error::{Error, Result};
pub use extract::{AmountExtractor, DirectionClassifier, MerchantExtractor};
pub use history::{DayTotal, MonthActivity};
pub use insights::{BudgetStatus, InsightService, Period, SpendingSummary};
pub use models::{
    AlertRecord, AlertType, BaselineStats, Category, Direction, EventSource, ExpenseChange,
    ParsedTransaction, RawEvent, StoredExpense,
};
pub use pipeline::{IgnoreReason, PipelineOutcome, TransactionPipeline};
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary};
pub use store::{ExpenseQuery, ExpenseStore, ExpenseSubscription, LearningStore, MemoryStore};
