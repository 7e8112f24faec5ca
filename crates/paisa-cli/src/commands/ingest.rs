//! Ingest command implementation

use std::io::BufRead;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use paisa_core::{
    AIClient, Database, EventSource, PaisaConfig, PipelineOutcome, RawEvent, TransactionPipeline,
};

use super::{rupees, truncate};

/// Ingest flags shared by every message of one invocation
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub source: EventSource,
    pub sender: Option<String>,
    pub title: Option<String>,
    pub at: Option<DateTime<Utc>>,
    pub dry_run: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            source: EventSource::ManualEntry,
            sender: None,
            title: None,
            at: None,
            dry_run: false,
        }
    }
}

pub fn build_event(text: &str, opts: &IngestOptions, now: DateTime<Utc>) -> RawEvent {
    let received_at = opts.at.unwrap_or(now);
    let text = match (opts.source, opts.title.as_deref()) {
        (EventSource::PushNotification, Some(title)) => format!("{} {}", title, text),
        _ => text.to_string(),
    };
    RawEvent {
        source: opts.source,
        text,
        sender: opts.sender.clone(),
        received_at,
    }
}

pub async fn cmd_ingest(
    db: &Database,
    config: &PaisaConfig,
    ai: Option<AIClient>,
    user: &str,
    text: &str,
    opts: &IngestOptions,
) -> Result<()> {
    let messages: Vec<String> = if text == "-" {
        std::io::stdin()
            .lock()
            .lines()
            .collect::<std::io::Result<Vec<_>>>()
            .context("Failed to read messages from stdin")?
            .into_iter()
            .filter(|line| !line.trim().is_empty())
            .collect()
    } else {
        vec![text.to_string()]
    };

    let store = Arc::new(db.clone());
    let mut pipeline = TransactionPipeline::new(config, store.clone(), store)?;
    if let Some(ai) = ai {
        pipeline = pipeline.with_ai(ai, config);
    }

    let mut recorded = 0;
    for message in &messages {
        let event = build_event(message, opts, Utc::now());

        if opts.dry_run {
            print_draft(&pipeline, user, &event).await;
            continue;
        }

        let outcome = pipeline
            .process(Some(user), &event)
            .await
            .with_context(|| format!("Failed to ingest: {}", truncate(message, 60)))?;
        if outcome.is_recorded() {
            recorded += 1;
        }
        print_outcome(&outcome, message);
    }

    if messages.len() > 1 && !opts.dry_run {
        println!();
        println!("✅ Recorded {} of {} messages", recorded, messages.len());
    }
    Ok(())
}

async fn print_draft(pipeline: &TransactionPipeline, user: &str, event: &RawEvent) {
    if !pipeline.accepts(event) {
        println!("🚫 Sender not on the allow list: {}", truncate(&event.text, 50));
        return;
    }
    let draft = pipeline.parse(user, event).await;
    let tx = &draft.transaction;
    println!("🔎 {}", truncate(&event.text, 60));
    println!("   Amount:    {}", rupees(tx.amount));
    println!("   Direction: {}", tx.direction);
    println!("   Merchant:  {}", tx.merchant);
    println!("   Category:  {} ({})", tx.category, draft.layer.as_str());
}

fn print_outcome(outcome: &PipelineOutcome, message: &str) {
    match outcome {
        PipelineOutcome::Recorded { expense, alert, .. } => {
            println!(
                "✅ [{}] {} │ {:<13} │ {}",
                expense.id,
                rupees(expense.amount),
                expense.category,
                truncate(&expense.note, 50)
            );
            if let Some(alert) = alert {
                println!(
                    "   ⚠️  {} in {}: {} across {} expenses today",
                    alert.alert_type,
                    alert.category,
                    rupees(alert.amount),
                    alert.count
                );
            }
        }
        PipelineOutcome::Duplicate(tx) => {
            println!(
                "👯 Duplicate of today's {} at {}, skipped",
                rupees(tx.amount),
                tx.merchant
            );
        }
        PipelineOutcome::Ignored(reason) => {
            println!("⏭️  Ignored ({}): {}", reason.as_str(), truncate(message, 50));
        }
    }
}
