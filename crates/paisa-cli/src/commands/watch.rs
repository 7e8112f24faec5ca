//! Live ingestion: messages on stdin, changes on stdout

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use paisa_core::{
    AIClient, Calendar, Database, ExpenseChange, ExpenseStore, PaisaConfig, PipelineOutcome,
    TransactionPipeline,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use super::{build_event, rupees, truncate, IngestOptions};

fn print_change(calendar: &Calendar, change: &ExpenseChange) {
    let tz = calendar.timezone();
    for expense in &change.added_or_changed {
        println!(
            "   + [{}] {} │ {:>10} │ {:<13} │ {}",
            expense.id,
            expense.timestamp.with_timezone(&tz).format("%Y-%m-%d %H:%M"),
            rupees(expense.amount),
            expense.category,
            truncate(&expense.note, 40)
        );
    }
    for id in &change.removed {
        println!("   - [{}] removed", id);
    }
}

/// Print the user's expenses, then ingest stdin lines and print each change
///
/// Runs until stdin closes or Ctrl-C.
pub async fn cmd_watch(
    db: &Database,
    config: &PaisaConfig,
    ai: Option<AIClient>,
    user: &str,
    opts: &IngestOptions,
) -> Result<()> {
    let calendar = Calendar::new(config.timezone);
    let store = Arc::new(db.clone());
    let mut pipeline = TransactionPipeline::new(config, store.clone(), store)?;
    if let Some(ai) = ai {
        pipeline = pipeline.with_ai(ai, config);
    }

    let mut subscription = db.subscribe(user).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    println!("👀 Watching expenses for {} (Ctrl-C to stop)", user);
    loop {
        tokio::select! {
            change = subscription.next() => match change {
                Some(change) if change.is_empty() => continue,
                Some(change) => print_change(&calendar, &change),
                None => break,
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => {
                    let event = build_event(&line, opts, Utc::now());
                    match pipeline.process(Some(user), &event).await {
                        Ok(PipelineOutcome::Recorded { alert: Some(alert), .. }) => println!(
                            "   ⚠️  {} in {}: {} today",
                            alert.alert_type,
                            alert.category,
                            rupees(alert.amount)
                        ),
                        Ok(PipelineOutcome::Recorded { .. }) => {}
                        Ok(PipelineOutcome::Duplicate(tx)) => {
                            println!("   👯 Duplicate {} at {}", rupees(tx.amount), tx.merchant)
                        }
                        Ok(PipelineOutcome::Ignored(reason)) => {
                            println!("   ⏭️  Ignored ({})", reason.as_str())
                        }
                        Err(e) => warn!(error = %e, "Failed to ingest message"),
                    }
                }
                Ok(None) => {
                    debug!("stdin closed");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                debug!("Watch interrupted");
                subscription.cancel();
                break;
            }
        }
    }

    println!("👋 Stopped watching");
    Ok(())
}
