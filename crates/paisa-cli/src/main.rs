//! Paisa CLI - Payment messages to categorized expenses
//!
//! Usage:
//!   paisa init                          Initialize database
//!   paisa ingest "Rs 450 at Zomato"     Record an expense
//!   paisa summary                       Spending by category this month
//!   paisa watch --source sms            Ingest stdin and stream changes

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let user = cli.user.as_str();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt, cli.config.as_deref()),
        Commands::Ingest {
            text,
            source,
            sender,
            title,
            at,
            dry_run,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(cli.config.as_deref())?;
            let opts = commands::IngestOptions {
                source,
                sender,
                title,
                at,
                dry_run,
            };
            commands::cmd_ingest(&db, &config, commands::ai_client(), user, &text, &opts).await
        }
        Commands::Expenses { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(cli.config.as_deref())?;
            match action {
                None => commands::cmd_expenses_list(&db, &config, user, 20, None, false),
                Some(ExpensesAction::List {
                    limit,
                    category,
                    today,
                }) => commands::cmd_expenses_list(
                    &db,
                    &config,
                    user,
                    limit,
                    category.as_deref(),
                    today,
                ),
                Some(ExpensesAction::Remove { id }) => {
                    commands::cmd_expenses_remove(&db, user, &id)
                }
            }
        }
        Commands::Alerts { all } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_alerts(&db, &config, user, all)
        }
        Commands::Baseline { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(BaselineAction::Show) => commands::cmd_baseline_show(&db, user),
                Some(BaselineAction::Set { category, average }) => {
                    commands::cmd_baseline_set(&db, user, &category, average)
                }
            }
        }
        Commands::Learn { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(LearnAction::List) => commands::cmd_learn_list(&db, user),
                Some(LearnAction::Add { keyword, category }) => {
                    commands::cmd_learn_add(&db, user, &keyword, &category)
                }
                Some(LearnAction::Remove { keyword }) => {
                    commands::cmd_learn_remove(&db, user, &keyword)
                }
            }
        }
        Commands::Budget { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(BudgetAction::Show) => commands::cmd_budget_show(&db, user),
                Some(BudgetAction::Set { amount }) => commands::cmd_budget_set(&db, user, amount),
            }
        }
        Commands::Summary { period, json } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_summary(&db, &config, user, period, json).await
        }
        Commands::Insight { period } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_insight(&db, &config, commands::ai_client(), user, period).await
        }
        Commands::History { search } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_history(&db, &config, user, search.as_deref())
        }
        Commands::Calendar { month, json } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_calendar(&db, &config, user, month.as_deref(), json)
        }
        Commands::Watch { source, sender } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(cli.config.as_deref())?;
            let opts = commands::IngestOptions {
                source,
                sender,
                ..Default::default()
            };
            commands::cmd_watch(&db, &config, commands::ai_client(), user, &opts).await
        }
        Commands::Ai { action } => match action {
            AiAction::Test { text } => {
                commands::cmd_ai_test(paisa_core::AIClient::from_env(), &text).await
            }
        },
        Commands::Prompts { action } => match action {
            None | Some(PromptsAction::List) => commands::cmd_prompts_list(),
            Some(PromptsAction::Show { id }) => commands::cmd_prompts_show(&id),
        },
    }
}
