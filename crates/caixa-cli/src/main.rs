//! Caixa CLI - Small-business finance tracker
//!
//! Usage:
//!   caixa init                               Initialize database
//!   caixa import --file extrato.pdf -a Itaú  Import a bank statement via the LLM
//!   caixa dashboard                          Show totals and top categories
//!   caixa serve --port 3000                  Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

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

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Import { file, account } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let ai = commands::llm_from_env()?;
            commands::cmd_import(&db, ai, &file, &account).await
        }
        Commands::Transactions { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_transactions_list(&db, 20, None),
                Some(TransactionsAction::List {
                    limit,
                    transaction_type,
                }) => commands::cmd_transactions_list(&db, limit, transaction_type.as_deref()),
                Some(TransactionsAction::Add {
                    date,
                    description,
                    amount,
                    transaction_type,
                    category,
                    payment_method,
                    account,
                    notes,
                }) => commands::cmd_transactions_add(
                    &db,
                    commands::ManualEntry {
                        date,
                        description,
                        amount,
                        transaction_type,
                        category,
                        payment_method,
                        account,
                        notes,
                    },
                )
                .map(|_| ()),
                Some(TransactionsAction::Delete { id }) => {
                    commands::cmd_transactions_delete(&db, id)
                }
            }
        }
        Commands::Recurring { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_recurring_list(&db, false),
                Some(RecurringAction::List { active_only }) => {
                    commands::cmd_recurring_list(&db, active_only)
                }
                Some(RecurringAction::Add {
                    description,
                    amount,
                    due_day,
                    category,
                    notes,
                }) => commands::cmd_recurring_add(
                    &db,
                    &description,
                    amount,
                    due_day,
                    category.as_deref(),
                    notes,
                )
                .map(|_| ()),
                Some(RecurringAction::Remove { id }) => commands::cmd_recurring_remove(&db, id),
                Some(RecurringAction::Upcoming { days }) => {
                    commands::cmd_recurring_upcoming(&db, days)
                }
            }
        }
        Commands::Dashboard { from, to } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_dashboard(&db, from.as_deref(), to.as_deref())
        }
        Commands::Report { output, from, to } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_report(&db, output.as_deref(), from.as_deref(), to.as_deref())
        }
        Commands::Ask { question, from, to } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let ai = commands::llm_from_env()?;
            commands::cmd_ask(&db, &ai, &question, from.as_deref(), to.as_deref())
                .await
                .map(|_| ())
        }
        Commands::Status => commands::cmd_status(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
        } => {
            commands::cmd_serve(
                &cli.db,
                &host,
                port,
                no_auth,
                cli.no_encrypt,
                static_dir.as_deref(),
            )
            .await
        }
    }
}
