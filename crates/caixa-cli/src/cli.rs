//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Caixa - Small-business cash book with AI statement import
#[derive(Parser)]
#[command(name = "caixa")]
#[command(about = "Self-hosted finance tracker for small businesses", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "caixa.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set CAIXA_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import a bank statement (CSV, PDF or image) through the LLM
    Import {
        /// Statement file to import
        #[arg(short, long)]
        file: PathBuf,

        /// Bank account label attached to every imported transaction
        #[arg(short, long)]
        account: String,
    },

    /// Manage transactions (list, add, delete)
    Transactions {
        #[command(subcommand)]
        action: Option<TransactionsAction>,
    },

    /// Manage recurring monthly expenses
    Recurring {
        #[command(subcommand)]
        action: Option<RecurringAction>,
    },

    /// Show totals, top expense categories and monthly balance
    Dashboard {
        /// First day included (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Last day included (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Export the monthly income/expense report as CSV
    Report {
        /// Output file (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// First day included (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Last day included (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Ask the financial advisor a question about your numbers
    Ask {
        /// The question, in plain language
        question: String,

        /// Limit the summary to transactions from this day (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Limit the summary to transactions up to this day (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Show database status (encryption, size, counts)
    Status,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, every /api request needs a key from CAIXA_API_KEYS.
        #[arg(long)]
        no_auth: bool,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum TransactionsAction {
    /// List recent transactions
    List {
        /// Maximum number to show
        #[arg(short, long, default_value = "20")]
        limit: i64,

        /// Only income or expense
        #[arg(short = 't', long = "type")]
        transaction_type: Option<String>,
    },

    /// Record a transaction by hand
    Add {
        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Description
        #[arg(long)]
        description: String,

        /// Amount (sign is taken from --type)
        #[arg(long, allow_hyphen_values = true)]
        amount: f64,

        /// income or expense
        #[arg(short = 't', long = "type")]
        transaction_type: String,

        /// Category id (e.g. vendas, aluguel); defaults to the catch-all for the type
        #[arg(short, long)]
        category: Option<String>,

        /// Payment method (e.g. pix, boleto)
        #[arg(long, default_value = "transferencia")]
        payment_method: String,

        /// Bank account label
        #[arg(short, long, default_value = "")]
        account: String,

        /// Free-text notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a transaction
    Delete {
        /// Transaction ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum RecurringAction {
    /// List recurring expenses
    List {
        /// Hide paused expenses
        #[arg(long)]
        active_only: bool,
    },

    /// Add a recurring expense
    Add {
        /// Description (e.g. "Aluguel da loja")
        description: String,

        /// Monthly amount
        #[arg(long)]
        amount: f64,

        /// Day of the month it is due (1-31)
        #[arg(long)]
        due_day: u32,

        /// Expense category id; defaults to outras_despesas
        #[arg(short, long)]
        category: Option<String>,

        /// Free-text notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// Remove a recurring expense
    Remove {
        /// Recurring expense ID
        id: i64,
    },

    /// Show active expenses due in the next few days
    Upcoming {
        /// Reminder horizon in days
        #[arg(short, long, default_value = "7")]
        days: i64,
    },
}
