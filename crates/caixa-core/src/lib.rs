//! Caixa Core Library
//!
//! Shared functionality for the Caixa small-business finance tracker:
//! - Database access and migrations (SQLCipher-encrypted SQLite)
//! - Bank statement import: LLM extraction, validation, batch categorization
//! - Pluggable LLM backends (OpenAI-compatible, mock)
//! - Prompt library for customizable AI prompts
//! - Dashboard aggregation and monthly CSV reports
//! - Recurring expense reminders
//! - Financial advisor chat

pub mod advisor;
pub mod ai;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod prompts;
pub mod recurring;
pub mod report;
pub mod storage;
pub mod store;

/// Test utilities including mock OpenAI-compatible server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use advisor::{ask_advisor, ChatRole, ChatTurn};
pub use ai::{
    AIClient, InvokeRequest, LlmBackend, MockBackend, OpenAICompatibleBackend,
};
pub use config::CaixaConfig;
pub use dashboard::{CategoryTotal, DashboardSummary, MonthlyTotals};
pub use db::{Database, TransactionFilter};
pub use error::{Error, Result};
pub use import::{
    ImportError, ImportPipeline, ImportProgress, ImportRequest, ImportStatus, ImportSummary,
    StatementFile,
};
pub use models::{
    Category, ManualTransaction, NewRecurringExpense, NewTransaction, PaymentMethod,
    RecurringExpense, RecurringExpenseUpdate, Transaction, TransactionSource, TransactionType,
};
pub use prompts::{Prompt, PromptId, PromptLibrary};
pub use recurring::{UpcomingExpense, DEFAULT_REMINDER_DAYS};
pub use storage::{FileStorage, LocalFileStorage};
pub use store::TransactionStore;
