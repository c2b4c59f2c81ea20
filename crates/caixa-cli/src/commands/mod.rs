//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init and shared utilities (open_db, llm_from_env)
//! - `import` - Bank statement import through the LLM pipeline
//! - `transactions` - Transaction commands (list, add, delete)
//! - `recurring` - Recurring expense commands (list, add, remove, upcoming)
//! - `reports` - Dashboard, monthly CSV report and advisor questions
//! - `serve` - Web server command
//! - `status` - Database status

pub mod core;
pub mod import;
pub mod recurring;
pub mod reports;
pub mod serve;
pub mod status;
pub mod transactions;

// Re-export command functions for main.rs
pub use core::*;
pub use import::*;
pub use recurring::*;
pub use reports::*;
pub use serve::*;
pub use status::*;
pub use transactions::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Format a magnitude as Brazilian currency (R$ 1.234,56)
pub fn format_brl(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let reais = (cents / 100).to_string();

    let mut grouped = String::new();
    for (i, ch) in reais.chars().enumerate() {
        if i > 0 && (reais.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("R$ {},{:02}", grouped, cents % 100)
}
