//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod chat;
pub mod dashboard;
pub mod imports;
pub mod meta;
pub mod recurring;
pub mod transactions;

// Re-export all handlers for use in router
pub use chat::*;
pub use dashboard::*;
pub use imports::*;
pub use meta::*;
pub use recurring::*;
pub use transactions::*;

use chrono::NaiveDate;

use crate::AppError;

/// Check an optional `YYYY-MM-DD` query parameter
pub(crate) fn validate_date_param(
    value: Option<String>,
    name: &str,
) -> Result<Option<String>, AppError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(|_| Some(s.to_string()))
            .map_err(|_| {
                AppError::bad_request(&format!("Invalid {} date format (use YYYY-MM-DD)", name))
            }),
    }
}
