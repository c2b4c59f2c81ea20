//! Drops extracted records that cannot become transactions

use serde::Serialize;
use tracing::debug;

use crate::models::TransactionType;

use super::extraction::{recognized_type, RawExtractedTransaction};

/// A record with every required field present and a non-zero amount
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedTransaction {
    /// Passed through as extracted; the format is not checked
    pub date: String,
    pub description: String,
    /// Unsigned as far as the LLM followed instructions; sign is fixed on save
    pub amount: f64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
}

/// Keep records with date, description, amount and a known type, amount != 0
///
/// Order is preserved.
pub fn validate_transactions(raw: &[RawExtractedTransaction]) -> Vec<ValidatedTransaction> {
    let valid: Vec<ValidatedTransaction> = raw.iter().filter_map(validate_one).collect();
    debug!(
        extracted = raw.len(),
        valid = valid.len(),
        "Validated extracted transactions"
    );
    valid
}

fn validate_one(raw: &RawExtractedTransaction) -> Option<ValidatedTransaction> {
    let date = raw.date.as_deref().map(str::trim).filter(|d| !d.is_empty())?;
    let description = raw
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())?;
    let amount = raw.amount.filter(|a| *a != 0.0 && a.is_finite())?;
    let transaction_type = recognized_type(raw)?;

    Some(ValidatedTransaction {
        date: date.to_string(),
        description: description.to_string(),
        amount,
        transaction_type,
    })
}
