//! Maps categorized transactions to stored records

use chrono::NaiveDate;

use crate::models::{Category, NewTransaction, PaymentMethod, TransactionSource};

use super::validation::ValidatedTransaction;

/// Note attached to every imported record
pub fn import_note(today: NaiveDate) -> String {
    format!("Importado automaticamente em {}", today.format("%d/%m/%Y"))
}

/// Zip items with their categories and apply the storage conventions
///
/// Expenses are stored negative and income positive whatever sign the
/// extraction produced.
pub fn to_new_transactions(
    items: &[ValidatedTransaction],
    categories: &[Category],
    bank_account: &str,
    today: NaiveDate,
    created_by: Option<&str>,
) -> Vec<NewTransaction> {
    let notes = import_note(today);
    items
        .iter()
        .zip(categories)
        .map(|(item, category)| NewTransaction {
            date: item.date.clone(),
            description: item.description.clone(),
            amount: item.transaction_type.signed(item.amount),
            transaction_type: item.transaction_type,
            category: *category,
            payment_method: PaymentMethod::Transferencia,
            bank_account: bank_account.to_string(),
            notes: Some(notes.clone()),
            source: TransactionSource::Import,
            created_by: created_by.map(str::to_string),
        })
        .collect()
}
