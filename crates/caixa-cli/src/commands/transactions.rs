//! Transaction command implementations

use anyhow::{Context, Result};
use caixa_core::db::{Database, TransactionFilter};
use caixa_core::models::{Category, ManualTransaction, PaymentMethod, TransactionType};

use super::{format_brl, truncate};

/// Raw `transactions add` arguments
pub struct ManualEntry {
    pub date: String,
    pub description: String,
    pub amount: f64,
    pub transaction_type: String,
    pub category: Option<String>,
    pub payment_method: String,
    pub account: String,
    pub notes: Option<String>,
}

impl ManualEntry {
    fn parse(self) -> Result<ManualTransaction> {
        let transaction_type: TransactionType = self
            .transaction_type
            .parse()
            .map_err(anyhow::Error::msg)
            .context("--type must be 'income' or 'expense'")?;
        let category = self
            .category
            .map(|c| c.parse::<Category>().map_err(anyhow::Error::msg))
            .transpose()?;
        let payment_method: PaymentMethod = self
            .payment_method
            .parse()
            .map_err(anyhow::Error::msg)?;

        Ok(ManualTransaction {
            date: self.date,
            description: self.description,
            amount: self.amount,
            transaction_type,
            category,
            payment_method,
            bank_account: self.account,
            notes: self.notes,
        })
    }
}

pub fn cmd_transactions_list(
    db: &Database,
    limit: i64,
    transaction_type: Option<&str>,
) -> Result<()> {
    let transaction_type = transaction_type
        .map(|t| t.parse::<TransactionType>().map_err(anyhow::Error::msg))
        .transpose()?;
    let filter = TransactionFilter {
        transaction_type,
        limit: Some(limit),
        ..Default::default()
    };
    let transactions = db.list_transactions(&filter)?;

    if transactions.is_empty() {
        println!("No transactions found. Import a statement with:");
        println!("  caixa import --file extrato.pdf --account Nubank");
        return Ok(());
    }

    let total = db.count_transactions(&TransactionFilter {
        transaction_type,
        ..Default::default()
    })?;

    println!();
    println!("📝 Recent Transactions ({} of {})", transactions.len(), total);
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in transactions {
        let amount_str = if tx.amount < 0.0 {
            format!("\x1b[31m-{}\x1b[0m", format_brl(tx.amount)) // Red for expenses
        } else {
            format!("\x1b[32m+{}\x1b[0m", format_brl(tx.amount)) // Green for income
        };

        println!(
            "   [{}] {} │ {:>14} │ {:<20} │ {}",
            tx.id,
            tx.date,
            amount_str,
            tx.category.label(),
            truncate(&tx.description, 40)
        );
    }

    Ok(())
}

pub fn cmd_transactions_add(db: &Database, entry: ManualEntry) -> Result<i64> {
    let record = entry.parse()?.into_new(None)?;
    let id = db.create_transaction(&record)?;

    println!("✅ Recorded transaction {}:", id);
    println!(
        "   {} │ {} │ {} │ {}",
        record.date,
        format_brl(record.amount),
        record.category.label(),
        truncate(&record.description, 40)
    );

    Ok(id)
}

pub fn cmd_transactions_delete(db: &Database, id: i64) -> Result<()> {
    let tx = db
        .get_transaction(id)?
        .ok_or_else(|| anyhow::anyhow!("Transaction {} not found", id))?;

    db.delete_transaction(id)?;

    println!("🗑️  Deleted transaction {}:", id);
    println!(
        "   {} │ {} │ {}",
        tx.date,
        format_brl(tx.amount),
        truncate(&tx.description, 40)
    );

    Ok(())
}
