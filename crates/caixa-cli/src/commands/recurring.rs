//! Recurring expense commands

use anyhow::Result;
use caixa_core::db::Database;
use caixa_core::models::{Category, NewRecurringExpense};
use chrono::Local;

use super::{format_brl, truncate};

pub fn cmd_recurring_list(db: &Database, active_only: bool) -> Result<()> {
    let expenses = db.list_recurring_expenses(active_only)?;

    if expenses.is_empty() {
        println!("No recurring expenses. Add one with:");
        println!("  caixa recurring add \"Aluguel da loja\" --amount 2500 --due-day 10");
        return Ok(());
    }

    let monthly: f64 = expenses.iter().filter(|e| e.active).map(|e| e.amount).sum();

    println!();
    println!("🔁 Recurring Expenses");
    println!("   ─────────────────────────────────────────────────────────────");

    for expense in &expenses {
        let status = if expense.active { "  " } else { "⏸️" };
        println!(
            "   {} [{}] dia {:>2} │ {:>12} │ {:<20} │ {}",
            status,
            expense.id,
            expense.due_day,
            format_brl(expense.amount),
            expense.category.label(),
            truncate(&expense.description, 35)
        );
    }

    println!();
    println!("   Monthly total (active): {}", format_brl(monthly));

    Ok(())
}

pub fn cmd_recurring_add(
    db: &Database,
    description: &str,
    amount: f64,
    due_day: u32,
    category: Option<&str>,
    notes: Option<String>,
) -> Result<i64> {
    let category = match category {
        Some(c) => c.parse::<Category>().map_err(anyhow::Error::msg)?,
        None => Category::OutrasDespesas,
    };

    let id = db.create_recurring_expense(&NewRecurringExpense {
        description: description.to_string(),
        amount,
        category,
        due_day,
        notes,
    })?;

    println!(
        "✅ Added recurring expense {}: {} ({} every day {})",
        id,
        description,
        format_brl(amount),
        due_day
    );

    Ok(id)
}

pub fn cmd_recurring_remove(db: &Database, id: i64) -> Result<()> {
    let expense = db
        .get_recurring_expense(id)?
        .ok_or_else(|| anyhow::anyhow!("Recurring expense {} not found", id))?;

    db.delete_recurring_expense(id)?;

    println!("🗑️  Removed recurring expense {}: {}", id, expense.description);
    Ok(())
}

pub fn cmd_recurring_upcoming(db: &Database, days: i64) -> Result<()> {
    let today = Local::now().date_naive();
    let upcoming = db.upcoming_recurring_expenses(today, days.max(0))?;

    if upcoming.is_empty() {
        println!("Nothing due in the next {} days.", days);
        return Ok(());
    }

    println!();
    println!("⏰ Due in the next {} days", days);
    println!("   ─────────────────────────────────────────────────────────────");

    for item in &upcoming {
        let when = match item.days_until {
            0 => "today".to_string(),
            1 => "tomorrow".to_string(),
            n => format!("in {} days", n),
        };
        println!(
            "   {} ({:<10}) │ {:>12} │ {}",
            item.due_date.format("%d/%m/%Y"),
            when,
            format_brl(item.expense.amount),
            truncate(&item.expense.description, 40)
        );
    }

    let total: f64 = upcoming.iter().map(|i| i.expense.amount).sum();
    println!();
    println!("   Total due: {}", format_brl(total));

    Ok(())
}
