//! Reminders for recurring expenses

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use crate::db::Database;
use crate::error::Result;
use crate::models::RecurringExpense;

/// Default look-ahead for reminders
pub const DEFAULT_REMINDER_DAYS: i64 = 7;

/// A recurring expense with its next due date
#[derive(Debug, Clone, Serialize)]
pub struct UpcomingExpense {
    #[serde(flatten)]
    pub expense: RecurringExpense,
    pub due_date: NaiveDate,
    pub days_until: i64,
}

/// Due date in the month of `year`/`month`, clamped to its last day
fn due_in_month(year: i32, month: u32, due_day: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last_day = first
        .checked_add_months(Months::new(1))?
        .pred_opt()?
        .day();
    NaiveDate::from_ymd_opt(year, month, due_day.clamp(1, last_day))
}

/// First due date on or after `from`
pub fn next_due_date(due_day: u32, from: NaiveDate) -> Option<NaiveDate> {
    let this_month = due_in_month(from.year(), from.month(), due_day)?;
    if this_month >= from {
        return Some(this_month);
    }
    let next = from.with_day(1)?.checked_add_months(Months::new(1))?;
    due_in_month(next.year(), next.month(), due_day)
}

/// Active expenses due within `horizon_days` of `today` (inclusive), soonest first
pub fn upcoming_expenses(
    expenses: &[RecurringExpense],
    today: NaiveDate,
    horizon_days: i64,
) -> Vec<UpcomingExpense> {
    let mut upcoming: Vec<UpcomingExpense> = expenses
        .iter()
        .filter(|e| e.active)
        .filter_map(|e| {
            let due_date = next_due_date(e.due_day, today)?;
            let days_until = (due_date - today).num_days();
            (days_until <= horizon_days).then(|| UpcomingExpense {
                expense: e.clone(),
                due_date,
                days_until,
            })
        })
        .collect();
    upcoming.sort_by(|a, b| {
        a.due_date
            .cmp(&b.due_date)
            .then_with(|| a.expense.id.cmp(&b.expense.id))
    });
    upcoming
}

impl Database {
    pub fn upcoming_recurring_expenses(
        &self,
        today: NaiveDate,
        horizon_days: i64,
    ) -> Result<Vec<UpcomingExpense>> {
        let expenses = self.list_recurring_expenses(true)?;
        Ok(upcoming_expenses(&expenses, today, horizon_days))
    }
}
