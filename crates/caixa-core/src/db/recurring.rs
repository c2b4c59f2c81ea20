//! Recurring expense operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Category, NewRecurringExpense, RecurringExpense, RecurringExpenseUpdate};

const SELECT_COLUMNS: &str = "id, description, amount, category, due_day, active, notes, created_at";

impl Database {
    /// Create a recurring expense
    pub fn create_recurring_expense(&self, expense: &NewRecurringExpense) -> Result<i64> {
        expense.validate()?;
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO recurring_expenses (description, amount, category, due_day, notes)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                expense.description.trim(),
                expense.amount,
                expense.category.as_str(),
                expense.due_day,
                expense.notes,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List recurring expenses ordered by due day
    pub fn list_recurring_expenses(&self, active_only: bool) -> Result<Vec<RecurringExpense>> {
        let conn = self.conn()?;
        let sql = if active_only {
            format!(
                "SELECT {} FROM recurring_expenses WHERE active = 1 ORDER BY due_day, id",
                SELECT_COLUMNS
            )
        } else {
            format!(
                "SELECT {} FROM recurring_expenses ORDER BY due_day, id",
                SELECT_COLUMNS
            )
        };
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::row_to_recurring)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn get_recurring_expense(&self, id: i64) -> Result<Option<RecurringExpense>> {
        let conn = self.conn()?;
        let expense = conn
            .query_row(
                &format!("SELECT {} FROM recurring_expenses WHERE id = ?", SELECT_COLUMNS),
                params![id],
                Self::row_to_recurring,
            )
            .optional()?;
        Ok(expense)
    }

    /// Apply a partial update and return the stored result
    pub fn update_recurring_expense(
        &self,
        id: i64,
        update: &RecurringExpenseUpdate,
    ) -> Result<RecurringExpense> {
        update.validate()?;
        let mut expense = self
            .get_recurring_expense(id)?
            .ok_or_else(|| Error::NotFound(format!("recurring expense {}", id)))?;

        if let Some(ref description) = update.description {
            expense.description = description.trim().to_string();
        }
        if let Some(amount) = update.amount {
            expense.amount = amount;
        }
        if let Some(category) = update.category {
            expense.category = category;
        }
        if let Some(day) = update.due_day {
            expense.due_day = day;
        }
        if let Some(active) = update.active {
            expense.active = active;
        }
        if update.notes.is_some() {
            expense.notes = update.notes.clone();
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE recurring_expenses
            SET description = ?, amount = ?, category = ?, due_day = ?, active = ?, notes = ?
            WHERE id = ?
            "#,
            params![
                expense.description,
                expense.amount,
                expense.category.as_str(),
                expense.due_day,
                expense.active,
                expense.notes,
                id,
            ],
        )?;
        Ok(expense)
    }

    pub fn delete_recurring_expense(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM recurring_expenses WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("recurring expense {}", id)));
        }
        Ok(())
    }

    fn row_to_recurring(row: &rusqlite::Row) -> rusqlite::Result<RecurringExpense> {
        let category_str: String = row.get(3)?;
        let active_int: i64 = row.get(5)?;
        let created_at_str: String = row.get(7)?;
        Ok(RecurringExpense {
            id: row.get(0)?,
            description: row.get(1)?,
            amount: row.get(2)?,
            category: category_str.parse().unwrap_or(Category::OutrasDespesas),
            due_day: row.get(4)?,
            active: active_int != 0,
            notes: row.get(6)?,
            created_at: parse_datetime(&created_at_str),
        })
    }
}
