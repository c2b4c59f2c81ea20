//! Transaction operations

use rusqlite::{params, params_from_iter, OptionalExtension, ToSql};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewTransaction, Transaction, TransactionType};

const SELECT_COLUMNS: &str = "id, date, description, amount, type, category, payment_method, \
     bank_account, notes, source, created_by, created_at";

/// Filters for listing transactions
///
/// Dates compare as `YYYY-MM-DD` strings and both bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub transaction_type: Option<TransactionType>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub bank_account: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TransactionFilter {
    pub fn date_range(from: Option<String>, to: Option<String>) -> Self {
        Self {
            from,
            to,
            ..Default::default()
        }
    }

    fn where_clause(&self) -> (String, Vec<Box<dyn ToSql>>) {
        let mut conditions = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(kind) = self.transaction_type {
            conditions.push("type = ?");
            values.push(Box::new(kind.as_str()));
        }
        if let Some(ref from) = self.from {
            conditions.push("date >= ?");
            values.push(Box::new(from.clone()));
        }
        if let Some(ref to) = self.to {
            // Inclusive on the day even when stored dates carry a time part
            conditions.push("substr(date, 1, 10) <= ?");
            values.push(Box::new(to.clone()));
        }
        if let Some(ref account) = self.bank_account {
            conditions.push("bank_account = ?");
            values.push(Box::new(account.clone()));
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        (clause, values)
    }
}

fn insert_sql() -> &'static str {
    r#"
    INSERT INTO transactions (date, description, amount, type, category, payment_method, bank_account, notes, source, created_by)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    "#
}

impl Database {
    /// Insert one transaction
    pub fn create_transaction(&self, tx: &NewTransaction) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            insert_sql(),
            params![
                tx.date,
                tx.description,
                tx.amount,
                tx.transaction_type.as_str(),
                tx.category.as_str(),
                tx.payment_method.as_str(),
                tx.bank_account,
                tx.notes,
                tx.source.as_str(),
                tx.created_by,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert many transactions atomically
    ///
    /// Either every row is written or none is.
    pub fn bulk_create_transactions(&self, txs: &[NewTransaction]) -> Result<Vec<i64>> {
        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(txs.len());

        {
            let mut stmt = db_tx.prepare(insert_sql())?;
            for tx in txs {
                stmt.execute(params![
                    tx.date,
                    tx.description,
                    tx.amount,
                    tx.transaction_type.as_str(),
                    tx.category.as_str(),
                    tx.payment_method.as_str(),
                    tx.bank_account,
                    tx.notes,
                    tx.source.as_str(),
                    tx.created_by,
                ])?;
                ids.push(db_tx.last_insert_rowid());
            }
        }

        db_tx.commit()?;
        Ok(ids)
    }

    /// List transactions, newest first
    pub fn list_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let (clause, mut values) = filter.where_clause();

        let mut sql = format!(
            "SELECT {} FROM transactions{} ORDER BY date DESC, id DESC",
            SELECT_COLUMNS, clause
        );
        if filter.limit.is_some() || filter.offset.is_some() {
            sql.push_str(" LIMIT ? OFFSET ?");
            values.push(Box::new(filter.limit.unwrap_or(-1)));
            values.push(Box::new(filter.offset.unwrap_or(0)));
        }

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), Self::row_to_transaction)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn count_transactions(&self, filter: &TransactionFilter) -> Result<i64> {
        let conn = self.conn()?;
        let (clause, values) = filter.where_clause();
        let sql = format!("SELECT COUNT(*) FROM transactions{}", clause);
        let count = conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(count)
    }

    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let tx = conn
            .query_row(
                &format!("SELECT {} FROM transactions WHERE id = ?", SELECT_COLUMNS),
                params![id],
                Self::row_to_transaction,
            )
            .optional()?;
        Ok(tx)
    }

    /// Delete a transaction
    pub fn delete_transaction(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM transactions WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("transaction {}", id)));
        }
        Ok(())
    }

    pub(crate) fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
        let type_str: String = row.get(4)?;
        let category_str: String = row.get(5)?;
        let payment_str: String = row.get(6)?;
        let source_str: String = row.get(9)?;
        let created_at_str: String = row.get(11)?;

        let transaction_type: TransactionType = type_str
            .parse()
            .unwrap_or(TransactionType::Expense);

        Ok(Transaction {
            id: row.get(0)?,
            date: row.get(1)?,
            description: row.get(2)?,
            amount: row.get(3)?,
            transaction_type,
            category: category_str
                .parse()
                .unwrap_or_else(|_| crate::models::Category::default_for(transaction_type)),
            payment_method: payment_str.parse().unwrap_or_default(),
            bank_account: row.get(7)?,
            notes: row.get(8)?,
            source: source_str.parse().unwrap_or_default(),
            created_by: row.get(10)?,
            created_at: parse_datetime(&created_at_str),
        })
    }
}
