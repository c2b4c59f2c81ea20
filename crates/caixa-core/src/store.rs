//! Persistence seam for the import pipeline
//!
//! The importer only needs "write these records in one call". `Database`
//! implements it with a single SQL transaction; tests substitute stores
//! that count calls or fail on demand.

use async_trait::async_trait;

use crate::db::Database;
use crate::error::Result;
use crate::models::NewTransaction;

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Persist all records in one call, returning their ids in input order
    async fn bulk_create(&self, transactions: &[NewTransaction]) -> Result<Vec<i64>>;
}

#[async_trait]
impl TransactionStore for Database {
    async fn bulk_create(&self, transactions: &[NewTransaction]) -> Result<Vec<i64>> {
        self.bulk_create_transactions(transactions)
    }
}
