//! Dashboard aggregation over the ledger

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::db::{Database, TransactionFilter};
use crate::error::Result;
use crate::models::{Category, Transaction, TransactionType};

/// Expense total for one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: Category,
    pub label: String,
    pub total: f64,
    pub count: usize,
    /// Share of all expenses, 0-100
    pub percentage: f64,
}

/// Totals for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotals {
    pub year: i32,
    pub month: u32,
    pub income: f64,
    /// Positive magnitude
    pub expenses: f64,
    pub balance: f64,
}

impl MonthlyTotals {
    /// `MM/YYYY`
    pub fn label(&self) -> String {
        format!("{:02}/{}", self.month, self.year)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub from: Option<String>,
    pub to: Option<String>,
    pub total_income: f64,
    /// Positive magnitude
    pub total_expenses: f64,
    pub balance: f64,
    pub transaction_count: usize,
    /// Descending by total
    pub expenses_by_category: Vec<CategoryTotal>,
    /// Ascending by month
    pub monthly: Vec<MonthlyTotals>,
}

impl DashboardSummary {
    /// Aggregate a set of transactions
    ///
    /// Classification follows the transaction type, not the amount sign.
    /// Rows whose date is not `YYYY-MM-DD` count toward the totals but not
    /// the monthly series.
    pub fn from_transactions(
        transactions: &[Transaction],
        from: Option<String>,
        to: Option<String>,
    ) -> Self {
        let mut total_income = 0.0;
        let mut total_expenses = 0.0;
        let mut by_category: HashMap<Category, (f64, usize)> = HashMap::new();
        let mut by_month: BTreeMap<(i32, u32), (f64, f64)> = BTreeMap::new();

        for tx in transactions {
            let magnitude = tx.amount.abs();
            let month = parse_month(&tx.date);

            match tx.transaction_type {
                TransactionType::Income => {
                    total_income += magnitude;
                    if let Some(key) = month {
                        by_month.entry(key).or_default().0 += magnitude;
                    }
                }
                TransactionType::Expense => {
                    total_expenses += magnitude;
                    let entry = by_category.entry(tx.category).or_default();
                    entry.0 += magnitude;
                    entry.1 += 1;
                    if let Some(key) = month {
                        by_month.entry(key).or_default().1 += magnitude;
                    }
                }
            }
        }

        let mut expenses_by_category: Vec<CategoryTotal> = by_category
            .into_iter()
            .map(|(category, (total, count))| CategoryTotal {
                category,
                label: category.label().to_string(),
                total: round_cents(total),
                count,
                percentage: if total_expenses > 0.0 {
                    round_cents(total / total_expenses * 100.0)
                } else {
                    0.0
                },
            })
            .collect();
        expenses_by_category.sort_by(|a, b| {
            b.total
                .total_cmp(&a.total)
                .then_with(|| a.category.as_str().cmp(b.category.as_str()))
        });

        let monthly = by_month
            .into_iter()
            .map(|((year, month), (income, expenses))| MonthlyTotals {
                year,
                month,
                income: round_cents(income),
                expenses: round_cents(expenses),
                balance: round_cents(income - expenses),
            })
            .collect();

        Self {
            from,
            to,
            total_income: round_cents(total_income),
            total_expenses: round_cents(total_expenses),
            balance: round_cents(total_income - total_expenses),
            transaction_count: transactions.len(),
            expenses_by_category,
            monthly,
        }
    }
}

impl Database {
    /// Dashboard for an optional inclusive date range
    pub fn dashboard(&self, from: Option<&str>, to: Option<&str>) -> Result<DashboardSummary> {
        let filter =
            TransactionFilter::date_range(from.map(str::to_string), to.map(str::to_string));
        let transactions = self.list_transactions(&filter)?;
        Ok(DashboardSummary::from_transactions(
            &transactions,
            filter.from,
            filter.to,
        ))
    }
}

fn parse_month(date: &str) -> Option<(i32, u32)> {
    use chrono::Datelike;
    let day = NaiveDate::parse_from_str(date.get(..10)?, "%Y-%m-%d").ok()?;
    Some((day.year(), day.month()))
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
