//! Monthly report export

use crate::dashboard::MonthlyTotals;
use crate::db::Database;
use crate::error::{Error, Result};

/// CSV header row
pub const MONTHLY_REPORT_HEADER: [&str; 4] = ["Mês", "Receitas", "Despesas", "Saldo"];

/// Render monthly totals as CSV, one row per month in the given order
pub fn monthly_report_csv(months: &[MonthlyTotals]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(MONTHLY_REPORT_HEADER)?;

    for month in months {
        writer.write_record([
            month.label(),
            format!("{:.2}", month.income),
            format!("{:.2}", month.expenses),
            format!("{:.2}", month.balance),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::InvalidData(format!("Failed to finish CSV: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| Error::InvalidData(format!("CSV is not UTF-8: {}", e)))
}

/// Suggested download name for a report covering `from..=to`
pub fn report_file_name(from: Option<&str>, to: Option<&str>) -> String {
    match (from, to) {
        (Some(f), Some(t)) => format!("relatorio_mensal_{}_{}.csv", f, t),
        (Some(f), None) => format!("relatorio_mensal_desde_{}.csv", f),
        (None, Some(t)) => format!("relatorio_mensal_ate_{}.csv", t),
        (None, None) => "relatorio_mensal.csv".to_string(),
    }
}

impl Database {
    /// Monthly income/expense/balance report as CSV
    pub fn monthly_report(&self, from: Option<&str>, to: Option<&str>) -> Result<String> {
        let summary = self.dashboard(from, to)?;
        monthly_report_csv(&summary.monthly)
    }
}
