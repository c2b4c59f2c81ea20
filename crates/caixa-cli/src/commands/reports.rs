//! Dashboard, report and advisor commands

use std::path::Path;

use anyhow::{Context, Result};
use caixa_core::advisor::ask_advisor;
use caixa_core::ai::AIClient;
use caixa_core::dashboard::DashboardSummary;
use caixa_core::db::Database;
use caixa_core::prompts::PromptLibrary;
use chrono::NaiveDate;

use super::format_brl;

/// Reject dates the store would silently compare as strings
fn check_date(value: Option<&str>, flag: &str) -> Result<()> {
    if let Some(v) = value {
        NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .with_context(|| format!("Invalid {} date '{}' (use YYYY-MM-DD)", flag, v))?;
    }
    Ok(())
}

fn load_summary(db: &Database, from: Option<&str>, to: Option<&str>) -> Result<DashboardSummary> {
    check_date(from, "--from")?;
    check_date(to, "--to")?;
    Ok(db.dashboard(from, to)?)
}

pub fn cmd_dashboard(db: &Database, from: Option<&str>, to: Option<&str>) -> Result<()> {
    let summary = load_summary(db, from, to)?;

    println!();
    println!("╭─────────────────────────────────────────╮");
    println!("│           💰 Caixa Dashboard            │");
    println!("╰─────────────────────────────────────────╯");
    println!();
    if from.is_some() || to.is_some() {
        println!(
            "  Period:          {} → {}",
            from.unwrap_or("início"),
            to.unwrap_or("hoje")
        );
    }
    println!("  Transactions:    {}", summary.transaction_count);
    println!();
    println!("  📈 Income:       {}", format_brl(summary.total_income));
    println!("  📉 Expenses:     {}", format_brl(summary.total_expenses));
    let sign = if summary.balance < 0.0 { "-" } else { "" };
    println!("  💵 Balance:      {}{}", sign, format_brl(summary.balance));

    if !summary.expenses_by_category.is_empty() {
        println!();
        println!("  Top expense categories:");
        for cat in summary.expenses_by_category.iter().take(5) {
            println!(
                "     {:<22} {:>14}  {:>5.1}%",
                cat.label,
                format_brl(cat.total),
                cat.percentage
            );
        }
    }

    if let Some(last) = summary.monthly.last() {
        println!();
        println!(
            "  Last month ({}): {} in, {} out",
            last.label(),
            format_brl(last.income),
            format_brl(last.expenses)
        );
    }
    println!();

    Ok(())
}

pub fn cmd_report(
    db: &Database,
    output: Option<&Path>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<()> {
    check_date(from, "--from")?;
    check_date(to, "--to")?;
    let csv = db.monthly_report(from, to)?;

    match output {
        Some(path) => {
            std::fs::write(path, &csv)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            let months = csv.lines().count().saturating_sub(1);
            println!(
                "✅ Wrote monthly report ({} months) to {}",
                months,
                path.display()
            );
        }
        None => print!("{}", csv),
    }

    Ok(())
}

pub async fn cmd_ask(
    db: &Database,
    ai: &AIClient,
    question: &str,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<String> {
    let summary = load_summary(db, from, to)?;
    let prompts = PromptLibrary::new();

    let answer = ask_advisor(ai, &prompts, &summary, question, &[])
        .await
        .context("Advisor request failed")?;

    println!();
    println!("💬 {}", answer);
    println!();

    Ok(answer)
}
