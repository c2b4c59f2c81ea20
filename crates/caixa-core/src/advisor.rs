//! Financial advisor chat
//!
//! Free-text LLM call grounded on a dashboard summary. Earlier turns of the
//! conversation are replayed in the prompt; nothing is stored server-side.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::ai::{InvokeRequest, LlmBackend};
use crate::dashboard::DashboardSummary;
use crate::error::{Error, Result};
use crate::prompts::{PromptId, PromptLibrary};

/// Categories listed in the summary
const TOP_CATEGORIES: usize = 5;

/// Turns replayed in the prompt
const MAX_HISTORY_TURNS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// Plain-text summary of the dashboard for the prompt
pub fn summarize(summary: &DashboardSummary) -> String {
    let mut lines = vec![
        format!("Receitas: R$ {:.2}", summary.total_income),
        format!("Despesas: R$ {:.2}", summary.total_expenses),
        format!("Saldo: R$ {:.2}", summary.balance),
        format!("Transações: {}", summary.transaction_count),
    ];

    if !summary.expenses_by_category.is_empty() {
        lines.push("Maiores despesas por categoria:".to_string());
        for cat in summary.expenses_by_category.iter().take(TOP_CATEGORIES) {
            lines.push(format!(
                "- {}: R$ {:.2} ({:.1}%)",
                cat.label, cat.total, cat.percentage
            ));
        }
    }

    if let Some(last) = summary.monthly.last() {
        lines.push(format!(
            "Último mês ({}): receitas R$ {:.2}, despesas R$ {:.2}",
            last.label(),
            last.income,
            last.expenses
        ));
    }

    lines.join("\n")
}

fn format_history(history: &[ChatTurn]) -> String {
    let skip = history.len().saturating_sub(MAX_HISTORY_TURNS);
    history[skip..]
        .iter()
        .map(|turn| {
            let who = match turn.role {
                ChatRole::User => "Usuário",
                ChatRole::Assistant => "Consultor",
            };
            format!("{}: {}", who, turn.content.trim())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ask the advisor a question
pub async fn ask_advisor(
    llm: &dyn LlmBackend,
    prompts: &PromptLibrary,
    summary: &DashboardSummary,
    question: &str,
    history: &[ChatTurn],
) -> Result<String> {
    let question = question.trim();
    if question.is_empty() {
        return Err(Error::InvalidData("Question cannot be empty".into()));
    }

    let prompt = prompts.load(PromptId::FinancialAdvice)?;
    let summary_text = summarize(summary);
    let history_text = format_history(history);

    let mut vars: HashMap<&str, &str> = HashMap::new();
    vars.insert("summary", &summary_text);
    vars.insert("history", &history_text);
    vars.insert("question", question);

    let request =
        InvokeRequest::text(prompt.render_user(&vars)).with_system(prompt.render_system(&vars));
    let reply = llm.invoke(&request).await?;
    debug!(model = llm.model(), "Advisor replied");

    match reply {
        Value::String(text) => Ok(text.trim().to_string()),
        Value::Null => Err(Error::Llm("Empty reply from advisor".into())),
        other => Ok(other.to_string()),
    }
}
