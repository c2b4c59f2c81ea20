//! Financial advisor chat handler

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::validate_date_param;
use crate::{AppError, AppState};
use caixa_core::advisor::{ask_advisor, ChatTurn};
use caixa_core::Error;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    /// Earlier turns, oldest first
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    /// Period the advisor summary covers (defaults to everything)
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
}

/// POST /api/chat - Ask the financial advisor
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let ai = state
        .ai
        .as_ref()
        .ok_or_else(|| AppError::unavailable("LLM backend not configured"))?;

    let from = validate_date_param(body.from, "from")?;
    let to = validate_date_param(body.to, "to")?;
    let summary = state.db.dashboard(from.as_deref(), to.as_deref())?;

    match ask_advisor(ai, &state.prompts, &summary, &body.question, &body.history).await {
        Ok(answer) => Ok(Json(ChatResponse { answer })),
        Err(Error::InvalidData(msg)) => Err(AppError::bad_request(&msg)),
        Err(e) => {
            warn!(error = %e, "Advisor call failed");
            Err(AppError::unavailable(
                "O consultor não está disponível no momento. Tente novamente.",
            ))
        }
    }
}
