//! Statement extraction via one structured LLM call

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::ai::{InvokeRequest, LlmBackend};
use crate::error::Result;
use crate::models::{parse_brl_amount, TransactionType};
use crate::prompts::Prompt;

use super::error::ImportError;
use super::reader::StatementContent;

/// Response shape requested from the LLM
#[derive(Debug, JsonSchema)]
#[allow(dead_code)]
struct ExtractionResponse {
    transactions: Vec<ExtractedTransaction>,
}

#[derive(Debug, JsonSchema)]
#[allow(dead_code)]
struct ExtractedTransaction {
    /// Date as YYYY-MM-DD
    date: String,
    description: String,
    /// Absolute value as a plain decimal
    amount: f64,
    #[schemars(rename = "type")]
    transaction_type: TransactionType,
}

/// JSON Schema for the extraction response
pub fn extraction_schema() -> Result<Value> {
    let schema = schemars::schema_for!(ExtractionResponse);
    Ok(serde_json::to_value(&schema)?)
}

/// One transaction as the LLM returned it
///
/// Every field is optional on the wire; the validator decides what survives.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawExtractedTransaction {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub amount: Option<f64>,
    #[serde(default, rename = "type")]
    pub transaction_type: Option<String>,
}

/// Accept a JSON number or a string in Brazilian notation
fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_brl_amount(&s),
        _ => None,
    })
}

/// Run the extraction call and return candidate transactions in order
pub async fn extract_transactions(
    llm: &dyn LlmBackend,
    prompt: &Prompt,
    content: &StatementContent,
    current_year: i32,
) -> std::result::Result<Vec<RawExtractedTransaction>, ImportError> {
    let year = current_year.to_string();
    let mut vars: HashMap<&str, &str> = HashMap::new();
    vars.insert("current_year", &year);

    let request = match content {
        StatementContent::Text(text) => {
            vars.insert("statement", text.as_str());
            InvokeRequest::structured(
                prompt.render_user(&vars),
                extraction_schema().map_err(ImportError::Llm)?,
            )
        }
        StatementContent::FileUrl(url) => InvokeRequest::structured(
            prompt.render_user(&vars),
            extraction_schema().map_err(ImportError::Llm)?,
        )
        .with_file_url(url.clone()),
    }
    .with_system(prompt.render_system(&vars));

    let value = llm.invoke(&request).await.map_err(ImportError::Llm)?;
    let items = parse_extraction(value);
    debug!(count = items.len(), "Extraction returned transactions");

    if items.is_empty() {
        return Err(ImportError::NoTransactionsFound);
    }
    Ok(items)
}

/// Pull the transaction list out of the LLM result
///
/// A missing or malformed `transactions` array yields nothing. Individual
/// malformed entries become empty records so the validator drops them.
fn parse_extraction(value: Value) -> Vec<RawExtractedTransaction> {
    let Some(Value::Array(entries)) = value.get("transactions").cloned() else {
        if !value.is_null() {
            warn!("Extraction response has no transactions array");
        }
        return Vec::new();
    };

    entries
        .into_iter()
        .map(|entry| serde_json::from_value(entry).unwrap_or_default())
        .collect()
}

/// The recognized transaction type, if any
pub(crate) fn recognized_type(raw: &RawExtractedTransaction) -> Option<TransactionType> {
    raw.transaction_type.as_deref()?.parse().ok()
}
