//! Batch categorization
//!
//! Validated transactions are sent to the LLM in contiguous batches, one
//! call at a time. Each item carries its index within the batch and the
//! reply must echo every index exactly once. A batch whose call fails, or
//! whose reply does not line up with the request, gets the per-type default
//! category for all of its items; the run always continues.

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::ai::parsing::parse_structured;
use crate::ai::{InvokeRequest, LlmBackend};
use crate::error::{Error, Result};
use crate::models::{Category, TransactionType};
use crate::prompts::Prompt;

use super::validation::ValidatedTransaction;

/// Response shape requested from the LLM
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CategorizationResponse {
    pub categories: Vec<CategoryAssignment>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CategoryAssignment {
    /// Position of the transaction within the batch
    pub index: usize,
    pub category: String,
}

/// Counters for one categorization pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategorizationStats {
    pub batches: usize,
    pub failed_batches: usize,
    /// Items whose label was unknown or of the wrong kind
    pub defaulted_items: usize,
}

/// JSON Schema for the categorization response
pub fn categorization_schema() -> Result<Value> {
    let schema = schemars::schema_for!(CategorizationResponse);
    Ok(serde_json::to_value(&schema)?)
}

/// Sequential batch categorizer
pub struct BatchCategorizer<'a> {
    llm: &'a dyn LlmBackend,
    prompt: &'a Prompt,
    batch_size: usize,
}

impl<'a> BatchCategorizer<'a> {
    pub fn new(llm: &'a dyn LlmBackend, prompt: &'a Prompt, batch_size: usize) -> Self {
        Self {
            llm,
            prompt,
            batch_size: batch_size.max(1),
        }
    }

    /// Categorize every item, returning labels aligned 1:1 with the input
    ///
    /// `on_batch(done, total)` runs after each batch.
    pub async fn categorize<F>(
        &self,
        items: &[ValidatedTransaction],
        mut on_batch: F,
    ) -> (Vec<Category>, CategorizationStats)
    where
        F: FnMut(usize, usize),
    {
        let total = items.len().div_ceil(self.batch_size);
        let mut stats = CategorizationStats::default();
        let mut categories = Vec::with_capacity(items.len());

        for (batch_index, chunk) in items.chunks(self.batch_size).enumerate() {
            stats.batches += 1;
            match self.categorize_chunk(chunk).await {
                Ok((labels, defaulted)) => {
                    stats.defaulted_items += defaulted;
                    categories.extend(labels);
                }
                Err(e) => {
                    warn!(
                        batch = batch_index,
                        size = chunk.len(),
                        error = %e,
                        "Categorization batch failed, using default categories"
                    );
                    stats.failed_batches += 1;
                    categories.extend(
                        chunk
                            .iter()
                            .map(|t| Category::default_for(t.transaction_type)),
                    );
                }
            }
            on_batch(batch_index + 1, total);
        }

        debug!(
            items = items.len(),
            batches = stats.batches,
            failed = stats.failed_batches,
            "Categorization complete"
        );
        (categories, stats)
    }

    async fn categorize_chunk(
        &self,
        chunk: &[ValidatedTransaction],
    ) -> Result<(Vec<Category>, usize)> {
        let listing = format_listing(chunk);
        let income = format_taxonomy(TransactionType::Income);
        let expense = format_taxonomy(TransactionType::Expense);

        let mut vars: HashMap<&str, &str> = HashMap::new();
        vars.insert("transactions", &listing);
        vars.insert("income_categories", &income);
        vars.insert("expense_categories", &expense);

        let request = InvokeRequest::structured(
            self.prompt.render_user(&vars),
            categorization_schema()?,
        )
        .with_system(self.prompt.render_system(&vars));

        let value = self.llm.invoke(&request).await?;
        let response: CategorizationResponse = parse_structured(value)?;
        align_categories(chunk, response.categories)
    }
}

/// Match a reply back to its batch by index
///
/// Fails unless there is exactly one entry per item. Unknown labels and
/// labels of the wrong kind fall back to the per-type default one by one.
fn align_categories(
    chunk: &[ValidatedTransaction],
    assignments: Vec<CategoryAssignment>,
) -> Result<(Vec<Category>, usize)> {
    if assignments.len() != chunk.len() {
        return Err(Error::InvalidData(format!(
            "expected {} categories, got {}",
            chunk.len(),
            assignments.len()
        )));
    }

    let mut slots: Vec<Option<Category>> = vec![None; chunk.len()];
    let mut defaulted = 0;

    for assignment in assignments {
        let item = chunk.get(assignment.index).ok_or_else(|| {
            Error::InvalidData(format!("category index {} out of range", assignment.index))
        })?;
        if slots[assignment.index].is_some() {
            return Err(Error::InvalidData(format!(
                "category index {} repeated",
                assignment.index
            )));
        }

        let category = match assignment.category.parse::<Category>() {
            Ok(c) if c.kind() == item.transaction_type => c,
            _ => {
                defaulted += 1;
                Category::default_for(item.transaction_type)
            }
        };
        slots[assignment.index] = Some(category);
    }

    // Equal lengths and no repeats means every slot is filled
    let categories = slots.into_iter().flatten().collect::<Vec<_>>();
    if categories.len() != chunk.len() {
        return Err(Error::InvalidData("category indexes incomplete".into()));
    }
    Ok((categories, defaulted))
}

fn format_listing(chunk: &[ValidatedTransaction]) -> String {
    chunk
        .iter()
        .enumerate()
        .map(|(i, t)| {
            format!(
                "{} | {} | {} | {:.2}",
                i,
                t.description,
                t.transaction_type,
                t.amount.abs()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_taxonomy(kind: TransactionType) -> String {
    Category::for_type(kind)
        .iter()
        .map(|c| format!("- {} ({})", c.as_str(), c.label()))
        .collect::<Vec<_>>()
        .join("\n")
}
