//! Prompt library for LLM calls
//!
//! Prompts are loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/caixa/prompts/overrides/)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Each prompt file carries YAML frontmatter followed by `# System` and
//! `# User` sections. Variables use `{{name}}`; `{{#if name}}...{{/if}}`
//! blocks are dropped when the variable is missing or empty.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Embedded default prompts (compiled into binary)
mod defaults {
    pub const EXTRACT_TRANSACTIONS: &str =
        include_str!("../../../prompts/extract_transactions.md");
    pub const CATEGORIZE_TRANSACTIONS: &str =
        include_str!("../../../prompts/categorize_transactions.md");
    pub const FINANCIAL_ADVICE: &str = include_str!("../../../prompts/financial_advice.md");
}

/// Known prompt IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// Bank statement to transaction list
    ExtractTransactions,
    /// One batch of transactions to categories
    CategorizeTransactions,
    /// Free-text advisor chat
    FinancialAdvice,
}

impl PromptId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtractTransactions => "extract_transactions",
            Self::CategorizeTransactions => "categorize_transactions",
            Self::FinancialAdvice => "financial_advice",
        }
    }

    fn default_content(&self) -> &'static str {
        match self {
            Self::ExtractTransactions => defaults::EXTRACT_TRANSACTIONS,
            Self::CategorizeTransactions => defaults::CATEGORIZE_TRANSACTIONS,
            Self::FinancialAdvice => defaults::FINANCIAL_ADVICE,
        }
    }
}

/// Prompt frontmatter metadata
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    pub id: String,
    /// Version number for tracking changes
    pub version: u32,
    /// structured_extraction, classification or conversation
    pub task_type: String,
}

/// A loaded prompt with metadata and content
#[derive(Debug, Clone)]
pub struct Prompt {
    pub metadata: PromptMetadata,
    /// The prompt body (system + user sections)
    pub content: String,
    pub is_override: bool,
}

impl Prompt {
    pub fn system_section(&self) -> Option<&str> {
        extract_section(&self.content, "# System")
    }

    pub fn user_section(&self) -> Option<&str> {
        extract_section(&self.content, "# User")
    }

    /// Render the system section with variables, empty if absent
    pub fn render_system(&self, vars: &HashMap<&str, &str>) -> String {
        self.system_section()
            .map(|s| render_template(s, vars))
            .unwrap_or_default()
    }

    /// Render the user section with variables (whole body if no sections)
    pub fn render_user(&self, vars: &HashMap<&str, &str>) -> String {
        match self.user_section() {
            Some(user) => render_template(user, vars),
            None => render_template(&self.content, vars),
        }
    }
}

/// Prompt library resolving overrides against the embedded defaults
#[derive(Clone)]
pub struct PromptLibrary {
    override_dir: Option<PathBuf>,
}

impl PromptLibrary {
    /// Create a new prompt library with default paths
    pub fn new() -> Self {
        match default_prompts_dir() {
            Some(dir) => Self::with_override_dir(dir),
            None => Self::embedded_only(),
        }
    }

    /// Create a prompt library with a custom override directory
    pub fn with_override_dir(path: PathBuf) -> Self {
        Self {
            override_dir: Some(path),
        }
    }

    /// Create a prompt library with no override directory (embedded only)
    pub fn embedded_only() -> Self {
        Self { override_dir: None }
    }

    /// Load a prompt, override first, then default
    pub fn load(&self, id: PromptId) -> Result<Prompt> {
        if let Some(ref override_dir) = self.override_dir {
            let override_path = override_dir.join(format!("{}.md", id.as_str()));
            if override_path.exists() {
                let content = fs::read_to_string(&override_path).map_err(|e| {
                    Error::InvalidData(format!("Failed to read prompt override: {}", e))
                })?;
                let (metadata, body) = parse_prompt(&content)?;
                debug!(
                    prompt = id.as_str(),
                    path = %override_path.display(),
                    "Using prompt override"
                );
                return Ok(Prompt {
                    metadata,
                    content: body,
                    is_override: true,
                });
            }
        }

        let (metadata, body) = parse_prompt(id.default_content())?;
        Ok(Prompt {
            metadata,
            content: body,
            is_override: false,
        })
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Default prompts override directory
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("caixa").join("prompts").join("overrides"))
}

/// Parse a prompt file into metadata and body
fn parse_prompt(content: &str) -> Result<(PromptMetadata, String)> {
    let content = content.trim();

    if !content.starts_with("---") {
        return Err(Error::InvalidData(
            "Prompt must start with YAML frontmatter (---)".into(),
        ));
    }

    let rest = &content[3..];
    let end = rest.find("---").ok_or_else(|| {
        Error::InvalidData("Prompt frontmatter not closed (missing second ---)".into())
    })?;

    let frontmatter = rest[..end].trim();
    let body = rest[end + 3..].trim();

    let metadata: PromptMetadata = serde_yaml::from_str(frontmatter)
        .map_err(|e| Error::InvalidData(format!("Invalid prompt frontmatter: {}", e)))?;

    Ok((metadata, body.to_string()))
}

/// Extract a section from the prompt content
fn extract_section<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let start = content.find(header)?;
    let after_header = &content[start + header.len()..];
    let end = after_header.find("\n# ").unwrap_or(after_header.len());
    Some(after_header[..end].trim())
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{\{(\w+)\}\}").expect("valid placeholder regex"))
}

/// Resolve conditionals, then substitute `{{var}}` placeholders in one pass
///
/// Substituted values are never rescanned, so they cannot open a block or
/// expand another variable. Unknown placeholders are left as written.
fn render_template(template: &str, vars: &HashMap<&str, &str>) -> String {
    let resolved = resolve_conditionals(template, vars);
    placeholder_regex()
        .replace_all(&resolved, |caps: &Captures| match vars.get(&caps[1]) {
            Some(value) => (*value).to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Keep or drop `{{#if var}}...{{/if}}` blocks
fn resolve_conditionals(content: &str, vars: &HashMap<&str, &str>) -> String {
    let mut result = content.to_string();

    while let Some(if_start) = result.find("{{#if ") {
        let var_start = if_start + 6;
        let Some(var_end) = result[var_start..].find("}}") else {
            break;
        };
        let var_name = result[var_start..var_start + var_end].trim().to_string();
        let block_start = var_start + var_end + 2;
        let Some(endif_pos) = result[block_start..].find("{{/if}}") else {
            break;
        };
        let full_end = block_start + endif_pos + 7;

        let keep = vars.get(var_name.as_str()).is_some_and(|v| !v.is_empty());
        result = if keep {
            format!(
                "{}{}{}",
                &result[..if_start],
                &result[block_start..block_start + endif_pos],
                &result[full_end..]
            )
        } else {
            format!("{}{}", &result[..if_start], &result[full_end..])
        };
    }

    result
}
