//! Bank statement import
//!
//! File → reader → LLM extraction → validation → batch categorization →
//! sign normalization → one bulk write, with progress published on a
//! `watch` channel throughout.

pub mod categorizer;
mod error;
pub mod extraction;
pub mod persistence;
mod pipeline;
pub mod reader;
pub mod status;
pub mod validation;

pub use categorizer::{BatchCategorizer, CategorizationStats};
pub use error::{ErrorMessage, ImportError};
pub use extraction::RawExtractedTransaction;
pub use pipeline::{ImportPipeline, ImportRequest, ImportSummary};
pub use reader::{StatementContent, StatementFile};
pub use status::{ImportProgress, ImportStatus, ProgressController, SUCCESS_RESET_DELAY};
pub use validation::ValidatedTransaction;
