//! Import progress and status
//!
//! A run moves `idle → uploading → processing → success`, or to `error`
//! from uploading/processing. `error` goes back to `uploading` on retry and
//! `success` returns to `idle`. Observers read the latest snapshot from a
//! `watch` channel; progress only moves forward within a run.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::error::{ErrorMessage, ImportError};

/// Progress checkpoints
pub mod checkpoints {
    pub const STARTED: u8 = 10;
    pub const FILE_READ: u8 = 25;
    pub const EXTRACTED: u8 = 50;
    pub const VALIDATED: u8 = 55;
    pub const CATEGORIZED: u8 = 85;
    pub const SAVING: u8 = 90;
    pub const DONE: u8 = 100;
}

/// How long a successful run stays visible before returning to idle
pub const SUCCESS_RESET_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Idle,
    Uploading,
    Processing,
    Success,
    Error,
}

impl ImportStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Uploading | Self::Processing)
    }

    pub fn can_transition_to(&self, next: ImportStatus) -> bool {
        use ImportStatus::*;
        matches!(
            (self, next),
            (Idle | Success | Error, Uploading)
                | (Uploading, Processing)
                | (Processing, Processing)
                | (Processing, Success)
                | (Uploading | Processing, Error)
                | (Success | Error, Idle)
        )
    }
}

/// Latest observable state of the importer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportProgress {
    pub status: ImportStatus,
    /// 0-100
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imported: Option<usize>,
    /// Increments with every started run
    pub run_id: u64,
}

impl ImportProgress {
    fn idle(run_id: u64) -> Self {
        Self {
            status: ImportStatus::Idle,
            progress: 0,
            message: String::new(),
            error: None,
            imported: None,
            run_id,
        }
    }
}

/// Publishes import progress to any number of observers
#[derive(Clone)]
pub struct ProgressController {
    tx: Arc<watch::Sender<ImportProgress>>,
}

impl Default for ProgressController {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ImportProgress::idle(0));
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<ImportProgress> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> ImportProgress {
        self.tx.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.tx.borrow().status.is_running()
    }

    /// Begin a run; false if one is already in progress
    pub fn start(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if !state.status.can_transition_to(ImportStatus::Uploading) {
                return false;
            }
            *state = ImportProgress {
                status: ImportStatus::Uploading,
                progress: checkpoints::STARTED,
                message: "Enviando arquivo...".to_string(),
                error: None,
                imported: None,
                run_id: state.run_id + 1,
            };
            true
        })
    }

    /// Report a processing checkpoint; ignored if it would move backwards
    pub fn advance(&self, progress: u8, message: &str) {
        let progress = progress.min(99);
        let accepted = self.tx.send_if_modified(|state| {
            if !state.status.can_transition_to(ImportStatus::Processing)
                || progress < state.progress
            {
                return false;
            }
            state.status = ImportStatus::Processing;
            state.progress = progress;
            state.message = message.to_string();
            true
        });
        if !accepted {
            debug!(progress, "Ignored progress update");
        }
    }

    pub fn succeed(&self, imported: usize) {
        self.transition(ImportStatus::Success, |state| {
            state.progress = checkpoints::DONE;
            state.message = format!("{} transações importadas com sucesso!", imported);
            state.imported = Some(imported);
        });
    }

    pub fn fail(&self, error: &ImportError) {
        let message = error.user_message();
        self.transition(ImportStatus::Error, |state| {
            state.message = message.title.clone();
            state.error = Some(message);
        });
    }

    /// Return to idle from a finished run
    pub fn reset(&self) {
        self.transition(ImportStatus::Idle, |state| {
            *state = ImportProgress::idle(state.run_id);
        });
    }

    /// Reset to idle after `delay` unless another run started meanwhile
    pub fn reset_after(&self, delay: Duration) {
        let controller = self.clone();
        let run_id = self.snapshot().run_id;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let current = controller.snapshot();
            if current.run_id == run_id && current.status == ImportStatus::Success {
                controller.reset();
            }
        });
    }

    fn transition<F>(&self, next: ImportStatus, apply: F)
    where
        F: FnOnce(&mut ImportProgress),
    {
        let accepted = self.tx.send_if_modified(|state| {
            if !state.status.can_transition_to(next) {
                return false;
            }
            state.status = next;
            apply(state);
            true
        });
        if !accepted {
            warn!(to = ?next, "Rejected import status transition");
        }
    }
}
