//! Run metadata handed to agent callbacks.

use chrono::{DateTime, Utc};
use unillm_core::{identifier::generate_run_id, Usage};

/// State of an agent run as seen by callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    /// Unique run identifier.
    pub run_id: String,
    /// Run start time.
    pub start_time: DateTime<Utc>,
    /// `backend:model` identifier of the model in use.
    pub model: String,
    /// Current zero-based round.
    pub step: usize,
    /// Usage accumulated by completed rounds.
    pub usage: Usage,
}

impl RunContext {
    /// Create a context for a fresh run.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            run_id: generate_run_id(),
            start_time: Utc::now(),
            model: model.into(),
            step: 0,
            usage: Usage::default(),
        }
    }

    /// Get elapsed time since run started.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.start_time
    }
}
