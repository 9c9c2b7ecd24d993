//! Error types for the reproflow control core.
//!
//! Nothing in the core is fatal to the host process: structural plan errors
//! become revision feedback, scheduling blocks become progress state, and
//! internal faults are converted into structured decision values at the
//! boundary. These types cover the residual cases where an operation itself
//! cannot produce a result.

use thiserror::Error;

/// The main error type for reproflow operations.
#[derive(Debug, Error)]
pub enum ReproflowError {
    /// Initializing the progress ledger from the plan failed.
    #[error("{0}")]
    ProgressInit(#[from] ProgressInitError),

    /// A delta referenced a stage id that is not in the progress ledger.
    #[error("Stage '{stage_id}' not found in progress ledger")]
    UnknownStage {
        /// The missing stage id.
        stage_id: String,
    },

    /// The external stage worker failed outside its own error channel.
    #[error("Stage worker error: {0}")]
    Worker(String),
}

/// Error raised when the progress ledger cannot be built from a plan.
#[derive(Debug, Clone, Error)]
#[error("Progress initialization failed: {message}")]
pub struct ProgressInitError {
    /// What went wrong.
    pub message: String,
}

impl ProgressInitError {
    /// Creates a new initialization error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_init_error_display() {
        let err = ProgressInitError::new("Duplicate stage_id 'a' in plan");
        assert_eq!(
            err.to_string(),
            "Progress initialization failed: Duplicate stage_id 'a' in plan"
        );
    }

    #[test]
    fn test_unknown_stage_display() {
        let err = ReproflowError::UnknownStage {
            stage_id: "ghost".to_string(),
        };
        assert_eq!(err.to_string(), "Stage 'ghost' not found in progress ledger");
    }
}
