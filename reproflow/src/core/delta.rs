//! Progress deltas: the pure-function output of the decision core.
//!
//! The scheduler and escalation machine never mutate progress directly; they
//! return a [`ProgressDelta`] that the caller merges with
//! [`crate::core::Progress::apply`]. A decision and its mutation therefore
//! commit together or not at all.

use crate::core::stage::ProgressStage;
use crate::core::status::StageStatus;
use serde::{Deserialize, Serialize};

/// A single-stage mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StagePatch {
    /// The stage to mutate.
    pub stage_id: String,
    /// New status, if changing. Setting any non-blocked status also clears
    /// the block diagnostic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StageStatus>,
    /// Diagnostic recorded when marking the stage blocked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
    /// Whether to clear the stage's transient execution ledger.
    #[serde(default)]
    pub reset_transient: bool,
    /// Marks the block as a human decision, exempt from auto-unblock.
    #[serde(default)]
    pub pinned: bool,
}

impl StagePatch {
    /// Creates an empty patch for a stage.
    #[must_use]
    pub fn new(stage_id: impl Into<String>) -> Self {
        Self {
            stage_id: stage_id.into(),
            status: None,
            block_reason: None,
            reset_transient: false,
            pinned: false,
        }
    }

    /// Sets the new status.
    #[must_use]
    pub fn with_status(mut self, status: StageStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the block diagnostic.
    #[must_use]
    pub fn with_block_reason(mut self, reason: impl Into<String>) -> Self {
        self.block_reason = Some(reason.into());
        self
    }

    /// Requests a transient-state reset.
    #[must_use]
    pub fn resetting(mut self) -> Self {
        self.reset_transient = true;
        self
    }

    /// Marks the block as pinned by a human.
    #[must_use]
    pub fn pinning(mut self) -> Self {
        self.pinned = true;
        self
    }
}

/// The full set of progress mutations produced by one decision.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressDelta {
    /// Fresh ledger contents when the scheduler initialized progress from
    /// the plan this pass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initialized: Option<Vec<ProgressStage>>,
    /// Per-stage mutations, applied in order.
    #[serde(default)]
    pub patches: Vec<StagePatch>,
}

impl ProgressDelta {
    /// Returns true if the delta carries no mutation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.initialized.is_none() && self.patches.is_empty()
    }

    /// Appends a patch.
    pub fn push(&mut self, patch: StagePatch) {
        self.patches.push(patch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_builder() {
        let patch = StagePatch::new("s1")
            .with_status(StageStatus::Blocked)
            .with_block_reason("unknown stage type")
            .resetting();

        assert_eq!(patch.stage_id, "s1");
        assert_eq!(patch.status, Some(StageStatus::Blocked));
        assert!(patch.reset_transient);
    }

    #[test]
    fn test_delta_is_empty() {
        let mut delta = ProgressDelta::default();
        assert!(delta.is_empty());

        delta.push(StagePatch::new("s1"));
        assert!(!delta.is_empty());
    }

    #[test]
    fn test_delta_serializes_without_empty_fields() {
        let delta = ProgressDelta::default();
        let json = serde_json::to_string(&delta).unwrap();
        assert_eq!(json, r#"{"patches":[]}"#);
    }
}
