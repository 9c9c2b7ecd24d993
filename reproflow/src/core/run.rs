//! Run-level state shared across scheduling decisions.

use crate::config::LimitConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Run-level context carried between scheduling calls.
///
/// This is the only state the decision core reads besides the plan and the
/// progress ledger: the previously active stage id determines whether a
/// selection resets transient state, and the replan counter bounds the
/// validator's revision loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Unique id for this run.
    pub run_id: Uuid,
    /// When the run started, UTC.
    pub started_at: DateTime<Utc>,
    /// Number of replans performed so far.
    pub replan_count: u32,
    /// Run-wide supervisor feedback; survives stage transitions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supervisor_feedback: Option<String>,
    /// The stage that was most recently selected for execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active_stage: Option<String>,
}

impl RunState {
    /// Creates a fresh run state with a generated id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            replan_count: 0,
            supervisor_feedback: None,
            last_active_stage: None,
        }
    }

    /// Records a replan attempt. Returns true when the configured replan
    /// limit has been reached, in which case the caller must escalate with
    /// the `replan_limit` trigger instead of looping again.
    pub fn register_replan(&mut self, limits: &LimitConfig) -> bool {
        self.replan_count += 1;
        self.replan_count >= limits.max_replans
    }

    /// Resets the replan counter, e.g. after a human grants more attempts.
    pub fn reset_replans(&mut self) {
        self.replan_count = 0;
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
