//! Retry and revision limits for the control core.

use crate::core::{CounterKind, EscalationTrigger};
use serde::{Deserialize, Serialize};

/// Configured maxima for every retry/revision counter.
///
/// When a counter reaches its maximum the pipeline must escalate to a human
/// rather than loop silently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Maximum consecutive execution failures per stage.
    pub max_execution_failures: u32,
    /// Maximum physics-validation failures per stage.
    pub max_physics_failures: u32,
    /// Maximum code-review revision rounds per stage.
    pub max_code_review_revisions: u32,
    /// Maximum design-review revision rounds per stage.
    pub max_design_review_revisions: u32,
    /// Maximum analysis revision rounds per stage.
    pub max_analysis_revisions: u32,
    /// Maximum replans per run.
    pub max_replans: u32,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_execution_failures: 3,
            max_physics_failures: 3,
            max_code_review_revisions: 3,
            max_design_review_revisions: 3,
            max_analysis_revisions: 3,
            max_replans: 3,
        }
    }
}

impl LimitConfig {
    /// Creates a config with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the execution-failure limit.
    #[must_use]
    pub fn with_max_execution_failures(mut self, max: u32) -> Self {
        self.max_execution_failures = max;
        self
    }

    /// Sets the physics-failure limit.
    #[must_use]
    pub fn with_max_physics_failures(mut self, max: u32) -> Self {
        self.max_physics_failures = max;
        self
    }

    /// Sets the code-review revision limit.
    #[must_use]
    pub fn with_max_code_review_revisions(mut self, max: u32) -> Self {
        self.max_code_review_revisions = max;
        self
    }

    /// Sets the design-review revision limit.
    #[must_use]
    pub fn with_max_design_review_revisions(mut self, max: u32) -> Self {
        self.max_design_review_revisions = max;
        self
    }

    /// Sets the analysis revision limit.
    #[must_use]
    pub fn with_max_analysis_revisions(mut self, max: u32) -> Self {
        self.max_analysis_revisions = max;
        self
    }

    /// Sets the replan limit.
    #[must_use]
    pub fn with_max_replans(mut self, max: u32) -> Self {
        self.max_replans = max;
        self
    }

    /// Returns the configured maximum for a counter.
    #[must_use]
    pub fn limit_for(&self, kind: CounterKind) -> u32 {
        match kind {
            CounterKind::ExecutionFailures => self.max_execution_failures,
            CounterKind::PhysicsFailures => self.max_physics_failures,
            CounterKind::CodeReviewRevisions => self.max_code_review_revisions,
            CounterKind::DesignReviewRevisions => self.max_design_review_revisions,
            CounterKind::AnalysisRevisions => self.max_analysis_revisions,
            CounterKind::Replans => self.max_replans,
        }
    }

    /// Returns the escalation trigger raised when a counter hits its limit.
    #[must_use]
    pub fn trigger_for(kind: CounterKind) -> EscalationTrigger {
        match kind {
            CounterKind::ExecutionFailures => EscalationTrigger::ExecutionFailureLimit,
            CounterKind::PhysicsFailures => EscalationTrigger::PhysicsFailureLimit,
            CounterKind::CodeReviewRevisions => EscalationTrigger::CodeReviewLimit,
            CounterKind::DesignReviewRevisions => EscalationTrigger::DesignReviewLimit,
            CounterKind::AnalysisRevisions => EscalationTrigger::AnalysisLimit,
            CounterKind::Replans => EscalationTrigger::ReplanLimit,
        }
    }
}
