//! Plan and progress stage structures.
//!
//! A [`Plan`] is the immutable DAG approved for a run; [`Progress`] is the
//! mutable execution ledger mirroring it one-to-one by stage id. The only
//! code that writes to progress is the delta-apply path in
//! [`crate::core::delta`], keeping every decision function pure.

use crate::core::delta::ProgressDelta;
use crate::core::status::{de_lenient_stage_type, PrecisionTier, StageStatus, StageType};
use crate::core::verdict::{CounterKind, Verdict};
use crate::errors::{ProgressInitError, ReproflowError};
use serde::{Deserialize, Serialize};

/// A stage as declared in a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStage {
    /// Unique stage identifier.
    pub stage_id: String,
    /// The stage category; `None` when the wire value was missing or
    /// unrecognized.
    #[serde(default, deserialize_with = "de_lenient_stage_type")]
    pub stage_type: Option<StageType>,
    /// Ids of stages this stage depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Named reproduction targets (figures, tables, quantities).
    #[serde(default)]
    pub targets: Vec<String>,
    /// Free-form target description, accepted in place of `targets`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_details: Option<serde_json::Value>,
    /// How closely the stage must match its reference result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision_requirement: Option<PrecisionTier>,
    /// Path or identifier of externally-digitized reference data, required
    /// for [`PrecisionTier::Exact`] stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digitized_reference: Option<String>,
}

impl PlanStage {
    /// Creates a plan stage with the given id and type.
    #[must_use]
    pub fn new(stage_id: impl Into<String>, stage_type: StageType) -> Self {
        Self {
            stage_id: stage_id.into(),
            stage_type: Some(stage_type),
            dependencies: Vec::new(),
            targets: Vec::new(),
            target_details: None,
            precision_requirement: None,
            digitized_reference: None,
        }
    }

    /// Sets the dependencies.
    #[must_use]
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a reproduction target.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.targets.push(target.into());
        self
    }

    /// Sets the precision requirement.
    #[must_use]
    pub fn with_precision(mut self, tier: PrecisionTier) -> Self {
        self.precision_requirement = Some(tier);
        self
    }

    /// Sets the digitized reference data identifier.
    #[must_use]
    pub fn with_digitized_reference(mut self, reference: impl Into<String>) -> Self {
        self.digitized_reference = Some(reference.into());
        self
    }

    /// Returns true if the stage declares at least one target.
    #[must_use]
    pub fn has_target(&self) -> bool {
        !self.targets.is_empty() || self.target_details.is_some()
    }
}

/// The immutable DAG of stages for a run.
///
/// Replacement only happens via replanning; the scheduler never writes here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    /// Stages in declaration order.
    pub stages: Vec<PlanStage>,
}

impl Plan {
    /// Creates a plan from a list of stages.
    #[must_use]
    pub fn new(stages: Vec<PlanStage>) -> Self {
        Self { stages }
    }

    /// Returns true if the plan has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Looks up a stage by id.
    #[must_use]
    pub fn get(&self, stage_id: &str) -> Option<&PlanStage> {
        self.stages.iter().find(|s| s.stage_id == stage_id)
    }
}

/// The transient execution ledger of a single progress stage.
///
/// This struct is the authoritative list of fields cleared when scheduling
/// moves to a different stage: replacing the whole value with
/// `StageLedger::default()` is the reset, so adding a field here
/// automatically includes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageLedger {
    /// Consecutive simulation-execution failures.
    pub execution_failures: u32,
    /// Physics-validation failures.
    pub physics_failures: u32,
    /// Code-review revision rounds.
    pub code_review_revisions: u32,
    /// Design-review revision rounds.
    pub design_review_revisions: u32,
    /// Analysis revision rounds.
    pub analysis_revisions: u32,
    /// The approved simulation design document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub design_artifact: Option<String>,
    /// The generated simulation code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_artifact: Option<String>,
    /// Reviewer feedback awaiting the next revision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_feedback: Option<String>,
    /// Free-text guidance from an escalation answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_feedback: Option<String>,
    /// The most recent phase verdict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
    /// Open issues reported by validation.
    #[serde(default)]
    pub issues: Vec<String>,
    /// Structured physics-check results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_results: Option<serde_json::Value>,
}

impl StageLedger {
    /// Returns the value of a per-stage counter; `None` for the run-level
    /// replan counter, which does not live on a stage.
    #[must_use]
    pub fn counter(&self, kind: CounterKind) -> Option<u32> {
        match kind {
            CounterKind::ExecutionFailures => Some(self.execution_failures),
            CounterKind::PhysicsFailures => Some(self.physics_failures),
            CounterKind::CodeReviewRevisions => Some(self.code_review_revisions),
            CounterKind::DesignReviewRevisions => Some(self.design_review_revisions),
            CounterKind::AnalysisRevisions => Some(self.analysis_revisions),
            CounterKind::Replans => None,
        }
    }

    /// Returns a mutable reference to a per-stage counter, if it lives here.
    pub fn counter_mut(&mut self, kind: CounterKind) -> Option<&mut u32> {
        match kind {
            CounterKind::ExecutionFailures => Some(&mut self.execution_failures),
            CounterKind::PhysicsFailures => Some(&mut self.physics_failures),
            CounterKind::CodeReviewRevisions => Some(&mut self.code_review_revisions),
            CounterKind::DesignReviewRevisions => Some(&mut self.design_review_revisions),
            CounterKind::AnalysisRevisions => Some(&mut self.analysis_revisions),
            CounterKind::Replans => None,
        }
    }
}

/// A stage in the progress ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressStage {
    /// Unique stage identifier, matching the plan stage.
    pub stage_id: String,
    /// The stage category; `None` when missing or unrecognized.
    #[serde(default, deserialize_with = "de_lenient_stage_type")]
    pub stage_type: Option<StageType>,
    /// Current execution status.
    #[serde(default)]
    pub status: StageStatus,
    /// Ids of stages this stage depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Diagnostic explaining why the stage is blocked, when it is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
    /// True when the block was an explicit human decision (a skip); pinned
    /// blocks are exempt from scheduler auto-unblock.
    #[serde(default)]
    pub pinned: bool,
    /// Transient execution state, cleared on stage transition.
    #[serde(default)]
    pub ledger: StageLedger,
    /// Cross-stage feedback consumed by the replanner; survives transition
    /// resets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planning_feedback: Option<String>,
}

impl ProgressStage {
    /// Creates a fresh progress stage mirroring a plan stage.
    #[must_use]
    pub fn from_plan_stage(plan_stage: &PlanStage) -> Self {
        Self {
            stage_id: plan_stage.stage_id.clone(),
            stage_type: plan_stage.stage_type,
            status: StageStatus::NotStarted,
            dependencies: plan_stage.dependencies.clone(),
            block_reason: None,
            pinned: false,
            ledger: StageLedger::default(),
            planning_feedback: None,
        }
    }

    /// Clears every transient execution field, leaving cross-stage planning
    /// feedback intact.
    pub fn reset_transient(&mut self) {
        self.ledger = StageLedger::default();
    }
}

/// The mutable execution ledger for a run, one stage per plan stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Progress {
    /// Stages in plan order.
    pub stages: Vec<ProgressStage>,
}

impl Progress {
    /// Initializes a progress ledger from an approved plan.
    ///
    /// # Errors
    ///
    /// Returns an error if any plan stage has an empty or duplicate id; the
    /// scheduler surfaces this as an `init_failed` decision rather than
    /// propagating it.
    pub fn from_plan(plan: &Plan) -> Result<Self, ProgressInitError> {
        let mut seen = std::collections::HashSet::new();
        for stage in &plan.stages {
            if stage.stage_id.trim().is_empty() {
                return Err(ProgressInitError::new("Plan stage has an empty stage_id"));
            }
            if !seen.insert(stage.stage_id.as_str()) {
                return Err(ProgressInitError::new(format!(
                    "Duplicate stage_id '{}' in plan",
                    stage.stage_id
                )));
            }
        }

        Ok(Self {
            stages: plan.stages.iter().map(ProgressStage::from_plan_stage).collect(),
        })
    }

    /// Returns true if the ledger has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Looks up a stage by id.
    #[must_use]
    pub fn get(&self, stage_id: &str) -> Option<&ProgressStage> {
        self.stages.iter().find(|s| s.stage_id == stage_id)
    }

    /// Looks up a stage by id, mutably.
    pub fn get_mut(&mut self, stage_id: &str) -> Option<&mut ProgressStage> {
        self.stages.iter_mut().find(|s| s.stage_id == stage_id)
    }

    /// Returns true if a dependency id exists and is terminally successful.
    #[must_use]
    pub fn dependency_satisfied(&self, dep_id: &str) -> bool {
        self.get(dep_id)
            .is_some_and(|dep| dep.status.is_terminal_success())
    }

    /// Applies a delta atomically: every patch target is verified to exist
    /// before any stage is mutated, so a bad delta leaves the ledger
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first patch whose stage id is not in the
    /// ledger.
    pub fn apply(&mut self, delta: &ProgressDelta) -> Result<(), ReproflowError> {
        if let Some(initialized) = &delta.initialized {
            self.stages = initialized.clone();
        }

        for patch in &delta.patches {
            if self.get(&patch.stage_id).is_none() {
                return Err(ReproflowError::UnknownStage {
                    stage_id: patch.stage_id.clone(),
                });
            }
        }

        for patch in &delta.patches {
            if let Some(stage) = self.get_mut(&patch.stage_id) {
                if patch.reset_transient {
                    stage.reset_transient();
                }
                if let Some(status) = patch.status {
                    stage.status = status;
                    if status != StageStatus::Blocked {
                        stage.block_reason = None;
                        stage.pinned = false;
                    }
                }
                if let Some(reason) = &patch.block_reason {
                    stage.block_reason = Some(reason.clone());
                }
                if patch.pinned {
                    stage.pinned = true;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::delta::StagePatch;
    use pretty_assertions::assert_eq;

    fn two_stage_plan() -> Plan {
        Plan::new(vec![
            PlanStage::new("mat_check", StageType::MaterialValidation).with_target("Fig2a"),
            PlanStage::new("single_rod", StageType::SingleStructure)
                .with_dependencies(["mat_check"])
                .with_target("Fig3"),
        ])
    }

    #[test]
    fn test_progress_from_plan() {
        let progress = Progress::from_plan(&two_stage_plan()).unwrap();
        assert_eq!(progress.len(), 2);
        assert_eq!(progress.stages[0].status, StageStatus::NotStarted);
        assert_eq!(progress.stages[1].dependencies, vec!["mat_check".to_string()]);
    }

    #[test]
    fn test_progress_from_plan_duplicate_id() {
        let plan = Plan::new(vec![
            PlanStage::new("dup", StageType::MaterialValidation),
            PlanStage::new("dup", StageType::SingleStructure),
        ]);
        let err = Progress::from_plan(&plan).unwrap_err();
        assert!(err.to_string().contains("dup"));
    }

    #[test]
    fn test_progress_from_plan_empty_id() {
        let plan = Plan::new(vec![PlanStage::new("  ", StageType::MaterialValidation)]);
        assert!(Progress::from_plan(&plan).is_err());
    }

    #[test]
    fn test_reset_transient_preserves_planning_feedback() {
        let mut stage = ProgressStage::from_plan_stage(&PlanStage::new(
            "s1",
            StageType::MaterialValidation,
        ));
        stage.ledger.execution_failures = 2;
        stage.ledger.code_artifact = Some("code".to_string());
        stage.ledger.issues = vec!["mesh too coarse".to_string()];
        stage.planning_feedback = Some("split the sweep".to_string());

        stage.reset_transient();

        assert_eq!(stage.ledger, StageLedger::default());
        assert_eq!(stage.planning_feedback.as_deref(), Some("split the sweep"));
    }

    #[test]
    fn test_apply_patch_updates_status_and_clears_block_reason() {
        let mut progress = Progress::from_plan(&two_stage_plan()).unwrap();
        let mut delta = ProgressDelta::default();
        delta.push(
            StagePatch::new("mat_check")
                .with_status(StageStatus::Blocked)
                .with_block_reason("missing dependency 'x'"),
        );
        progress.apply(&delta).unwrap();
        assert_eq!(progress.get("mat_check").unwrap().status, StageStatus::Blocked);
        assert!(progress.get("mat_check").unwrap().block_reason.is_some());

        let mut delta = ProgressDelta::default();
        delta.push(StagePatch::new("mat_check").with_status(StageStatus::NotStarted));
        progress.apply(&delta).unwrap();
        assert!(progress.get("mat_check").unwrap().block_reason.is_none());
    }

    #[test]
    fn test_apply_pinned_block_and_unpin_on_status_change() {
        let mut progress = Progress::from_plan(&two_stage_plan()).unwrap();
        let mut delta = ProgressDelta::default();
        delta.push(
            StagePatch::new("mat_check")
                .with_status(StageStatus::Blocked)
                .with_block_reason("Skipped by user")
                .pinning(),
        );
        progress.apply(&delta).unwrap();
        assert!(progress.get("mat_check").unwrap().pinned);

        let mut delta = ProgressDelta::default();
        delta.push(StagePatch::new("mat_check").with_status(StageStatus::NeedsRerun));
        progress.apply(&delta).unwrap();
        assert!(!progress.get("mat_check").unwrap().pinned);
    }

    #[test]
    fn test_apply_unknown_stage_is_atomic() {
        let mut progress = Progress::from_plan(&two_stage_plan()).unwrap();
        let mut delta = ProgressDelta::default();
        delta.push(StagePatch::new("mat_check").with_status(StageStatus::InProgress));
        delta.push(StagePatch::new("ghost").with_status(StageStatus::InProgress));

        assert!(progress.apply(&delta).is_err());
        // The first patch must not have been applied.
        assert_eq!(progress.get("mat_check").unwrap().status, StageStatus::NotStarted);
    }

    #[test]
    fn test_dependency_satisfied() {
        let mut progress = Progress::from_plan(&two_stage_plan()).unwrap();
        assert!(!progress.dependency_satisfied("mat_check"));

        progress.get_mut("mat_check").unwrap().status = StageStatus::CompletedPartial;
        assert!(progress.dependency_satisfied("mat_check"));
        assert!(!progress.dependency_satisfied("missing"));
    }

    #[test]
    fn test_counter_accessors() {
        let mut ledger = StageLedger::default();
        *ledger.counter_mut(CounterKind::PhysicsFailures).unwrap() += 1;
        assert_eq!(ledger.counter(CounterKind::PhysicsFailures), Some(1));
        assert!(ledger.counter(CounterKind::Replans).is_none());
    }
}
