//! Stage selection: the central decision function of the control core.
//!
//! [`select`] is pure and deterministic over its inputs: it reads the plan,
//! the progress ledger, and the run context, and returns a decision plus the
//! [`ProgressDelta`] that must be applied with it. Calling it twice on
//! unchanged input yields the same decision.

mod gates;
mod hierarchy;

pub use hierarchy::ValidationHierarchy;

use crate::core::{
    Plan, Progress, ProgressDelta, ProgressStage, RunState, StagePatch, StageStatus, StageType,
};
use gates::GateOutcome;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How many stuck stage ids a deadlock decision carries for diagnostics.
const MAX_STUCK_IDS: usize = 5;

/// The decision returned by one scheduling pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum SelectionResult {
    /// A stage was selected for execution.
    Selected {
        /// The selected stage id.
        stage_id: String,
        /// The selected stage's type.
        stage_type: Option<StageType>,
        /// Whether transient state was reset for this selection.
        reset_state: bool,
    },
    /// Every stage completed successfully or partially.
    Complete,
    /// No remaining stage can ever become runnable.
    Deadlock {
        /// Up to [`MAX_STUCK_IDS`] ids of permanently stuck stages.
        stuck: Vec<String>,
    },
    /// Neither the plan nor the progress ledger has any stages.
    NoStages,
    /// Initializing progress from the plan failed.
    InitFailed {
        /// What went wrong.
        error: String,
    },
    /// Nothing was selectable this pass; retry after external state changes.
    Idle,
}

/// A scheduling decision together with the progress mutations it implies.
///
/// The caller must apply `delta` if and only if it acts on `decision`; the
/// two commit together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingOutcome {
    /// The decision.
    pub decision: SelectionResult,
    /// Progress mutations produced while deciding (initialization,
    /// auto-unblocks, permanent blocks, and the selection itself).
    pub delta: ProgressDelta,
}

impl SchedulingOutcome {
    fn new(decision: SelectionResult, delta: ProgressDelta) -> Self {
        Self { decision, delta }
    }
}

/// Selects the next stage to run, or reports why none can be selected.
///
/// Single deterministic pass, no backtracking: rerun stages first in ledger
/// order, then fresh or auto-unblockable stages gated by dependencies, type,
/// hierarchy, and type order. See the crate documentation for the full gate
/// semantics.
#[must_use]
pub fn select(plan: &Plan, progress: &Progress, run: &RunState) -> SchedulingOutcome {
    let mut delta = ProgressDelta::default();

    // Lazy initialization of the progress ledger from the plan. Failures are
    // reported as a decision, never raised past this boundary.
    let working: Progress;
    if progress.is_empty() && !plan.is_empty() {
        match Progress::from_plan(plan) {
            Ok(initialized) => {
                delta.initialized = Some(initialized.stages.clone());
                working = initialized;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Progress initialization failed");
                return SchedulingOutcome::new(
                    SelectionResult::InitFailed {
                        error: e.to_string(),
                    },
                    ProgressDelta::default(),
                );
            }
        }
    } else if progress.is_empty() {
        return SchedulingOutcome::new(SelectionResult::NoStages, delta);
    } else {
        working = progress.clone();
    }

    let hierarchy = ValidationHierarchy::from_progress(&working);

    // Priority 1: rerun stages, in ledger order. Rerun always resets.
    for stage in &working.stages {
        if gates::rerun_eligible(stage, &working, &hierarchy) {
            tracing::debug!(stage_id = %stage.stage_id, "Selected rerun stage");
            delta.push(
                StagePatch::new(&stage.stage_id)
                    .with_status(StageStatus::InProgress)
                    .resetting(),
            );
            return SchedulingOutcome::new(
                SelectionResult::Selected {
                    stage_id: stage.stage_id.clone(),
                    stage_type: stage.stage_type,
                    reset_state: true,
                },
                delta,
            );
        }
    }

    // Priority 2: fresh and auto-unblockable stages, in ledger order.
    let mut working = working;
    for index in 0..working.stages.len() {
        let stage = working.stages[index].clone();

        match stage.status {
            StageStatus::CompletedSuccess
            | StageStatus::CompletedPartial
            | StageStatus::CompletedFailed
            | StageStatus::InProgress
            | StageStatus::Invalidated
            | StageStatus::NeedsRerun => continue,
            StageStatus::Blocked => {
                // Pinned blocks are a human decision and never self-heal.
                let unblockable = !stage.pinned
                    && stage.stage_type.is_some()
                    && stage
                        .dependencies
                        .iter()
                        .all(|dep| working.dependency_satisfied(dep));
                if !unblockable {
                    continue;
                }
                tracing::debug!(stage_id = %stage.stage_id, "Auto-unblocking stage");
                delta.push(StagePatch::new(&stage.stage_id).with_status(StageStatus::NotStarted));
                working.stages[index].status = StageStatus::NotStarted;
                working.stages[index].block_reason = None;
            }
            StageStatus::NotStarted => {}
        }
        let stage = working.stages[index].clone();

        match gates::dependency_gate(&stage, &working) {
            GateOutcome::Block(reason) => {
                mark_blocked(&mut working, &mut delta, index, reason);
                continue;
            }
            GateOutcome::Skip => continue,
            GateOutcome::Pass => {}
        }

        if let GateOutcome::Block(reason) = gates::type_gate(&stage) {
            mark_blocked(&mut working, &mut delta, index, reason);
            continue;
        }
        // The remaining gates need a concrete type; the type gate passed.
        let Some(stage_type) = stage.stage_type else {
            continue;
        };

        match gates::hierarchy_gate(stage_type, &working, &hierarchy) {
            GateOutcome::Block(reason) => {
                mark_blocked(&mut working, &mut delta, index, reason);
                continue;
            }
            GateOutcome::Skip => continue,
            GateOutcome::Pass => {}
        }

        if gates::type_order_gate(stage_type, &working) != GateOutcome::Pass {
            continue;
        }

        // Selected. Transient state is preserved when re-selecting the stage
        // that was already active, so in-stage revision loops keep their
        // feedback and counters.
        let reset_state = run.last_active_stage.as_deref() != Some(stage.stage_id.as_str());
        let mut patch = StagePatch::new(&stage.stage_id).with_status(StageStatus::InProgress);
        if reset_state {
            patch = patch.resetting();
        }
        delta.push(patch);

        tracing::debug!(
            stage_id = %stage.stage_id,
            stage_type = %stage_type,
            reset_state,
            "Selected stage"
        );
        return SchedulingOutcome::new(
            SelectionResult::Selected {
                stage_id: stage.stage_id.clone(),
                stage_type: Some(stage_type),
                reset_state,
            },
            delta,
        );
    }

    // No selection: classify as complete, deadlock, or a quiet wait.
    SchedulingOutcome::new(classify_stall(&working), delta)
}

fn mark_blocked(working: &mut Progress, delta: &mut ProgressDelta, index: usize, reason: String) {
    let stage = &mut working.stages[index];
    // Idempotent: a stage already blocked for this reason is left alone.
    if stage.status == StageStatus::Blocked {
        return;
    }
    tracing::warn!(stage_id = %stage.stage_id, reason = %reason, "Permanently blocking stage");
    delta.push(
        StagePatch::new(&stage.stage_id)
            .with_status(StageStatus::Blocked)
            .with_block_reason(reason.clone()),
    );
    stage.status = StageStatus::Blocked;
    stage.block_reason = Some(reason);
}

/// Classifies a pass that selected nothing.
///
/// Doom propagates transitively: a stage is stuck if it is terminally failed
/// or blocked, references a missing dependency, or depends on a stuck stage.
/// Deadlock is declared only when no remaining stage could ever run.
fn classify_stall(working: &Progress) -> SelectionResult {
    if working
        .stages
        .iter()
        .all(|s| s.status.is_terminal_success())
    {
        return SelectionResult::Complete;
    }

    let ids: HashSet<&str> = working.stages.iter().map(|s| s.stage_id.as_str()).collect();
    let mut doomed: HashSet<&str> = working
        .stages
        .iter()
        .filter(|s| {
            s.status.is_permanently_stuck()
                || s.dependencies.iter().any(|d| !ids.contains(d.as_str()))
        })
        .map(|s| s.stage_id.as_str())
        .collect();

    loop {
        let grew: Vec<&str> = working
            .stages
            .iter()
            .filter(|s| {
                !doomed.contains(s.stage_id.as_str())
                    && s.dependencies.iter().any(|d| doomed.contains(d.as_str()))
            })
            .map(|s| s.stage_id.as_str())
            .collect();
        if grew.is_empty() {
            break;
        }
        doomed.extend(grew);
    }

    let remaining: Vec<&ProgressStage> = working
        .stages
        .iter()
        .filter(|s| !s.status.is_terminal_success())
        .collect();

    let anything_running = remaining
        .iter()
        .any(|s| s.status == StageStatus::InProgress);
    let potentially_runnable = remaining.iter().any(|s| {
        s.status.is_potentially_runnable() && !doomed.contains(s.stage_id.as_str())
    });

    if !anything_running && !potentially_runnable && !doomed.is_empty() {
        let stuck: Vec<String> = remaining
            .iter()
            .filter(|s| doomed.contains(s.stage_id.as_str()))
            .take(MAX_STUCK_IDS)
            .map(|s| s.stage_id.clone())
            .collect();
        tracing::warn!(stuck = ?stuck, "Scheduling deadlock detected");
        return SelectionResult::Deadlock { stuck };
    }

    SelectionResult::Idle
}
