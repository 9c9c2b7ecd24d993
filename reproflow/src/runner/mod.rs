//! Serial control loop around the decision core.
//!
//! The driver owns the merge step the core itself never performs: it calls
//! [`select`], applies the returned delta atomically, hands the selected
//! stage to the external [`StageWorker`], tracks failure counters against
//! [`LimitConfig`], and pauses on an [`Escalation`] until the [`HumanPort`]
//! answer resolves it. One stage runs at a time, so the hierarchy and
//! type-order invariants hold by construction.

use crate::config::LimitConfig;
use crate::core::{
    CounterKind, EscalationTrigger, Plan, Progress, ProgressDelta, ProgressStage, RunState,
    StagePatch, StageStatus,
};
use crate::errors::ReproflowError;
use crate::escalation::{resolve, Escalation};
use crate::scheduler::{select, SelectionResult};
use async_trait::async_trait;

/// What the external worker reports after one attempt at a stage.
///
/// The design/code/execution/validation sub-phases live behind this boundary;
/// the core only sees their result and which counter a failure charges.
#[derive(Debug, Clone)]
pub struct StageReport {
    /// The resulting stage status for a finished attempt.
    pub status: StageStatus,
    /// The counter charged when the attempt failed a phase; `None` for a
    /// terminal report.
    pub failed_phase: Option<CounterKind>,
    /// Reviewer or executor feedback for the next revision.
    pub feedback: Option<String>,
}

impl StageReport {
    /// A fully successful stage.
    #[must_use]
    pub fn success() -> Self {
        Self {
            status: StageStatus::CompletedSuccess,
            failed_phase: None,
            feedback: None,
        }
    }

    /// A stage that completed with partial validation.
    #[must_use]
    pub fn partial() -> Self {
        Self {
            status: StageStatus::CompletedPartial,
            failed_phase: None,
            feedback: None,
        }
    }

    /// A terminally failed stage (no further attempts).
    #[must_use]
    pub fn failed() -> Self {
        Self {
            status: StageStatus::CompletedFailed,
            failed_phase: None,
            feedback: None,
        }
    }

    /// A failed attempt charging the given counter; the stage returns to the
    /// selectable pool for another try.
    #[must_use]
    pub fn phase_failure(kind: CounterKind, feedback: impl Into<String>) -> Self {
        Self {
            status: StageStatus::NotStarted,
            failed_phase: Some(kind),
            feedback: Some(feedback.into()),
        }
    }
}

/// Port to the external stage executor (LLM calls, simulation runs).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StageWorker: Send + Sync {
    /// Runs one attempt of a stage. `reset` is true when the scheduler
    /// cleared the stage's transient state for this selection.
    async fn run_stage(&self, stage: ProgressStage, reset: bool) -> StageReport;
}

/// Port to whatever UI surfaces escalation questions to a human.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HumanPort: Send + Sync {
    /// Asks the questions and returns prompt/answer pairs in display order.
    async fn ask(&self, questions: Vec<String>) -> Vec<(String, String)>;
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEnd {
    /// Every stage completed successfully or partially.
    Complete,
    /// A human answered STOP.
    Stopped,
    /// No remaining stage can ever run; carries stuck stage ids.
    Deadlock(Vec<String>),
    /// The plan and progress had no stages.
    NoStages,
    /// Progress initialization failed.
    InitFailed(String),
    /// Nothing selectable and nothing running; external state must change
    /// (e.g. an invalidated stage flipped to needs-rerun) before resuming.
    Stalled,
}

/// Drives a run to completion over a worker and a human port.
pub struct WorkflowDriver<W, H> {
    worker: W,
    human: H,
    limits: LimitConfig,
}

impl<W: StageWorker, H: HumanPort> WorkflowDriver<W, H> {
    /// Creates a driver with default limits.
    #[must_use]
    pub fn new(worker: W, human: H) -> Self {
        Self {
            worker,
            human,
            limits: LimitConfig::default(),
        }
    }

    /// Overrides the limit configuration.
    #[must_use]
    pub fn with_limits(mut self, limits: LimitConfig) -> Self {
        self.limits = limits;
        self
    }

    /// Runs the workflow until it completes, stops, or stalls.
    ///
    /// # Errors
    ///
    /// Returns an error only for internal inconsistencies (a delta naming a
    /// stage the ledger does not have); every expected failure mode is a
    /// [`RunEnd`] value.
    pub async fn run(
        &self,
        plan: &Plan,
        progress: &mut Progress,
        run: &mut RunState,
    ) -> Result<RunEnd, ReproflowError> {
        loop {
            let outcome = select(plan, progress, run);
            match outcome.decision {
                SelectionResult::Selected {
                    stage_id,
                    reset_state,
                    ..
                } => {
                    progress.apply(&outcome.delta)?;
                    run.last_active_stage = Some(stage_id.clone());

                    let stage = progress
                        .get(&stage_id)
                        .cloned()
                        .ok_or_else(|| ReproflowError::UnknownStage {
                            stage_id: stage_id.clone(),
                        })?;
                    tracing::info!(stage_id = %stage_id, reset_state, "Executing stage");
                    let report = self.worker.run_stage(stage, reset_state).await;

                    if self.handle_report(progress, run, &stage_id, report).await? {
                        return Ok(RunEnd::Stopped);
                    }
                }
                SelectionResult::Complete => return Ok(RunEnd::Complete),
                SelectionResult::Deadlock { stuck } => {
                    progress.apply(&outcome.delta)?;
                    let escalation = Escalation::raise(
                        EscalationTrigger::DeadlockDetected,
                        vec![format!(
                            "No remaining stage can run; stuck stages: {}.",
                            stuck.join(", ")
                        )],
                    );
                    if self.escalate(escalation, progress, run).await? {
                        return Ok(RunEnd::Stopped);
                    }
                    return Ok(RunEnd::Deadlock(stuck));
                }
                SelectionResult::NoStages => return Ok(RunEnd::NoStages),
                SelectionResult::InitFailed { error } => {
                    return Ok(RunEnd::InitFailed(error));
                }
                SelectionResult::Idle => {
                    progress.apply(&outcome.delta)?;
                    tracing::info!("Nothing selectable this pass; stalling");
                    return Ok(RunEnd::Stalled);
                }
            }
        }
    }

    /// Merges a worker report: terminal statuses are committed, phase
    /// failures charge their counter and escalate at the limit. Returns true
    /// when the run should stop.
    async fn handle_report(
        &self,
        progress: &mut Progress,
        run: &mut RunState,
        stage_id: &str,
        report: StageReport,
    ) -> Result<bool, ReproflowError> {
        match report.failed_phase {
            None => {
                let mut delta = ProgressDelta::default();
                delta.push(StagePatch::new(stage_id).with_status(report.status));
                progress.apply(&delta)?;
                Ok(false)
            }
            Some(kind) => {
                let stage =
                    progress
                        .get_mut(stage_id)
                        .ok_or_else(|| ReproflowError::UnknownStage {
                            stage_id: stage_id.to_string(),
                        })?;
                if let Some(counter) = stage.ledger.counter_mut(kind) {
                    *counter += 1;
                }
                stage.status = StageStatus::NotStarted;
                stage.ledger.review_feedback = report.feedback;

                let count = stage.ledger.counter(kind).unwrap_or(0);
                if count >= self.limits.limit_for(kind) {
                    let escalation = Escalation::for_counter(kind, stage_id, count);
                    self.escalate(escalation, progress, run).await
                } else {
                    Ok(false)
                }
            }
        }
    }

    /// Surfaces an escalation to the human and merges the resolution,
    /// re-asking until an answer is understood. Returns true when the run
    /// should stop.
    async fn escalate(
        &self,
        escalation: Escalation,
        progress: &mut Progress,
        run: &mut RunState,
    ) -> Result<bool, ReproflowError> {
        let mut escalation = escalation;
        loop {
            let trigger = escalation.trigger.clone();
            let responses = self.human.ask(escalation.questions.clone()).await;
            let resolution = resolve(
                escalation,
                &responses,
                progress,
                run.last_active_stage.as_deref(),
            );

            progress.apply(&resolution.delta)?;
            match resolution.reset_counter {
                Some(CounterKind::Replans) => run.reset_replans(),
                Some(kind) => {
                    if let Some(stage) = run
                        .last_active_stage
                        .as_deref()
                        .and_then(|id| progress.get_mut(id))
                    {
                        if let Some(counter) = stage.ledger.counter_mut(kind) {
                            *counter = 0;
                        }
                    }
                }
                None => {}
            }
            if let Some(feedback) = &resolution.feedback {
                if let Some(stage) = run
                    .last_active_stage
                    .as_deref()
                    .and_then(|id| progress.get_mut(id))
                {
                    stage.ledger.user_feedback = Some(feedback.clone());
                }
            }

            match resolution.questions {
                Some(questions) => {
                    // Not understood: stay paused with fresh questions.
                    escalation = Escalation::raise(trigger, questions);
                }
                None => return Ok(resolution.should_stop),
            }
        }
    }
}
