//! Escalation state machine: asking a human for help and resuming after the
//! answer.
//!
//! An [`Escalation`] pauses stage progress when a retry or revision budget is
//! exhausted. [`resolve`] interprets the free-text answer and emits a
//! [`Resolution`]: the next verdict, optional progress mutations, and which
//! counter (if any) to reset. Resolving always clears the pending trigger:
//! `resolve` consumes the escalation, so a stale trigger can never outlive
//! its own questions.

mod keywords;

pub use keywords::contains_keyword;

use crate::core::{
    CounterKind, EscalationTrigger, Progress, ProgressDelta, StagePatch, StageStatus, Verdict,
};
use serde::{Deserialize, Serialize};

/// A pending request for human input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Escalation {
    /// The limit or condition that triggered the escalation.
    pub trigger: EscalationTrigger,
    /// Questions to surface to the human; never empty.
    pub questions: Vec<String>,
    /// Whether the workflow is paused waiting for an answer.
    pub awaiting_input: bool,
}

impl Escalation {
    /// Raises an escalation. The question list is guaranteed non-empty: when
    /// the caller supplies none, a generic prompt for the trigger is used.
    #[must_use]
    pub fn raise(trigger: EscalationTrigger, questions: Vec<String>) -> Self {
        let questions = if questions.is_empty() {
            vec![format!(
                "The workflow hit '{trigger}' and needs guidance. {}",
                keyword_reminder(&trigger)
            )]
        } else {
            questions
        };
        tracing::info!(trigger = %trigger, "Escalating to human");
        Self {
            trigger,
            questions,
            awaiting_input: true,
        }
    }

    /// Raises a limit escalation for a stage counter with standard questions.
    #[must_use]
    pub fn for_counter(kind: CounterKind, stage_id: &str, count: u32) -> Self {
        let trigger = crate::config::LimitConfig::trigger_for(kind);
        let questions = vec![
            format!(
                "Stage '{stage_id}' reached the {trigger} after {count} attempt(s)."
            ),
            keyword_reminder(&trigger),
        ];
        Self::raise(trigger, questions)
    }
}

/// The outcome of interpreting a human answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    /// The next scheduling verdict.
    pub verdict: Verdict,
    /// Feedback to record for the active stage, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    /// Fresh questions when the answer was not understood.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<String>>,
    /// Whether the whole run should stop.
    pub should_stop: bool,
    /// Progress mutations implied by the answer.
    pub delta: ProgressDelta,
    /// Counter to reset to zero, when the answer grants more attempts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_counter: Option<CounterKind>,
}

/// Interprets a human answer to a pending escalation.
///
/// Only the last answer (by insertion order) is read. Keyword precedence:
/// `RETRY`/`GUIDANCE`, then `ACCEPT`/`PARTIAL` (physics trigger only), then
/// `SKIP`, then `STOP`. An unrecognized answer re-asks with a fresh question
/// list and mutates nothing. Consuming the escalation clears the pending
/// trigger in every case.
#[must_use]
pub fn resolve(
    escalation: Escalation,
    responses: &[(String, String)],
    progress: &Progress,
    active_stage: Option<&str>,
) -> Resolution {
    let trigger = escalation.trigger;

    if let EscalationTrigger::Unknown(name) = &trigger {
        tracing::warn!(trigger = %name, "Unknown escalation trigger; continuing");
        return Resolution {
            verdict: Verdict::OkContinue,
            feedback: Some(format!(
                "Unrecognized escalation trigger '{name}'; continuing the workflow"
            )),
            questions: None,
            should_stop: false,
            delta: ProgressDelta::default(),
            reset_counter: None,
        };
    }

    let answer = responses.last().map_or("", |(_, v)| v.as_str());

    if trigger.is_retry_capable()
        && (contains_keyword(answer, "RETRY") || contains_keyword(answer, "GUIDANCE"))
    {
        tracing::info!(trigger = %trigger, "User granted a retry");
        return Resolution {
            verdict: trigger.retry_verdict(),
            feedback: Some(format!("User guidance: {answer}")),
            questions: None,
            should_stop: false,
            delta: ProgressDelta::default(),
            reset_counter: trigger.counter(),
        };
    }

    if trigger == EscalationTrigger::PhysicsFailureLimit
        && (contains_keyword(answer, "ACCEPT") || contains_keyword(answer, "PARTIAL"))
    {
        // The progress update is wrapped: a missing active stage is surfaced
        // as feedback, never raised.
        let mut delta = ProgressDelta::default();
        let feedback = match lookup_active(progress, active_stage) {
            Ok(stage_id) => {
                delta.push(
                    StagePatch::new(stage_id).with_status(StageStatus::CompletedPartial),
                );
                format!("User accepted partial physics results: {answer}")
            }
            Err(problem) => format!("Could not mark stage partial: {problem}"),
        };
        return Resolution {
            verdict: Verdict::RetryAnalyze,
            feedback: Some(feedback),
            questions: None,
            should_stop: false,
            delta,
            reset_counter: None,
        };
    }

    if contains_keyword(answer, "SKIP") {
        let mut delta = ProgressDelta::default();
        let feedback = match lookup_active(progress, active_stage) {
            Ok(stage_id) => {
                delta.push(
                    StagePatch::new(stage_id)
                        .with_status(StageStatus::Blocked)
                        .with_block_reason(format!("Skipped by user after {trigger}"))
                        .pinning(),
                );
                format!("Stage skipped by user after {trigger}")
            }
            Err(problem) => format!("Could not skip stage: {problem}"),
        };
        return Resolution {
            verdict: Verdict::OkContinue,
            feedback: Some(feedback),
            questions: None,
            should_stop: false,
            delta,
            reset_counter: None,
        };
    }

    if contains_keyword(answer, "STOP") {
        return Resolution {
            verdict: Verdict::AllComplete,
            feedback: Some("Workflow stopped by user".to_string()),
            questions: None,
            should_stop: true,
            delta: ProgressDelta::default(),
            reset_counter: None,
        };
    }

    // No recognized keyword: re-ask with a fresh reminder, mutate nothing.
    Resolution {
        verdict: Verdict::AskUser,
        feedback: None,
        questions: Some(vec![
            format!("Your answer to '{trigger}' was not understood."),
            keyword_reminder(&trigger),
        ]),
        should_stop: false,
        delta: ProgressDelta::default(),
        reset_counter: None,
    }
}

/// Returns the valid keywords for a trigger family as a user-facing prompt.
fn keyword_reminder(trigger: &EscalationTrigger) -> String {
    let mut options = Vec::new();
    if trigger.is_retry_capable() {
        options.push("RETRY or GUIDANCE to grant more attempts");
    }
    if *trigger == EscalationTrigger::PhysicsFailureLimit {
        options.push("ACCEPT or PARTIAL to keep the partial result");
    }
    options.push("SKIP to block this stage and move on");
    options.push("STOP to end the run");
    format!("Reply with one of: {}.", options.join("; "))
}

fn lookup_active<'a>(
    progress: &Progress,
    active_stage: Option<&'a str>,
) -> Result<&'a str, String> {
    match active_stage {
        None => Err("no stage is currently active".to_string()),
        Some(id) if progress.get(id).is_none() => {
            Err(format!("active stage '{id}' is not in the progress ledger"))
        }
        Some(id) => Ok(id),
    }
}
