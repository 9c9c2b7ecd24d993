//! Scheduling verdicts and escalation triggers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The verdict the control core hands back to the surrounding pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Re-enter the code-generation phase of the current stage.
    RetryGenerateCode,
    /// Re-enter the analysis phase of the current stage.
    RetryAnalyze,
    /// Proceed with normal scheduling.
    OkContinue,
    /// Pause and surface questions to a human.
    AskUser,
    /// The run is finished (successfully or by user request).
    AllComplete,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetryGenerateCode => write!(f, "retry_generate_code"),
            Self::RetryAnalyze => write!(f, "retry_analyze"),
            Self::OkContinue => write!(f, "ok_continue"),
            Self::AskUser => write!(f, "ask_user"),
            Self::AllComplete => write!(f, "all_complete"),
        }
    }
}

/// The per-stage or run-level counter a limit trigger is tied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterKind {
    /// Consecutive simulation-execution failures for the active stage.
    ExecutionFailures,
    /// Physics-validation failures for the active stage.
    PhysicsFailures,
    /// Code-review revision rounds for the active stage.
    CodeReviewRevisions,
    /// Design-review revision rounds for the active stage.
    DesignReviewRevisions,
    /// Analysis revision rounds for the active stage.
    AnalysisRevisions,
    /// Run-level replan attempts.
    Replans,
}

/// The reason an escalation was raised.
///
/// Trigger names form the wire contract between the scheduler, the escalation
/// machine, and whatever UI surfaces questions to the human, so values
/// outside the known set are preserved verbatim as [`Self::Unknown`] rather
/// than rejected at the parse boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EscalationTrigger {
    /// Execution-failure counter reached its limit.
    ExecutionFailureLimit,
    /// Physics-failure counter reached its limit.
    PhysicsFailureLimit,
    /// Code-review revision counter reached its limit.
    CodeReviewLimit,
    /// Design-review revision counter reached its limit.
    DesignReviewLimit,
    /// Run-level replan counter reached its limit.
    ReplanLimit,
    /// Analysis revision counter reached its limit.
    AnalysisLimit,
    /// The scheduler found no path forward.
    DeadlockDetected,
    /// The scheduler was invoked with neither plan nor progress stages.
    NoStagesAvailable,
    /// Initializing the progress ledger from the plan failed.
    ProgressInitFailed,
    /// The source paper text is missing from the run inputs.
    MissingPaperText,
    /// An LLM call failed irrecoverably.
    LlmError,
    /// A trigger name outside the known set, preserved for diagnostics.
    Unknown(String),
}

impl EscalationTrigger {
    /// Returns the wire name of the trigger.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ExecutionFailureLimit => "execution_failure_limit",
            Self::PhysicsFailureLimit => "physics_failure_limit",
            Self::CodeReviewLimit => "code_review_limit",
            Self::DesignReviewLimit => "design_review_limit",
            Self::ReplanLimit => "replan_limit",
            Self::AnalysisLimit => "analysis_limit",
            Self::DeadlockDetected => "deadlock_detected",
            Self::NoStagesAvailable => "no_stages_available",
            Self::ProgressInitFailed => "progress_init_failed",
            Self::MissingPaperText => "missing_paper_text",
            Self::LlmError => "llm_error",
            Self::Unknown(name) => name,
        }
    }

    /// Parses a wire trigger name; unknown names are preserved.
    #[must_use]
    pub fn from_wire(name: &str) -> Self {
        match name {
            "execution_failure_limit" => Self::ExecutionFailureLimit,
            "physics_failure_limit" => Self::PhysicsFailureLimit,
            "code_review_limit" => Self::CodeReviewLimit,
            "design_review_limit" => Self::DesignReviewLimit,
            "replan_limit" => Self::ReplanLimit,
            "analysis_limit" => Self::AnalysisLimit,
            "deadlock_detected" => Self::DeadlockDetected,
            "no_stages_available" => Self::NoStagesAvailable,
            "progress_init_failed" => Self::ProgressInitFailed,
            "missing_paper_text" => Self::MissingPaperText,
            "llm_error" => Self::LlmError,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Returns the counter associated with a limit trigger, if any.
    #[must_use]
    pub fn counter(&self) -> Option<CounterKind> {
        match self {
            Self::ExecutionFailureLimit => Some(CounterKind::ExecutionFailures),
            Self::PhysicsFailureLimit => Some(CounterKind::PhysicsFailures),
            Self::CodeReviewLimit => Some(CounterKind::CodeReviewRevisions),
            Self::DesignReviewLimit => Some(CounterKind::DesignReviewRevisions),
            Self::AnalysisLimit => Some(CounterKind::AnalysisRevisions),
            Self::ReplanLimit => Some(CounterKind::Replans),
            _ => None,
        }
    }

    /// Returns true for triggers whose counter a `RETRY` answer resets.
    #[must_use]
    pub fn is_retry_capable(&self) -> bool {
        self.counter().is_some()
    }

    /// Returns the retry verdict for a retry-capable trigger: analysis limits
    /// re-enter the analysis phase, everything else re-enters code generation.
    #[must_use]
    pub fn retry_verdict(&self) -> Verdict {
        match self {
            Self::AnalysisLimit => Verdict::RetryAnalyze,
            _ => Verdict::RetryGenerateCode,
        }
    }
}

impl fmt::Display for EscalationTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for EscalationTrigger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EscalationTrigger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_wire(&name))
    }
}
