//! Core data model: statuses, stages, deltas, verdicts, and run state.

mod delta;
mod run;
mod stage;
mod status;
mod verdict;

pub use delta::{ProgressDelta, StagePatch};
pub use run::RunState;
pub use stage::{Plan, PlanStage, Progress, ProgressStage, StageLedger};
pub use status::{
    de_lenient_stage_type, PrecisionTier, ReadinessLevel, StageStatus, StageType,
    UnknownStageType,
};
pub use verdict::{CounterKind, EscalationTrigger, Verdict};
