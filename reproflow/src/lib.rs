//! # Reproflow
//!
//! The control core for automated scientific-reproduction runs.
//!
//! Reproflow decides, at every step of a simulation reproduction workflow,
//! what happens next:
//!
//! - **Plan review**: structural validation of a proposed stage plan before
//!   any simulation runs
//! - **Validation hierarchy**: a readiness rollup per stage category, from
//!   material validation up to parameter sweeps
//! - **Stage scheduling**: a pure, deterministic selection pass over the
//!   progress ledger, gated by dependencies, stage types, and the hierarchy
//! - **Escalation**: counter limits that pause the run for a human, and
//!   keyword resolution of their answer back into a control verdict
//!
//! The decision functions never perform I/O and never mutate shared state;
//! they return a [`core::ProgressDelta`] the caller applies atomically. The
//! [`runner`] module provides a serial driver that does exactly that over an
//! external stage worker.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reproflow::prelude::*;
//!
//! let review = review_plan(&plan);
//! if review.is_approved() {
//!     let outcome = select(&plan, &progress, &run);
//!     progress.apply(&outcome.delta)?;
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod errors;
pub mod escalation;
pub mod observability;
pub mod plan;
pub mod runner;
pub mod scheduler;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::LimitConfig;
    pub use crate::core::{
        CounterKind, EscalationTrigger, Plan, PlanStage, PrecisionTier, Progress, ProgressDelta,
        ProgressStage, ReadinessLevel, RunState, StageLedger, StagePatch, StageStatus, StageType,
        Verdict,
    };
    pub use crate::errors::ReproflowError;
    pub use crate::escalation::{resolve, Escalation, Resolution};
    pub use crate::observability::init_tracing;
    pub use crate::plan::{review_plan, PlanReview, ReviewDecision};
    pub use crate::runner::{
        HumanPort, RunEnd, StageReport, StageWorker, WorkflowDriver,
    };
    pub use crate::scheduler::{
        select, SchedulingOutcome, SelectionResult, ValidationHierarchy,
    };
}
