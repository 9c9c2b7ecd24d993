//! Plan validation.
//!
//! Structural review of a candidate stage DAG before scheduling begins. The
//! replan loop around it is bounded by [`crate::config::LimitConfig`] via
//! [`crate::core::RunState::register_replan`].

mod validator;

pub use validator::{review_plan, PlanReview, ReviewDecision};
