//! Structural plan validation.
//!
//! Every check runs before any LLM review call, and every violation found is
//! reported, not just the first, so a single revision round can fix the whole
//! plan.

use crate::core::{Plan, PrecisionTier};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The outcome of a structural plan review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    /// The plan is structurally sound and may be scheduled.
    Approve,
    /// The plan must be revised; see the feedback list.
    NeedsRevision,
}

/// The result of reviewing a candidate plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanReview {
    /// Approve or needs-revision.
    pub decision: ReviewDecision,
    /// One entry per violation found.
    pub feedback: Vec<String>,
}

impl PlanReview {
    /// Returns true if the plan was approved.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.decision == ReviewDecision::Approve
    }

    /// Joins the feedback entries into a single revision message.
    #[must_use]
    pub fn feedback_text(&self) -> String {
        self.feedback.join("\n")
    }
}

/// Reviews a candidate plan against every structural rule.
///
/// Checks, in order: non-empty plan, unique non-empty stage ids, at least
/// one target per stage, no self-dependencies, no dangling dependency ids,
/// no dependency cycles, and digitized reference data for exact-precision
/// stages.
#[must_use]
pub fn review_plan(plan: &Plan) -> PlanReview {
    let mut feedback = Vec::new();

    if plan.is_empty() {
        feedback.push("Plan must contain at least one stage".to_string());
        return PlanReview {
            decision: ReviewDecision::NeedsRevision,
            feedback,
        };
    }

    let mut seen_ids: HashSet<&str> = HashSet::new();
    for (index, stage) in plan.stages.iter().enumerate() {
        let id = stage.stage_id.trim();
        if id.is_empty() {
            feedback.push(format!("Stage at position {index} has an empty stage_id"));
            continue;
        }
        if !seen_ids.insert(id) {
            feedback.push(format!("Duplicate stage_id '{id}'"));
        }
    }

    for stage in &plan.stages {
        if !stage.has_target() {
            feedback.push(format!(
                "Stage '{}' declares no targets (set targets or target_details)",
                stage.stage_id
            ));
        }
    }

    for stage in &plan.stages {
        if stage.dependencies.iter().any(|d| d == &stage.stage_id) {
            feedback.push(format!("Stage '{}' cannot depend on itself", stage.stage_id));
        }
    }

    let known_ids: HashSet<&str> = plan.stages.iter().map(|s| s.stage_id.as_str()).collect();
    for stage in &plan.stages {
        for dep in &stage.dependencies {
            if dep != &stage.stage_id && !known_ids.contains(dep.as_str()) {
                feedback.push(format!(
                    "Stage '{}' depends on non-existent stage '{}'",
                    stage.stage_id, dep
                ));
            }
        }
    }

    for cycle in find_cycles(plan) {
        feedback.push(format!("Circular dependency: {}", cycle.join(" -> ")));
    }

    for stage in &plan.stages {
        if stage.precision_requirement == Some(PrecisionTier::Exact)
            && stage.digitized_reference.is_none()
        {
            feedback.push(format!(
                "Stage '{}' requires exact precision but supplies no digitized reference data",
                stage.stage_id
            ));
        }
    }

    if feedback.is_empty() {
        PlanReview {
            decision: ReviewDecision::Approve,
            feedback,
        }
    } else {
        tracing::debug!(violations = feedback.len(), "Plan needs revision");
        PlanReview {
            decision: ReviewDecision::NeedsRevision,
            feedback,
        }
    }
}

/// Finds dependency cycles via depth-first traversal with a recursion stack.
///
/// Each reported cycle path ends with the repeated id that closes it.
/// Traversal continues after a cycle is found so independent cycles elsewhere
/// in the graph are also reported; duplicate reports of the same cycle are
/// collapsed by their member set.
fn find_cycles(plan: &Plan) -> Vec<Vec<String>> {
    let deps: HashMap<&str, Vec<&str>> = plan
        .stages
        .iter()
        .map(|s| {
            (
                s.stage_id.as_str(),
                s.dependencies
                    .iter()
                    .map(String::as_str)
                    // Dangling ids and self-dependencies are reported by
                    // their own checks; skip them here.
                    .filter(|d| *d != s.stage_id && plan.get(d).is_some())
                    .collect(),
            )
        })
        .collect();

    let mut cycles: Vec<Vec<String>> = Vec::new();
    let mut signatures: HashSet<Vec<String>> = HashSet::new();
    let mut visited: HashSet<&str> = HashSet::new();

    fn dfs<'a>(
        node: &'a str,
        deps: &HashMap<&'a str, Vec<&'a str>>,
        visited: &mut HashSet<&'a str>,
        in_stack: &mut HashSet<&'a str>,
        path: &mut Vec<&'a str>,
        cycles: &mut Vec<Vec<String>>,
        signatures: &mut HashSet<Vec<String>>,
    ) {
        if in_stack.contains(node) {
            let start = path.iter().position(|n| *n == node).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].iter().map(ToString::to_string).collect();
            cycle.push(node.to_string());

            let mut signature: Vec<String> = cycle[..cycle.len() - 1].to_vec();
            signature.sort();
            if signatures.insert(signature) {
                cycles.push(cycle);
            }
            return;
        }
        if visited.contains(node) {
            return;
        }

        in_stack.insert(node);
        path.push(node);

        if let Some(node_deps) = deps.get(node) {
            for dep in node_deps {
                dfs(dep, deps, visited, in_stack, path, cycles, signatures);
            }
        }

        path.pop();
        in_stack.remove(node);
        visited.insert(node);
    }

    for stage in &plan.stages {
        let mut in_stack = HashSet::new();
        let mut path = Vec::new();
        dfs(
            stage.stage_id.as_str(),
            &deps,
            &mut visited,
            &mut in_stack,
            &mut path,
            &mut cycles,
            &mut signatures,
        );
    }

    cycles
}
