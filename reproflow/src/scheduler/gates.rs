//! Eligibility gates applied to candidate stages.
//!
//! A gate either passes, skips the candidate this pass (transient wait), or
//! blocks it permanently with a diagnostic. Skips are never surfaced as
//! errors; blocks surface through deadlock detection when they leave no path
//! forward.

use crate::core::{Progress, ProgressStage, StageStatus, StageType};
use crate::scheduler::hierarchy::ValidationHierarchy;

/// The result of evaluating one gate against one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum GateOutcome {
    /// The candidate may proceed to the next gate.
    Pass,
    /// The candidate cannot run this pass; try again later.
    Skip,
    /// The candidate can never run; mark it blocked with this diagnostic.
    Block(String),
}

/// Returns the hierarchy categories that must read passed or partial before
/// a stage of the given type may run. `ComplexPhysics` accepts either of its
/// prerequisites.
pub(crate) fn prerequisite_categories(stage_type: StageType) -> &'static [StageType] {
    match stage_type {
        StageType::MaterialValidation => &[],
        StageType::SingleStructure => &[StageType::MaterialValidation],
        StageType::ArraySystem | StageType::ParameterSweep => &[StageType::SingleStructure],
        StageType::ComplexPhysics => &[StageType::ArraySystem, StageType::ParameterSweep],
    }
}

/// Dependency gate: a missing dependency id blocks the stage permanently; an
/// existing but unsatisfied dependency skips it without blocking.
pub(crate) fn dependency_gate(stage: &ProgressStage, progress: &Progress) -> GateOutcome {
    let missing: Vec<&str> = stage
        .dependencies
        .iter()
        .filter(|dep| progress.get(dep).is_none())
        .map(String::as_str)
        .collect();

    if !missing.is_empty() {
        return GateOutcome::Block(format!(
            "Dependency id(s) not found in progress: {}",
            missing.join(", ")
        ));
    }

    if stage
        .dependencies
        .iter()
        .all(|dep| progress.dependency_satisfied(dep))
    {
        GateOutcome::Pass
    } else {
        GateOutcome::Skip
    }
}

/// Type gate: a missing or unrecognized stage type blocks permanently.
pub(crate) fn type_gate(stage: &ProgressStage) -> GateOutcome {
    if stage.stage_type.is_some() {
        GateOutcome::Pass
    } else {
        GateOutcome::Block("Missing or unrecognized stage_type".to_string())
    }
}

/// Hierarchy gate: the stage's prerequisite category must read passed or
/// partial. When the prerequisite can never be satisfied (no stage of that
/// category exists, or every one is permanently stuck) the stage blocks
/// permanently; when it is merely not yet satisfied, the stage skips.
pub(crate) fn hierarchy_gate(
    stage_type: StageType,
    progress: &Progress,
    hierarchy: &ValidationHierarchy,
) -> GateOutcome {
    let prerequisites = prerequisite_categories(stage_type);
    if prerequisites.is_empty() {
        return GateOutcome::Pass;
    }

    if prerequisites
        .iter()
        .any(|cat| hierarchy.level(*cat).satisfies_gate())
    {
        return GateOutcome::Pass;
    }

    let unsatisfiable = prerequisites
        .iter()
        .all(|cat| category_unsatisfiable(progress, *cat));
    if unsatisfiable {
        let names: Vec<String> = prerequisites.iter().map(ToString::to_string).collect();
        GateOutcome::Block(format!(
            "Hierarchy prerequisite can never be satisfied: {}",
            names.join(" or ")
        ))
    } else {
        GateOutcome::Skip
    }
}

/// Returns true if a category has no stages at all, or every stage of it is
/// permanently stuck.
fn category_unsatisfiable(progress: &Progress, category: StageType) -> bool {
    !progress
        .stages
        .iter()
        .filter(|s| s.stage_type == Some(category))
        .any(|s| !s.status.is_permanently_stuck())
}

/// Type-order gate: every category that precedes this stage's category in
/// the canonical order and has at least one stage in the plan must have at
/// least one completed stage. Never blocks, only skips.
pub(crate) fn type_order_gate(stage_type: StageType, progress: &Progress) -> GateOutcome {
    let Some(ordinal) = stage_type.ordinal() else {
        // ComplexPhysics is exempt from ordinal placement.
        return GateOutcome::Pass;
    };

    for earlier in &StageType::ORDERED[..ordinal] {
        let of_category: Vec<&ProgressStage> = progress
            .stages
            .iter()
            .filter(|s| s.stage_type == Some(*earlier))
            .collect();
        if of_category.is_empty() {
            continue;
        }
        if !of_category.iter().any(|s| s.status.is_terminal_success()) {
            return GateOutcome::Skip;
        }
    }

    GateOutcome::Pass
}

/// Eligibility of a `needs_rerun` stage.
///
/// The dependency gate applies first: a rerun stage with explicit
/// dependencies waits until each one exists and is terminally successful.
/// The hierarchy prerequisite is consulted only as a fallback when the stage
/// declares zero explicit dependencies.
pub(crate) fn rerun_eligible(
    stage: &ProgressStage,
    progress: &Progress,
    hierarchy: &ValidationHierarchy,
) -> bool {
    if stage.status != StageStatus::NeedsRerun {
        return false;
    }

    if stage.dependencies.is_empty() {
        let prerequisites = stage
            .stage_type
            .map_or(&[] as &[StageType], prerequisite_categories);
        return prerequisites.is_empty()
            || prerequisites
                .iter()
                .any(|cat| hierarchy.level(*cat).satisfies_gate());
    }

    stage.dependencies.iter().all(|dep| {
        progress.get(dep).is_some_and(|d| {
            d.status.is_terminal_success()
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Plan, PlanStage};

    fn build_progress(stages: Vec<PlanStage>) -> Progress {
        Progress::from_plan(&Plan::new(stages)).unwrap()
    }

    fn plan_stage(id: &str, stage_type: StageType) -> PlanStage {
        PlanStage::new(id, stage_type).with_target("t")
    }

    #[test]
    fn test_dependency_gate_missing_blocks() {
        let progress = build_progress(vec![
            plan_stage("a", StageType::MaterialValidation).with_dependencies(["ghost"]),
        ]);
        let outcome = dependency_gate(progress.get("a").unwrap(), &progress);
        assert!(matches!(outcome, GateOutcome::Block(reason) if reason.contains("ghost")));
    }

    #[test]
    fn test_dependency_gate_unsatisfied_skips() {
        let progress = build_progress(vec![
            plan_stage("a", StageType::MaterialValidation),
            plan_stage("b", StageType::SingleStructure).with_dependencies(["a"]),
        ]);
        assert_eq!(
            dependency_gate(progress.get("b").unwrap(), &progress),
            GateOutcome::Skip
        );
    }

    #[test]
    fn test_dependency_gate_satisfied_passes() {
        let mut progress = build_progress(vec![
            plan_stage("a", StageType::MaterialValidation),
            plan_stage("b", StageType::SingleStructure).with_dependencies(["a"]),
        ]);
        progress.get_mut("a").unwrap().status = StageStatus::CompletedSuccess;
        assert_eq!(
            dependency_gate(progress.get("b").unwrap(), &progress),
            GateOutcome::Pass
        );
    }

    #[test]
    fn test_type_gate_blocks_unknown_type() {
        let mut progress = build_progress(vec![plan_stage("a", StageType::MaterialValidation)]);
        progress.get_mut("a").unwrap().stage_type = None;
        assert!(matches!(
            type_gate(progress.get("a").unwrap()),
            GateOutcome::Block(_)
        ));
    }

    #[test]
    fn test_hierarchy_gate_skips_while_prerequisite_pending() {
        let progress = build_progress(vec![
            plan_stage("mat", StageType::MaterialValidation),
            plan_stage("single", StageType::SingleStructure),
        ]);
        let hierarchy = ValidationHierarchy::from_progress(&progress);
        assert_eq!(
            hierarchy_gate(StageType::SingleStructure, &progress, &hierarchy),
            GateOutcome::Skip
        );
    }

    #[test]
    fn test_hierarchy_gate_blocks_when_category_absent() {
        let progress = build_progress(vec![plan_stage("single", StageType::SingleStructure)]);
        let hierarchy = ValidationHierarchy::from_progress(&progress);
        assert!(matches!(
            hierarchy_gate(StageType::SingleStructure, &progress, &hierarchy),
            GateOutcome::Block(_)
        ));
    }

    #[test]
    fn test_hierarchy_gate_blocks_when_category_all_stuck() {
        let mut progress = build_progress(vec![
            plan_stage("mat", StageType::MaterialValidation),
            plan_stage("single", StageType::SingleStructure),
        ]);
        progress.get_mut("mat").unwrap().status = StageStatus::CompletedFailed;
        let hierarchy = ValidationHierarchy::from_progress(&progress);
        assert!(matches!(
            hierarchy_gate(StageType::SingleStructure, &progress, &hierarchy),
            GateOutcome::Block(_)
        ));
    }

    #[test]
    fn test_complex_physics_accepts_either_prerequisite() {
        let mut progress = build_progress(vec![
            plan_stage("sweep", StageType::ParameterSweep),
            plan_stage("phys", StageType::ComplexPhysics),
        ]);
        progress.get_mut("sweep").unwrap().status = StageStatus::CompletedPartial;
        let hierarchy = ValidationHierarchy::from_progress(&progress);
        assert_eq!(
            hierarchy_gate(StageType::ComplexPhysics, &progress, &hierarchy),
            GateOutcome::Pass
        );
    }

    #[test]
    fn test_type_order_gate_requires_earlier_completion() {
        let progress = build_progress(vec![
            plan_stage("mat", StageType::MaterialValidation),
            plan_stage("single", StageType::SingleStructure),
            plan_stage("array", StageType::ArraySystem),
        ]);
        assert_eq!(
            type_order_gate(StageType::ArraySystem, &progress),
            GateOutcome::Skip
        );
    }

    #[test]
    fn test_type_order_gate_ignores_absent_categories() {
        let mut progress = build_progress(vec![
            plan_stage("mat", StageType::MaterialValidation),
            plan_stage("sweep", StageType::ParameterSweep),
        ]);
        progress.get_mut("mat").unwrap().status = StageStatus::CompletedSuccess;
        // No single-structure or array stages exist, so only material
        // validation is consulted.
        assert_eq!(
            type_order_gate(StageType::ParameterSweep, &progress),
            GateOutcome::Pass
        );
    }

    #[test]
    fn test_rerun_eligible_applies_dependency_gate_first() {
        let mut progress = build_progress(vec![
            plan_stage("mat", StageType::MaterialValidation),
            plan_stage("single", StageType::SingleStructure).with_dependencies(["mat"]),
        ]);
        progress.get_mut("single").unwrap().status = StageStatus::NeedsRerun;
        let hierarchy = ValidationHierarchy::from_progress(&progress);
        assert!(!rerun_eligible(progress.get("single").unwrap(), &progress, &hierarchy));

        progress.get_mut("mat").unwrap().status = StageStatus::CompletedSuccess;
        let hierarchy = ValidationHierarchy::from_progress(&progress);
        assert!(rerun_eligible(progress.get("single").unwrap(), &progress, &hierarchy));
    }

    #[test]
    fn test_rerun_falls_back_to_hierarchy_without_deps() {
        let mut progress = build_progress(vec![
            plan_stage("mat", StageType::MaterialValidation),
            plan_stage("single", StageType::SingleStructure),
        ]);
        progress.get_mut("single").unwrap().status = StageStatus::NeedsRerun;
        let hierarchy = ValidationHierarchy::from_progress(&progress);
        assert!(!rerun_eligible(progress.get("single").unwrap(), &progress, &hierarchy));

        progress.get_mut("mat").unwrap().status = StageStatus::CompletedSuccess;
        let hierarchy = ValidationHierarchy::from_progress(&progress);
        assert!(rerun_eligible(progress.get("single").unwrap(), &progress, &hierarchy));
    }
}
