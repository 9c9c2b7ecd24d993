//! Validation-hierarchy aggregation.
//!
//! The hierarchy is a pure projection of the progress ledger: per-category
//! readiness levels recomputed on demand, never persisted.

use crate::core::{Progress, ReadinessLevel, StageStatus, StageType};
use serde::{Deserialize, Serialize};

/// Per-category readiness derived from current stage statuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationHierarchy {
    /// Readiness of material-validation stages.
    pub material_validation: ReadinessLevel,
    /// Readiness of single-structure stages.
    pub single_structure: ReadinessLevel,
    /// Readiness of array-system stages.
    pub array_system: ReadinessLevel,
    /// Readiness of parameter-sweep stages.
    pub parameter_sweep: ReadinessLevel,
}

impl ValidationHierarchy {
    /// Computes the hierarchy from a progress ledger.
    #[must_use]
    pub fn from_progress(progress: &Progress) -> Self {
        Self {
            material_validation: category_level(progress, StageType::MaterialValidation),
            single_structure: category_level(progress, StageType::SingleStructure),
            array_system: category_level(progress, StageType::ArraySystem),
            parameter_sweep: category_level(progress, StageType::ParameterSweep),
        }
    }

    /// Returns the readiness level of a category. `ComplexPhysics` is not a
    /// hierarchy category and always reads as not-done.
    #[must_use]
    pub fn level(&self, category: StageType) -> ReadinessLevel {
        match category {
            StageType::MaterialValidation => self.material_validation,
            StageType::SingleStructure => self.single_structure,
            StageType::ArraySystem => self.array_system,
            StageType::ParameterSweep => self.parameter_sweep,
            StageType::ComplexPhysics => ReadinessLevel::NotDone,
        }
    }
}

/// Aggregates all stages of exactly one category into a readiness level.
fn category_level(progress: &Progress, category: StageType) -> ReadinessLevel {
    let statuses: Vec<StageStatus> = progress
        .stages
        .iter()
        .filter(|s| s.stage_type == Some(category))
        .map(|s| s.status)
        .collect();

    if statuses.is_empty() {
        return ReadinessLevel::NotDone;
    }
    if statuses.contains(&StageStatus::CompletedFailed) {
        return ReadinessLevel::Failed;
    }
    if statuses.iter().all(StageStatus::is_terminal_success) {
        if statuses.iter().all(|s| *s == StageStatus::CompletedSuccess) {
            ReadinessLevel::Passed
        } else {
            ReadinessLevel::Partial
        }
    } else {
        ReadinessLevel::NotDone
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Plan, PlanStage, Progress};
    use pretty_assertions::assert_eq;

    fn progress_with(statuses: &[(StageType, StageStatus)]) -> Progress {
        let plan = Plan::new(
            statuses
                .iter()
                .enumerate()
                .map(|(i, (t, _))| PlanStage::new(format!("s{i}"), *t).with_target("t"))
                .collect(),
        );
        let mut progress = Progress::from_plan(&plan).unwrap();
        for (i, (_, status)) in statuses.iter().enumerate() {
            progress.get_mut(&format!("s{i}")).unwrap().status = *status;
        }
        progress
    }

    #[test]
    fn test_empty_category_is_not_done() {
        let progress = progress_with(&[(StageType::SingleStructure, StageStatus::NotStarted)]);
        let hierarchy = ValidationHierarchy::from_progress(&progress);
        assert_eq!(hierarchy.material_validation, ReadinessLevel::NotDone);
    }

    #[test]
    fn test_any_failure_dominates() {
        let progress = progress_with(&[
            (StageType::MaterialValidation, StageStatus::CompletedSuccess),
            (StageType::MaterialValidation, StageStatus::CompletedFailed),
        ]);
        let hierarchy = ValidationHierarchy::from_progress(&progress);
        assert_eq!(hierarchy.material_validation, ReadinessLevel::Failed);
    }

    #[test]
    fn test_all_success_is_passed() {
        let progress = progress_with(&[
            (StageType::MaterialValidation, StageStatus::CompletedSuccess),
            (StageType::MaterialValidation, StageStatus::CompletedSuccess),
        ]);
        let hierarchy = ValidationHierarchy::from_progress(&progress);
        assert_eq!(hierarchy.material_validation, ReadinessLevel::Passed);
    }

    #[test]
    fn test_mixed_success_partial_is_partial() {
        let progress = progress_with(&[
            (StageType::MaterialValidation, StageStatus::CompletedSuccess),
            (StageType::MaterialValidation, StageStatus::CompletedPartial),
        ]);
        let hierarchy = ValidationHierarchy::from_progress(&progress);
        assert_eq!(hierarchy.material_validation, ReadinessLevel::Partial);
        assert!(hierarchy.material_validation.satisfies_gate());
    }

    #[test]
    fn test_still_running_is_not_done() {
        let progress = progress_with(&[
            (StageType::ArraySystem, StageStatus::CompletedSuccess),
            (StageType::ArraySystem, StageStatus::InProgress),
        ]);
        let hierarchy = ValidationHierarchy::from_progress(&progress);
        assert_eq!(hierarchy.array_system, ReadinessLevel::NotDone);
    }

    #[test]
    fn test_complex_physics_is_not_a_category() {
        let progress = progress_with(&[(StageType::ComplexPhysics, StageStatus::CompletedSuccess)]);
        let hierarchy = ValidationHierarchy::from_progress(&progress);
        assert_eq!(hierarchy.level(StageType::ComplexPhysics), ReadinessLevel::NotDone);
        assert_eq!(hierarchy, ValidationHierarchy::default());
    }
}
