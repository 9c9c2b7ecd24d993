//! Stage type, stage status, and readiness-level enums.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// The category of reproduction work a stage performs.
///
/// The declaration order is the canonical type order: every category before a
/// stage's own category must have at least one completed stage before the
/// stage may run. `ComplexPhysics` sits outside the strict ordinal chain but
/// is still gated by the validation hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageType {
    /// Validates material models against reference data.
    MaterialValidation,
    /// Simulates a single isolated structure.
    SingleStructure,
    /// Simulates a periodic or finite array of structures.
    ArraySystem,
    /// Sweeps a geometric or physical parameter across a range.
    ParameterSweep,
    /// Advanced physics beyond the standard progression.
    ComplexPhysics,
}

impl StageType {
    /// The categories that participate in the strict type order and in the
    /// validation hierarchy, in canonical order.
    pub const ORDERED: [Self; 4] = [
        Self::MaterialValidation,
        Self::SingleStructure,
        Self::ArraySystem,
        Self::ParameterSweep,
    ];

    /// Returns the position of this type in the canonical order, or `None`
    /// for `ComplexPhysics`, which is exempt from ordinal placement.
    #[must_use]
    pub fn ordinal(&self) -> Option<usize> {
        Self::ORDERED.iter().position(|t| t == self)
    }

    /// Parses a wire string, returning `None` for unrecognized values
    /// instead of failing the surrounding deserialization.
    #[must_use]
    pub fn parse_lenient(value: &str) -> Option<Self> {
        value.trim().to_ascii_lowercase().parse().ok()
    }
}

impl fmt::Display for StageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaterialValidation => write!(f, "material_validation"),
            Self::SingleStructure => write!(f, "single_structure"),
            Self::ArraySystem => write!(f, "array_system"),
            Self::ParameterSweep => write!(f, "parameter_sweep"),
            Self::ComplexPhysics => write!(f, "complex_physics"),
        }
    }
}

impl FromStr for StageType {
    type Err = UnknownStageType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "material_validation" => Ok(Self::MaterialValidation),
            "single_structure" => Ok(Self::SingleStructure),
            "array_system" => Ok(Self::ArraySystem),
            "parameter_sweep" => Ok(Self::ParameterSweep),
            "complex_physics" => Ok(Self::ComplexPhysics),
            other => Err(UnknownStageType(other.to_string())),
        }
    }
}

/// Error returned when a stage type string is not in the known set.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Unknown stage type '{0}'")]
pub struct UnknownStageType(pub String);

/// Deserializes an optional stage type leniently: missing, null, or
/// unrecognized values become `None` rather than a hard error, so a plan
/// produced by an external agent never fails to parse on a bad type. The
/// scheduler's type gate blocks such stages instead.
pub fn de_lenient_stage_type<'de, D>(deserializer: D) -> Result<Option<StageType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(StageType::parse_lenient))
}

/// The execution status of a stage in the progress ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage has not been started.
    NotStarted,
    /// Stage is currently executing.
    InProgress,
    /// Stage completed and fully passed validation.
    CompletedSuccess,
    /// Stage completed with partial validation (accepted by a human or a
    /// tolerant check).
    CompletedPartial,
    /// Stage completed but failed validation; never satisfies a gate.
    CompletedFailed,
    /// Stage is ineligible to run; re-evaluated for auto-unblock each pass.
    Blocked,
    /// Stage was marked stale by a backtrack decision; not selectable until
    /// it becomes `NeedsRerun` externally.
    Invalidated,
    /// Stage must run again; highest scheduling priority, always resets
    /// transient state on selection.
    NeedsRerun,
}

impl Default for StageStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::InProgress => write!(f, "in_progress"),
            Self::CompletedSuccess => write!(f, "completed_success"),
            Self::CompletedPartial => write!(f, "completed_partial"),
            Self::CompletedFailed => write!(f, "completed_failed"),
            Self::Blocked => write!(f, "blocked"),
            Self::Invalidated => write!(f, "invalidated"),
            Self::NeedsRerun => write!(f, "needs_rerun"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status satisfies dependency and hierarchy gates.
    #[must_use]
    pub fn is_terminal_success(&self) -> bool {
        matches!(self, Self::CompletedSuccess | Self::CompletedPartial)
    }

    /// Returns true if the status is any completed state.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(
            self,
            Self::CompletedSuccess | Self::CompletedPartial | Self::CompletedFailed
        )
    }

    /// Returns true if the stage can never become runnable on its own:
    /// terminally failed, or blocked pending external intervention.
    #[must_use]
    pub fn is_permanently_stuck(&self) -> bool {
        matches!(self, Self::CompletedFailed | Self::Blocked)
    }

    /// Returns true if the stage could still be selected in a future pass.
    #[must_use]
    pub fn is_potentially_runnable(&self) -> bool {
        matches!(self, Self::NotStarted | Self::Invalidated | Self::NeedsRerun)
    }
}

/// Aggregate readiness of one validation-hierarchy category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessLevel {
    /// No stage of the category has finished yet.
    NotDone,
    /// Every stage of the category completed, at least one only partially.
    Partial,
    /// Every stage of the category completed successfully.
    Passed,
    /// At least one stage of the category failed terminally.
    Failed,
}

impl Default for ReadinessLevel {
    fn default() -> Self {
        Self::NotDone
    }
}

impl fmt::Display for ReadinessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotDone => write!(f, "not_done"),
            Self::Partial => write!(f, "partial"),
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl ReadinessLevel {
    /// Returns true if this level satisfies a hierarchy gate.
    #[must_use]
    pub fn satisfies_gate(&self) -> bool {
        matches!(self, Self::Passed | Self::Partial)
    }
}

/// How closely a stage must reproduce its reference result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecisionTier {
    /// Qualitative agreement with published trends.
    Qualitative,
    /// Quantitative agreement within a tolerance band.
    Quantitative,
    /// Point-by-point agreement with digitized reference curves.
    Exact,
}

impl fmt::Display for PrecisionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Qualitative => write!(f, "qualitative"),
            Self::Quantitative => write!(f, "quantitative"),
            Self::Exact => write!(f, "exact"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_type_display() {
        assert_eq!(StageType::MaterialValidation.to_string(), "material_validation");
        assert_eq!(StageType::SingleStructure.to_string(), "single_structure");
        assert_eq!(StageType::ArraySystem.to_string(), "array_system");
        assert_eq!(StageType::ParameterSweep.to_string(), "parameter_sweep");
        assert_eq!(StageType::ComplexPhysics.to_string(), "complex_physics");
    }

    #[test]
    fn test_stage_type_canonical_order() {
        assert!(StageType::MaterialValidation < StageType::SingleStructure);
        assert!(StageType::SingleStructure < StageType::ArraySystem);
        assert!(StageType::ArraySystem < StageType::ParameterSweep);
    }

    #[test]
    fn test_stage_type_ordinal() {
        assert_eq!(StageType::MaterialValidation.ordinal(), Some(0));
        assert_eq!(StageType::ParameterSweep.ordinal(), Some(3));
        assert_eq!(StageType::ComplexPhysics.ordinal(), None);
    }

    #[test]
    fn test_stage_type_parse_lenient() {
        assert_eq!(
            StageType::parse_lenient("material_validation"),
            Some(StageType::MaterialValidation)
        );
        assert_eq!(
            StageType::parse_lenient("  ARRAY_SYSTEM "),
            Some(StageType::ArraySystem)
        );
        assert_eq!(StageType::parse_lenient("quantum_gravity"), None);
        assert_eq!(StageType::parse_lenient(""), None);
    }

    #[test]
    fn test_stage_status_predicates() {
        assert!(StageStatus::CompletedSuccess.is_terminal_success());
        assert!(StageStatus::CompletedPartial.is_terminal_success());
        assert!(!StageStatus::CompletedFailed.is_terminal_success());

        assert!(StageStatus::Blocked.is_permanently_stuck());
        assert!(StageStatus::CompletedFailed.is_permanently_stuck());
        assert!(!StageStatus::NotStarted.is_permanently_stuck());

        assert!(StageStatus::NeedsRerun.is_potentially_runnable());
        assert!(StageStatus::Invalidated.is_potentially_runnable());
        assert!(!StageStatus::InProgress.is_potentially_runnable());
    }

    #[test]
    fn test_stage_status_serialize() {
        let json = serde_json::to_string(&StageStatus::NeedsRerun).unwrap();
        assert_eq!(json, r#""needs_rerun""#);

        let back: StageStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, StageStatus::NeedsRerun);
    }

    #[test]
    fn test_readiness_level_gate() {
        assert!(ReadinessLevel::Passed.satisfies_gate());
        assert!(ReadinessLevel::Partial.satisfies_gate());
        assert!(!ReadinessLevel::NotDone.satisfies_gate());
        assert!(!ReadinessLevel::Failed.satisfies_gate());
    }

    #[test]
    fn test_precision_tier_order() {
        assert!(PrecisionTier::Qualitative < PrecisionTier::Quantitative);
        assert!(PrecisionTier::Quantitative < PrecisionTier::Exact);
    }
}
