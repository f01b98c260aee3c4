//! Step completion predicates.
//!
//! Pure functions over the workflow state. They gate "Continue" and drive the
//! overview's per-step badges, so they are re-evaluated on every render.

use serde::{Deserialize, Serialize};

use super::model::{InspectionRoot, Section, Step};
use crate::config::WorkflowConfig;

/// Badge shown for a step on the overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    NotStarted,
    /// The step is the one currently open.
    Continue,
    Complete,
}

/// Whether a step's data satisfies its requirements.
///
/// All-or-nothing: four photographed panels out of five is not complete.
pub fn is_step_satisfied(step: Step, state: &InspectionRoot, config: &WorkflowConfig) -> bool {
    match step {
        Step::Documentation => state.documentation.is_complete(),
        Step::Exterior | Step::Interior => all_sections_photographed(state, step.sections()),
        Step::WheelsTyres => Section::WHEELS
            .iter()
            .all(|wheel| state.wheel(*wheel).is_some_and(|w| w.is_complete())),
        Step::Other => !config.require_other_notes || !state.other.notes.trim().is_empty(),
        Step::Signature => state.signatures.is_complete(),
    }
}

fn all_sections_photographed(state: &InspectionRoot, sections: &[Section]) -> bool {
    sections
        .iter()
        .all(|section| !state.section_photos(*section).is_empty())
}

/// Status of `step` given the currently open step.
///
/// The active step always reports `Continue`, whatever its data says.
pub fn step_status(
    step: Step,
    state: &InspectionRoot,
    active: Option<Step>,
    config: &WorkflowConfig,
) -> StepStatus {
    if active == Some(step) {
        StepStatus::Continue
    } else if is_step_satisfied(step, state, config) {
        StepStatus::Complete
    } else {
        StepStatus::NotStarted
    }
}

/// Status of every step, in workflow order.
pub fn all_step_statuses(state: &InspectionRoot, config: &WorkflowConfig) -> Vec<(Step, StepStatus)> {
    Step::ALL
        .iter()
        .map(|step| (*step, step_status(*step, state, state.cursor.step, config)))
        .collect()
}

/// Number of steps whose data is complete (ignores the cursor).
pub fn completed_steps(state: &InspectionRoot, config: &WorkflowConfig) -> usize {
    Step::ALL
        .iter()
        .filter(|step| is_step_satisfied(**step, state, config))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspection::model::{HandoverKind, TyreCondition};

    fn root() -> InspectionRoot {
        InspectionRoot::new("job-1", HandoverKind::Collection)
    }

    #[test]
    fn test_documentation_scenario() {
        let config = WorkflowConfig::default();
        let mut state = root();
        state.documentation.v5_document = Some(true);
        state.documentation.service_documents = Some(false);
        state.documentation.locking_wheel_nut = Some(true);

        assert_eq!(
            step_status(Step::Documentation, &state, Some(Step::Exterior), &config),
            StepStatus::Complete
        );

        state.documentation.service_documents = None;
        assert_eq!(
            step_status(Step::Documentation, &state, Some(Step::Exterior), &config),
            StepStatus::NotStarted
        );
    }

    #[test]
    fn test_active_step_reports_continue() {
        let config = WorkflowConfig::default();
        let mut state = root();
        state.signatures.customer_signature = "data:sig-a".into();
        state.signatures.driver_signature = "data:sig-b".into();

        assert_eq!(
            step_status(Step::Signature, &state, Some(Step::Signature), &config),
            StepStatus::Continue
        );
        assert_eq!(
            step_status(Step::Documentation, &state, Some(Step::Documentation), &config),
            StepStatus::Continue
        );
    }

    #[test]
    fn test_exterior_four_of_five_not_started() {
        let config = WorkflowConfig::default();
        let mut state = root();
        for section in &Section::EXTERIOR[..4] {
            state.section_photos_mut(*section).push(format!("{}.jpg", section));
        }
        assert_eq!(step_status(Step::Exterior, &state, None, &config), StepStatus::NotStarted);

        state.section_photos_mut(Section::Roof).push("roof.jpg".into());
        assert_eq!(step_status(Step::Exterior, &state, None, &config), StepStatus::Complete);
    }

    #[test]
    fn test_damage_does_not_count_as_photo() {
        use crate::inspection::model::{DamageMarker, MarkerPosition};

        let config = WorkflowConfig::default();
        let mut state = root();
        for section in Section::INTERIOR {
            let marker = DamageMarker::new(
                format!("m-{}", section),
                1,
                *section,
                MarkerPosition::new(50.0, 50.0),
            )
            .with_photo("damage.jpg");
            state.marker_order.push(marker.id.clone());
            state.markers.insert(marker.id.clone(), marker);
        }
        assert!(!is_step_satisfied(Step::Interior, &state, &config));
    }

    #[test]
    fn test_wheels_need_photo_and_condition() {
        let config = WorkflowConfig::default();
        let mut state = root();
        for wheel in Section::WHEELS {
            state.section_photos_mut(*wheel).push("tyre.jpg".into());
        }
        assert!(!is_step_satisfied(Step::WheelsTyres, &state, &config));

        for wheel in state.wheels.values_mut() {
            wheel.tyre_condition = Some(TyreCondition::Good);
        }
        assert!(is_step_satisfied(Step::WheelsTyres, &state, &config));
    }

    #[test]
    fn test_other_step_policy() {
        let optional = WorkflowConfig::default();
        let required = WorkflowConfig::default().with_require_other_notes(true);
        let mut state = root();

        assert!(is_step_satisfied(Step::Other, &state, &optional));
        assert!(!is_step_satisfied(Step::Other, &state, &required));

        state.other.notes = "   ".into();
        assert!(!is_step_satisfied(Step::Other, &state, &required));

        state.other.notes = "Spare key in glovebox".into();
        assert!(is_step_satisfied(Step::Other, &state, &required));
    }

    #[test]
    fn test_predicate_is_pure() {
        let config = WorkflowConfig::default();
        let mut state = root();
        state.section_photos_mut(Section::Front).push("front.jpg".into());

        let first = all_step_statuses(&state, &config);
        let second = all_step_statuses(&state, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn test_completed_steps_counts_optional_other() {
        let config = WorkflowConfig::default();
        let state = root();
        assert_eq!(completed_steps(&state, &config), 1);
    }
}
