//! Finished inspection record and progress summary.
//!
//! The record is what the submission endpoint stores and what the Proof of
//! Collection / Delivery generator renders. Every section is listed even when
//! empty so the generator never has to guess.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::model::{
    DamageMarker, DocumentationCheck, HandoverKind, InspectionRoot, OtherDetails, PhotoRef,
    Section, Severity, Signatures, Step, TyreCondition,
};
use super::predicate::{self, StepStatus};
use crate::config::WorkflowConfig;

/// Photos and damage for one section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionRecord {
    pub section: Section,
    pub step: Step,
    pub photos: Vec<PhotoRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tyre_condition: Option<TyreCondition>,
    /// Markers on this section, in creation order.
    pub damage: Vec<DamageMarker>,
}

/// Immutable snapshot of a finished inspection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InspectionRecord {
    pub job_id: String,
    pub kind: HandoverKind,
    pub documentation: DocumentationCheck,
    /// Every named section in display order.
    pub sections: Vec<SectionRecord>,
    pub other: OtherDetails,
    pub signatures: Signatures,
    /// All markers in creation order.
    pub markers: Vec<DamageMarker>,
    pub started_at: i64,
    pub completed_at: i64,
}

impl InspectionRecord {
    /// Builds the record from the live state.
    pub fn from_state(state: &InspectionRoot, completed_at: i64) -> Self {
        let sections = Section::ALL
            .iter()
            .map(|section| SectionRecord {
                section: *section,
                step: section.step(),
                photos: state.section_photos(*section).to_vec(),
                tyre_condition: state.wheel(*section).and_then(|w| w.tyre_condition),
                damage: state
                    .markers_in_section(*section)
                    .into_iter()
                    .cloned()
                    .collect(),
            })
            .collect();

        Self {
            job_id: state.job_id.clone(),
            kind: state.kind,
            documentation: state.documentation.clone(),
            sections,
            other: state.other.clone(),
            signatures: state.signatures.clone(),
            markers: state.markers_in_order().into_iter().cloned().collect(),
            started_at: state.created_at,
            completed_at,
        }
    }

    /// Section entry by key.
    pub fn section(&self, section: Section) -> Option<&SectionRecord> {
        self.sections.iter().find(|s| s.section == section)
    }

    /// Photos across sections and markers.
    pub fn photo_count(&self) -> usize {
        let section_photos: usize = self.sections.iter().map(|s| s.photos.len()).sum();
        let damage_photos: usize = self.markers.iter().map(|m| m.photos.len()).sum();
        section_photos + damage_photos
    }

    /// Converts to a JSON value for the submission body.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Per-section line of the summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionSummary {
    pub section: Section,
    pub photos: usize,
    pub markers: usize,
    pub complete: bool,
}

/// Progress overview shown before signing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InspectionSummary {
    pub job_id: String,
    pub kind: HandoverKind,
    pub steps: Vec<(Step, StepStatus)>,
    pub completed_steps: usize,
    pub sections: Vec<SectionSummary>,
    pub photo_count: usize,
    pub marker_count: usize,
    pub markers_by_severity: BTreeMap<Severity, usize>,
}

impl InspectionSummary {
    pub fn from_state(state: &InspectionRoot, config: &WorkflowConfig) -> Self {
        let sections: Vec<SectionSummary> = Section::ALL
            .iter()
            .map(|section| SectionSummary {
                section: *section,
                photos: state.section_photos(*section).len(),
                markers: state.markers_in_section(*section).len(),
                complete: state.is_section_complete(*section),
            })
            .collect();

        let mut markers_by_severity = BTreeMap::new();
        for marker in state.markers.values() {
            *markers_by_severity.entry(marker.severity).or_insert(0) += 1;
        }

        Self {
            job_id: state.job_id.clone(),
            kind: state.kind,
            steps: predicate::all_step_statuses(state, config),
            completed_steps: predicate::completed_steps(state, config),
            photo_count: sections.iter().map(|s| s.photos).sum(),
            sections,
            marker_count: state.marker_count(),
            markers_by_severity,
        }
    }

    /// Sections still missing photos (or tyre condition).
    pub fn incomplete_sections(&self) -> Vec<Section> {
        self.sections
            .iter()
            .filter(|s| !s.complete)
            .map(|s| s.section)
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
