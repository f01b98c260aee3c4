//! Core InspectionManager implementation with hybrid operations pattern.
//!
//! This module provides the main `InspectionManager` struct that wraps an
//! Automerge document holding one job's inspection and provides:
//! - High-level operations via autosurgeon (hydrate/reconcile) for structural edits
//! - Targeted scalar updates via direct put operations for form fields
//! - The workflow state machine and the damage capture flow

use automerge::{transaction::Transactable, AutoCommit, ChangeHash, ObjId, ReadDoc, ScalarValue, Value, ROOT};
use autosurgeon::{hydrate, reconcile};
use tracing::debug;

use super::capture::{CaptureStage, DamageCapture};
use super::model::{
    new_marker_id, now_millis, Cursor, DamageMarker, DamageType, FuelLevel, HandoverKind,
    InspectionRoot, MarkerPosition, PhotoRef, Section, Severity, Step, TyreCondition,
};
use super::predicate::{self, StepStatus};
use super::record::{InspectionRecord, InspectionSummary};
use crate::config::WorkflowConfig;
use crate::error::{HandoverError, HandoverResult};

/// Automerge-backed state for one inspection.
///
/// Uses a hybrid approach:
/// - `update_state()` for structural operations (photos, markers, cursor)
/// - `set_*()` documentation/notes/signature setters as direct puts
///
/// # Caching Strategy
///
/// - `cached_state`: Full InspectionRoot, invalidated on any direct mutation
pub struct InspectionManager {
    doc: AutoCommit,
    /// Cached hydrated state - invalidated after direct document mutations.
    cached_state: Option<InspectionRoot>,
    config: WorkflowConfig,
    /// Provisional marker capture; never persisted.
    capture: DamageCapture,
}

impl InspectionManager {
    // =========================================================================
    // INITIALIZATION
    // =========================================================================

    /// Creates an empty inspection for a job.
    pub fn new(job_id: &str, kind: HandoverKind, config: WorkflowConfig) -> HandoverResult<Self> {
        Self::from_state(InspectionRoot::new(job_id, kind), config)
    }

    /// Creates a manager seeded with an existing state.
    pub fn from_state(root: InspectionRoot, config: WorkflowConfig) -> HandoverResult<Self> {
        let mut doc = AutoCommit::new();
        reconcile(&mut doc, &root)?;
        Ok(Self {
            doc,
            cached_state: Some(root),
            capture: DamageCapture::new(config.require_damage_photo),
            config,
        })
    }

    /// Restores a manager from a saved draft.
    pub fn from_bytes(bytes: &[u8], config: WorkflowConfig) -> HandoverResult<Self> {
        let doc = AutoCommit::load(bytes)?;
        let mut manager = Self {
            doc,
            cached_state: None,
            capture: DamageCapture::new(config.require_damage_photo),
            config,
        };
        // Fail early on drafts that do not hydrate.
        manager.get_state()?;
        Ok(manager)
    }

    /// Saves the document to binary format.
    pub fn save(&mut self) -> Vec<u8> {
        self.doc.save()
    }

    /// Current document heads. They change with every committed edit, so
    /// comparing two readings tells whether anything needs saving.
    pub fn heads(&mut self) -> Vec<ChangeHash> {
        self.doc.get_heads()
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    // =========================================================================
    // HIGH-LEVEL OPERATIONS (via Hydrate/Reconcile)
    // =========================================================================

    /// Hydrates the entire document state to Rust structs.
    pub fn get_state(&mut self) -> HandoverResult<InspectionRoot> {
        Ok(self.state()?.clone())
    }

    /// Borrowing view of the state; hydrates on a cache miss.
    fn state(&mut self) -> HandoverResult<&InspectionRoot> {
        if self.cached_state.is_none() {
            let state: InspectionRoot = hydrate(&self.doc)?;
            self.cached_state = Some(state);
        }
        match self.cached_state.as_ref() {
            Some(state) => Ok(state),
            None => Err(HandoverError::serialization("state cache empty after hydrate")),
        }
    }

    /// Applies a function to mutate the state, then reconciles back to the document.
    pub fn update_state<F, T>(&mut self, f: F) -> HandoverResult<T>
    where
        F: FnOnce(&mut InspectionRoot) -> HandoverResult<T>,
    {
        let mut state = self.get_state()?;
        let out = f(&mut state)?;
        state.last_updated = now_millis();
        reconcile(&mut self.doc, &state)?;
        self.cached_state = Some(state);
        Ok(out)
    }

    pub fn job_id(&mut self) -> HandoverResult<String> {
        Ok(self.state()?.job_id.clone())
    }

    // =========================================================================
    // WORKFLOW STATE MACHINE
    // =========================================================================

    /// Current cursor (overview when `step` is `None`).
    pub fn cursor(&mut self) -> HandoverResult<Cursor> {
        Ok(self.state()?.cursor)
    }

    /// Jumps to any step. Existing data is never reset.
    pub fn open_step(&mut self, step: Step) -> HandoverResult<()> {
        debug!(step = %step, "opening step");
        self.update_state(|state| {
            state.cursor = Cursor::at(step);
            Ok(())
        })
    }

    /// Drills into a section of the open step.
    pub fn open_sub_section(&mut self, section: Section) -> HandoverResult<()> {
        self.update_state(|state| {
            let step = state.cursor.step.ok_or(HandoverError::NoActiveStep)?;
            if section.step() != step {
                return Err(HandoverError::SectionNotInStep { section, step });
            }
            state.cursor.sub_section = Some(section);
            Ok(())
        })
    }

    /// Leaves the drill-down, staying on the step.
    pub fn close_sub_section(&mut self) -> HandoverResult<()> {
        self.update_state(|state| {
            state.cursor.sub_section = None;
            Ok(())
        })
    }

    pub fn back_to_overview(&mut self) -> HandoverResult<()> {
        self.update_state(|state| {
            state.cursor = Cursor::overview();
            Ok(())
        })
    }

    /// Whether "Continue" is enabled on the open step.
    pub fn can_advance(&mut self) -> HandoverResult<bool> {
        let config = self.config.clone();
        let state = self.state()?;
        Ok(match state.cursor.step {
            Some(step) => step.next().is_some() && predicate::is_step_satisfied(step, state, &config),
            None => false,
        })
    }

    /// "Continue": moves to the next step if the open one is complete.
    ///
    /// Returns the newly opened step. The signature step has no successor;
    /// it ends through submission instead.
    pub fn advance(&mut self) -> HandoverResult<Step> {
        let config = self.config.clone();
        let state = self.state()?;
        let step = state.cursor.step.ok_or(HandoverError::NoActiveStep)?;
        if !predicate::is_step_satisfied(step, state, &config) {
            return Err(HandoverError::StepIncomplete(step));
        }
        let next = step.next().ok_or(HandoverError::NoNextStep(step))?;
        self.open_step(next)?;
        Ok(next)
    }

    /// Overview badge for a step.
    pub fn step_status(&mut self, step: Step) -> HandoverResult<StepStatus> {
        let config = self.config.clone();
        let state = self.state()?;
        Ok(predicate::step_status(step, state, state.cursor.step, &config))
    }

    /// Badges for every step.
    pub fn step_statuses(&mut self) -> HandoverResult<Vec<(Step, StepStatus)>> {
        let config = self.config.clone();
        Ok(predicate::all_step_statuses(self.state()?, &config))
    }

    /// Whether every step's data is complete, i.e. ready to submit.
    pub fn is_ready_to_submit(&mut self) -> HandoverResult<bool> {
        let config = self.config.clone();
        Ok(predicate::completed_steps(self.state()?, &config) == Step::ALL.len())
    }

    // =========================================================================
    // SECTION PHOTOS
    // =========================================================================

    /// Appends a photo to a section.
    pub fn add_photo(&mut self, section: Section, photo: impl Into<PhotoRef>) -> HandoverResult<()> {
        let photo = photo.into();
        self.update_state(|state| {
            state.section_photos_mut(section).push(photo);
            Ok(())
        })
    }

    /// Removes a section photo by index.
    pub fn remove_photo(&mut self, section: Section, index: usize) -> HandoverResult<PhotoRef> {
        self.update_state(|state| {
            let photos = state.section_photos_mut(section);
            if index >= photos.len() {
                return Err(HandoverError::photo_not_found(section, index, photos.len()));
            }
            Ok(photos.remove(index))
        })
    }

    /// Photos of a section, in capture order.
    pub fn section_photos(&mut self, section: Section) -> HandoverResult<Vec<PhotoRef>> {
        Ok(self.state()?.section_photos(section).to_vec())
    }

    /// Records a tyre condition (wheel sections only).
    pub fn set_tyre_condition(
        &mut self,
        wheel: Section,
        condition: Option<TyreCondition>,
    ) -> HandoverResult<()> {
        if wheel.step() != Step::WheelsTyres {
            return Err(HandoverError::SectionNotInStep {
                section: wheel,
                step: Step::WheelsTyres,
            });
        }
        self.update_state(|state| {
            state
                .wheels
                .entry(wheel.as_str().to_string())
                .or_default()
                .tyre_condition = condition;
            Ok(())
        })
    }

    // =========================================================================
    // TARGETED FIELD UPDATES (Direct put, O(1))
    // =========================================================================

    /// Sets the V5 registration document check.
    pub fn set_v5_document(&mut self, value: Option<bool>) -> HandoverResult<()> {
        self.set_field(&["documentation"], "v5_document", opt_bool(value))
    }

    /// Sets the service history check.
    pub fn set_service_documents(&mut self, value: Option<bool>) -> HandoverResult<()> {
        self.set_field(&["documentation"], "service_documents", opt_bool(value))
    }

    /// Sets the locking wheel nut check.
    pub fn set_locking_wheel_nut(&mut self, value: Option<bool>) -> HandoverResult<()> {
        self.set_field(&["documentation"], "locking_wheel_nut", opt_bool(value))
    }

    pub fn set_notes(&mut self, notes: &str) -> HandoverResult<()> {
        self.set_field(&["other"], "notes", ScalarValue::Str(notes.into()))
    }

    pub fn set_mileage(&mut self, mileage: Option<u32>) -> HandoverResult<()> {
        let value = mileage.map_or(ScalarValue::Null, |m| ScalarValue::Uint(m as u64));
        self.set_field(&["other"], "mileage", value)
    }

    pub fn set_keys_count(&mut self, keys: Option<u32>) -> HandoverResult<()> {
        let value = keys.map_or(ScalarValue::Null, |k| ScalarValue::Uint(k as u64));
        self.set_field(&["other"], "keys_count", value)
    }

    /// Fuel level goes through reconcile so the enum encoding stays in one place.
    pub fn set_fuel_level(&mut self, level: Option<FuelLevel>) -> HandoverResult<()> {
        self.update_state(|state| {
            state.other.fuel_level = level;
            Ok(())
        })
    }

    pub fn set_customer_signature(&mut self, signature: &str) -> HandoverResult<()> {
        self.set_field(&["signatures"], "customer_signature", ScalarValue::Str(signature.into()))
    }

    pub fn set_driver_signature(&mut self, signature: &str) -> HandoverResult<()> {
        self.set_field(&["signatures"], "driver_signature", ScalarValue::Str(signature.into()))
    }

    pub fn set_customer_name(&mut self, name: Option<&str>) -> HandoverResult<()> {
        let value = name.map_or(ScalarValue::Null, |n| ScalarValue::Str(n.into()));
        self.set_field(&["signatures"], "customer_name", value)
    }

    // =========================================================================
    // DAMAGE MARKERS
    // =========================================================================

    /// Committed markers in creation order.
    pub fn markers(&mut self) -> HandoverResult<Vec<DamageMarker>> {
        Ok(self.state()?.markers_in_order().into_iter().cloned().collect())
    }

    /// Markers placed on a section.
    pub fn markers_in_section(&mut self, section: Section) -> HandoverResult<Vec<DamageMarker>> {
        Ok(self
            .state()?
            .markers_in_section(section)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn get_marker(&mut self, id: &str) -> HandoverResult<Option<DamageMarker>> {
        Ok(self.state()?.markers.get(id).cloned())
    }

    /// Number of committed markers, for display.
    pub fn marker_count(&mut self) -> HandoverResult<usize> {
        Ok(self.state()?.marker_count())
    }

    /// Commits a fully built marker, assigning id, number and timestamp.
    ///
    /// `number` is the count of markers at this moment plus one.
    pub fn add_marker(
        &mut self,
        section: Section,
        position: MarkerPosition,
        build: impl FnOnce(DamageMarker) -> DamageMarker,
    ) -> HandoverResult<DamageMarker> {
        self.update_state(|state| {
            let now = now_millis();
            let number = state.marker_count() as u32 + 1;
            let mut marker = build(DamageMarker::new(new_marker_id(now), number, section, position));
            // The builder may not move a marker or rewrite its identity.
            marker.section = section;
            marker.number = number;
            marker.created_at = now;
            let id = marker.id.clone();
            state.markers.insert(id.clone(), marker.clone());
            state.marker_order.push(id);
            debug!(marker = %marker.id, number, section = %section, "damage marker added");
            Ok(marker)
        })
    }

    /// Updates a marker's classification/description/photos.
    pub fn update_marker<F>(&mut self, id: &str, f: F) -> HandoverResult<()>
    where
        F: FnOnce(&mut DamageMarker),
    {
        self.update_state(|state| {
            let marker = state
                .markers
                .get_mut(id)
                .ok_or_else(|| HandoverError::marker_not_found(id))?;
            let (number, section, marker_id) = (marker.number, marker.section, marker.id.clone());
            f(marker);
            marker.number = number;
            marker.section = section;
            marker.id = marker_id;
            Ok(())
        })
    }

    /// Appends a photo to a committed marker.
    pub fn add_marker_photo(&mut self, id: &str, photo: impl Into<PhotoRef>) -> HandoverResult<()> {
        let photo = photo.into();
        self.update_marker(id, |marker| marker.photos.push(photo))
    }

    /// Deletes a marker. Other markers keep their numbers.
    pub fn delete_marker(&mut self, id: &str) -> HandoverResult<DamageMarker> {
        self.update_state(|state| {
            let marker = state
                .markers
                .remove(id)
                .ok_or_else(|| HandoverError::marker_not_found(id))?;
            state.marker_order.retain(|m| m != id);
            Ok(marker)
        })
    }

    // =========================================================================
    // DAMAGE CAPTURE FLOW
    // =========================================================================

    pub fn capture_stage(&self) -> CaptureStage {
        self.capture.stage()
    }

    /// The in-progress capture (stage and provisional marker).
    pub fn capture(&self) -> &DamageCapture {
        &self.capture
    }

    /// Opens the capture flow on a section and records the tap.
    pub fn mark_damage(&mut self, section: Section, position: MarkerPosition) -> HandoverResult<()> {
        self.capture.open(section);
        self.capture.mark(position)
    }

    pub fn add_damage_photo(&mut self, photo: impl Into<PhotoRef>) -> HandoverResult<()> {
        self.capture.add_photo(photo)
    }

    pub fn remove_damage_photo(&mut self, index: usize) -> HandoverResult<PhotoRef> {
        self.capture.remove_photo(index)
    }

    pub fn continue_damage(&mut self) -> HandoverResult<()> {
        self.capture.continue_to_type()
    }

    pub fn choose_damage_type(&mut self, damage_type: DamageType) -> HandoverResult<()> {
        self.capture.choose_type(damage_type)
    }

    pub fn choose_damage_size(&mut self, severity: Severity) -> HandoverResult<()> {
        self.capture.choose_size(severity)
    }

    pub fn set_damage_description(&mut self, description: &str) -> HandoverResult<()> {
        self.capture.set_description(description)
    }

    /// Commits the provisional marker, then closes the capture.
    ///
    /// If the marker cannot be written the capture stays on its last stage
    /// so the driver can retry without re-entering anything.
    pub fn complete_damage(&mut self) -> HandoverResult<DamageMarker> {
        let provisional = self.capture.finished()?.clone();
        let marker = self.add_marker(provisional.section, provisional.position, move |marker| {
            DamageMarker {
                damage_type: provisional.damage_type,
                severity: provisional.severity,
                description: provisional.description,
                photos: provisional.photos,
                ..marker
            }
        })?;
        self.capture.complete()?;
        Ok(marker)
    }

    /// Drops the provisional marker.
    pub fn cancel_damage(&mut self) {
        self.capture.cancel();
    }

    // =========================================================================
    // RECORD / SUMMARY
    // =========================================================================

    pub fn summary(&mut self) -> HandoverResult<InspectionSummary> {
        let config = self.config.clone();
        Ok(InspectionSummary::from_state(self.state()?, &config))
    }

    /// Immutable record for submission and document generation.
    pub fn to_record(&mut self) -> HandoverResult<InspectionRecord> {
        Ok(InspectionRecord::from_state(self.state()?, now_millis()))
    }

    // =========================================================================
    // INTERNAL HELPERS
    // =========================================================================

    /// Puts a scalar at `path.key` and bumps `last_updated`.
    fn set_field(&mut self, path: &[&str], key: &str, value: ScalarValue) -> HandoverResult<()> {
        self.cached_state = None;
        let obj = self.get_obj_at_path(path)?;
        self.doc.put(&obj, key, value)?;
        self.doc
            .put(&ROOT, "last_updated", ScalarValue::Int(now_millis()))?;
        Ok(())
    }

    /// Walks a path of map keys from the root.
    fn get_obj_at_path(&self, path: &[&str]) -> HandoverResult<ObjId> {
        let mut obj = ROOT;
        for key in path {
            obj = self.get_obj_at_key(&obj, key)?;
        }
        Ok(obj)
    }

    /// Gets an object ID at a map key.
    fn get_obj_at_key(&self, parent: &ObjId, key: &str) -> HandoverResult<ObjId> {
        match self.doc.get(parent, key)? {
            Some((Value::Object(_), obj_id)) => Ok(obj_id),
            Some(_) => Err(HandoverError::serialization(format!(
                "'{}' is not an object",
                key
            ))),
            None => Err(HandoverError::serialization(format!(
                "'{}' missing from draft",
                key
            ))),
        }
    }
}

fn opt_bool(value: Option<bool>) -> ScalarValue {
    value.map_or(ScalarValue::Null, ScalarValue::Boolean)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> InspectionManager {
        InspectionManager::new("job-42", HandoverKind::Collection, WorkflowConfig::default()).unwrap()
    }

    fn photograph_all(manager: &mut InspectionManager, sections: &[Section]) {
        for section in sections {
            manager.add_photo(*section, format!("{}.jpg", section)).unwrap();
        }
    }

    fn add_simple_marker(manager: &mut InspectionManager, section: Section) -> DamageMarker {
        manager
            .add_marker(section, MarkerPosition::new(10.0, 10.0), |m| m.with_type(DamageType::Scratch))
            .unwrap()
    }

    #[test]
    fn test_new_manager() {
        let mut manager = manager();
        let state = manager.get_state().unwrap();
        assert_eq!(state.job_id, "job-42");
        assert!(state.cursor.is_overview());
        assert_eq!(manager.marker_count().unwrap(), 0);
    }

    #[test]
    fn test_navigation() {
        let mut manager = manager();
        manager.open_step(Step::Exterior).unwrap();
        manager.open_sub_section(Section::Front).unwrap();
        assert_eq!(manager.cursor().unwrap().sub_section, Some(Section::Front));

        let err = manager.open_sub_section(Section::Dashboard).unwrap_err();
        assert!(matches!(err, HandoverError::SectionNotInStep { .. }));

        manager.close_sub_section().unwrap();
        assert_eq!(manager.cursor().unwrap(), Cursor::at(Step::Exterior));

        manager.back_to_overview().unwrap();
        assert!(manager.cursor().unwrap().is_overview());
        assert!(matches!(
            manager.open_sub_section(Section::Front),
            Err(HandoverError::NoActiveStep)
        ));
    }

    #[test]
    fn test_advance_gated_by_predicate() {
        let mut manager = manager();
        manager.open_step(Step::Documentation).unwrap();
        assert!(!manager.can_advance().unwrap());
        assert!(matches!(
            manager.advance(),
            Err(HandoverError::StepIncomplete(Step::Documentation))
        ));
        assert_eq!(manager.cursor().unwrap(), Cursor::at(Step::Documentation));

        manager.set_v5_document(Some(true)).unwrap();
        manager.set_service_documents(Some(false)).unwrap();
        manager.set_locking_wheel_nut(Some(true)).unwrap();
        assert!(manager.can_advance().unwrap());
        assert_eq!(manager.advance().unwrap(), Step::Exterior);
    }

    #[test]
    fn test_revisiting_keeps_data() {
        let mut manager = manager();
        manager.open_step(Step::Exterior).unwrap();
        photograph_all(&mut manager, Section::EXTERIOR);
        manager.advance().unwrap();

        manager.open_step(Step::Exterior).unwrap();
        assert_eq!(manager.section_photos(Section::Rear).unwrap(), vec!["rear.jpg".to_string()]);
        assert_eq!(manager.step_status(Step::Exterior).unwrap(), StepStatus::Continue);
        manager.open_step(Step::Interior).unwrap();
        assert_eq!(manager.step_status(Step::Exterior).unwrap(), StepStatus::Complete);
    }

    #[test]
    fn test_signature_has_no_successor() {
        let mut manager = manager();
        manager.open_step(Step::Signature).unwrap();
        manager.set_customer_signature("data:image/png;base64,c").unwrap();
        manager.set_driver_signature("data:image/png;base64,d").unwrap();
        assert!(!manager.can_advance().unwrap());
        assert!(matches!(
            manager.advance(),
            Err(HandoverError::NoNextStep(Step::Signature))
        ));
    }

    #[test]
    fn test_targeted_updates() {
        let mut manager = manager();
        manager.set_notes("Scratches noted by customer").unwrap();
        manager.set_mileage(Some(48_210)).unwrap();
        manager.set_keys_count(Some(2)).unwrap();
        manager.set_fuel_level(Some(FuelLevel::Half)).unwrap();
        manager.set_customer_name(Some("A. Customer")).unwrap();
        manager.set_v5_document(Some(false)).unwrap();

        let state = manager.get_state().unwrap();
        assert_eq!(state.other.notes, "Scratches noted by customer");
        assert_eq!(state.other.mileage, Some(48_210));
        assert_eq!(state.other.keys_count, Some(2));
        assert_eq!(state.other.fuel_level, Some(FuelLevel::Half));
        assert_eq!(state.signatures.customer_name.as_deref(), Some("A. Customer"));
        assert_eq!(state.documentation.v5_document, Some(false));

        manager.set_v5_document(None).unwrap();
        manager.set_mileage(None).unwrap();
        let state = manager.get_state().unwrap();
        assert_eq!(state.documentation.v5_document, None);
        assert_eq!(state.other.mileage, None);
    }

    #[test]
    fn test_photos_add_remove() {
        let mut manager = manager();
        manager.add_photo(Section::Dashboard, "dash-1.jpg").unwrap();
        manager.add_photo(Section::Dashboard, "dash-2.jpg").unwrap();
        assert_eq!(manager.remove_photo(Section::Dashboard, 0).unwrap(), "dash-1.jpg");
        assert!(matches!(
            manager.remove_photo(Section::Dashboard, 3),
            Err(HandoverError::PhotoNotFound { index: 3, length: 1, .. })
        ));
        assert_eq!(manager.section_photos(Section::Dashboard).unwrap(), vec!["dash-2.jpg".to_string()]);
    }

    #[test]
    fn test_tyre_condition_only_on_wheels() {
        let mut manager = manager();
        manager
            .set_tyre_condition(Section::FrontLeftWheel, Some(TyreCondition::Worn))
            .unwrap();
        assert!(manager.set_tyre_condition(Section::Roof, Some(TyreCondition::Good)).is_err());
        let state = manager.get_state().unwrap();
        assert_eq!(
            state.wheel(Section::FrontLeftWheel).unwrap().tyre_condition,
            Some(TyreCondition::Worn)
        );
    }

    #[test]
    fn test_marker_numbers_follow_count() {
        let mut manager = manager();
        for expected in 1..=4u32 {
            let before = manager.marker_count().unwrap() as u32;
            let marker = add_simple_marker(&mut manager, Section::Front);
            assert_eq!(marker.number, before + 1);
            assert_eq!(marker.number, expected);
        }
    }

    #[test]
    fn test_delete_does_not_renumber() {
        let mut manager = manager();
        let m1 = add_simple_marker(&mut manager, Section::Rear);
        let m2 = add_simple_marker(&mut manager, Section::Rear);
        let m3 = add_simple_marker(&mut manager, Section::Rear);

        manager.delete_marker(&m2.id).unwrap();

        let numbers: Vec<u32> = manager
            .markers_in_section(Section::Rear)
            .unwrap()
            .iter()
            .map(|m| m.number)
            .collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(manager.get_marker(&m1.id).unwrap().unwrap().number, 1);
        assert_eq!(manager.get_marker(&m3.id).unwrap().unwrap().number, 3);
        assert!(matches!(
            manager.delete_marker(&m2.id),
            Err(HandoverError::MarkerNotFound(_))
        ));
    }

    #[test]
    fn test_markers_scoped_by_section() {
        let mut manager = manager();
        add_simple_marker(&mut manager, Section::Front);
        add_simple_marker(&mut manager, Section::Roof);
        add_simple_marker(&mut manager, Section::Front);

        assert_eq!(manager.markers_in_section(Section::Front).unwrap().len(), 2);
        assert_eq!(manager.markers_in_section(Section::Roof).unwrap().len(), 1);
        assert_eq!(manager.markers().unwrap().len(), 3);
    }

    #[test]
    fn test_update_marker_keeps_identity() {
        let mut manager = manager();
        let marker = add_simple_marker(&mut manager, Section::Boot);
        manager
            .update_marker(&marker.id, |m| {
                m.severity = Severity::Major;
                m.number = 99;
                m.section = Section::Roof;
            })
            .unwrap();
        manager.add_marker_photo(&marker.id, "boot-dent.jpg").unwrap();

        let updated = manager.get_marker(&marker.id).unwrap().unwrap();
        assert_eq!(updated.severity, Severity::Major);
        assert_eq!(updated.number, 1);
        assert_eq!(updated.section, Section::Boot);
        assert_eq!(updated.photos, vec!["boot-dent.jpg".to_string()]);
    }

    #[test]
    fn test_capture_flow_commits_marker() {
        let mut manager = manager();
        manager.mark_damage(Section::DriverSide, MarkerPosition::new(30.0, 70.0)).unwrap();
        manager.add_damage_photo("scuff.jpg").unwrap();
        manager.continue_damage().unwrap();
        manager.choose_damage_type(DamageType::Scuff).unwrap();
        manager.choose_damage_size(Severity::Moderate).unwrap();
        manager.set_damage_description("Lower sill").unwrap();
        let marker = manager.complete_damage().unwrap();

        assert_eq!(marker.number, 1);
        assert_eq!(marker.section, Section::DriverSide);
        assert_eq!(marker.damage_type, DamageType::Scuff);
        assert_eq!(manager.capture_stage(), CaptureStage::Closed);
        assert_eq!(manager.markers_in_section(Section::DriverSide).unwrap(), vec![marker]);
    }

    #[test]
    fn test_cancelled_capture_leaves_markers_unchanged() {
        let mut manager = manager();
        add_simple_marker(&mut manager, Section::Front);
        let before = manager.get_state().unwrap().markers;

        manager.mark_damage(Section::Front, MarkerPosition::new(5.0, 5.0)).unwrap();
        manager.add_damage_photo("x.jpg").unwrap();
        manager.continue_damage().unwrap();
        manager.choose_damage_type(DamageType::Crack).unwrap();
        manager.cancel_damage();

        assert_eq!(manager.get_state().unwrap().markers, before);
        assert_eq!(manager.capture_stage(), CaptureStage::Closed);
    }

    #[test]
    fn test_failed_commit_keeps_capture() {
        let mut manager = manager();
        manager.mark_damage(Section::Front, MarkerPosition::new(50.0, 20.0)).unwrap();
        manager.add_damage_photo("front-chip.jpg").unwrap();
        manager.continue_damage().unwrap();
        manager.choose_damage_type(DamageType::Chip).unwrap();
        manager.choose_damage_size(Severity::Minor).unwrap();
        manager.set_damage_description("Stone chip").unwrap();

        // A document that no longer hydrates makes the marker write fail.
        manager.doc.put(&ROOT, "marker_order", "broken").unwrap();
        manager.cached_state = None;
        assert!(manager.complete_damage().is_err());

        assert_eq!(manager.capture_stage(), CaptureStage::Description);
        let provisional = manager.capture.provisional().unwrap();
        assert_eq!(provisional.section, Section::Front);
        assert_eq!(provisional.description, "Stone chip");
        assert_eq!(provisional.photos, vec!["front-chip.jpg".to_string()]);
    }

    #[test]
    fn test_heads_track_commits_only() {
        let mut manager = manager();
        let before = manager.heads();
        manager.mark_damage(Section::Front, MarkerPosition::new(1.0, 1.0)).unwrap();
        assert_eq!(manager.heads(), before);

        manager.add_photo(Section::Front, "front.jpg").unwrap();
        assert_ne!(manager.heads(), before);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let mut manager = manager();
        manager.open_step(Step::Exterior).unwrap();
        manager.open_sub_section(Section::Roof).unwrap();
        manager.add_photo(Section::Roof, "roof-1.jpg").unwrap();
        manager.add_photo(Section::Roof, "roof-2.jpg").unwrap();
        add_simple_marker(&mut manager, Section::Roof);
        add_simple_marker(&mut manager, Section::Front);
        manager.set_notes("All good").unwrap();

        let original = manager.get_state().unwrap();
        let bytes = manager.save();
        let mut loaded = InspectionManager::from_bytes(&bytes, WorkflowConfig::default()).unwrap();
        let restored = loaded.get_state().unwrap();

        assert_eq!(restored, original);
        assert_eq!(restored.cursor, Cursor { step: Some(Step::Exterior), sub_section: Some(Section::Roof) });
        assert_eq!(restored.marker_order, original.marker_order);
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(InspectionManager::from_bytes(b"not a draft", WorkflowConfig::default()).is_err());
    }

    #[test]
    fn test_ready_to_submit() {
        let mut manager = manager();
        assert!(!manager.is_ready_to_submit().unwrap());

        manager.set_v5_document(Some(true)).unwrap();
        manager.set_service_documents(Some(true)).unwrap();
        manager.set_locking_wheel_nut(Some(false)).unwrap();
        photograph_all(&mut manager, Section::EXTERIOR);
        photograph_all(&mut manager, Section::WHEELS);
        for wheel in Section::WHEELS {
            manager.set_tyre_condition(*wheel, Some(TyreCondition::Good)).unwrap();
        }
        photograph_all(&mut manager, Section::INTERIOR);
        manager.set_customer_signature("sig-c").unwrap();
        manager.set_driver_signature("sig-d").unwrap();

        assert!(manager.is_ready_to_submit().unwrap());
    }
}
