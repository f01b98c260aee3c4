//! WASM bindings for the inspection module.
//!
//! The driver app's screens call these wrappers; enums cross the boundary as
//! their slugs (`"wheels-tyres"`, `"driver_side"`, `"minor"`, ...).

use js_sys::{Array, Uint8Array};
use serde::Serialize;
use serde_wasm_bindgen::Serializer;
use std::str::FromStr;
use wasm_bindgen::prelude::*;

use super::manager::InspectionManager;
use super::model::{MarkerPosition, Section};
use crate::config::WorkflowConfig;
use crate::error::HandoverError;

/// Serialize a value to JsValue with HashMaps as plain JS objects (not Map).
fn to_js_value<T: Serialize>(value: &T) -> Result<JsValue, serde_wasm_bindgen::Error> {
    value.serialize(&Serializer::new().serialize_maps_as_objects(true))
}

// =============================================================================
// ERROR CONVERSION
// =============================================================================

impl From<HandoverError> for JsValue {
    fn from(err: HandoverError) -> JsValue {
        JsValue::from_str(&err.to_string())
    }
}

/// Helper macro for Result conversion
macro_rules! js_result {
    ($expr:expr) => {
        $expr.map_err(|e: HandoverError| JsValue::from(e))
    };
}

fn slug<T: FromStr<Err = HandoverError>>(value: &str) -> Result<T, JsValue> {
    js_result!(value.parse::<T>())
}

fn opt_slug<T: FromStr<Err = HandoverError>>(value: Option<String>) -> Result<Option<T>, JsValue> {
    value.as_deref().map(slug).transpose()
}

fn config_from(config: JsValue) -> Result<WorkflowConfig, JsValue> {
    if config.is_undefined() || config.is_null() {
        Ok(WorkflowConfig::default())
    } else {
        Ok(serde_wasm_bindgen::from_value(config)?)
    }
}

// =============================================================================
// MAIN WRAPPER TYPE
// =============================================================================

/// JavaScript-friendly wrapper around InspectionManager.
#[wasm_bindgen]
pub struct JsInspectionManager {
    inner: InspectionManager,
}

#[wasm_bindgen]
impl JsInspectionManager {
    /// Creates an empty inspection.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// const manager = new JsInspectionManager('job-1042', 'collection', { require_other_notes: true });
    /// ```
    #[wasm_bindgen(constructor)]
    pub fn new(job_id: &str, kind: &str, config: JsValue) -> Result<JsInspectionManager, JsValue> {
        let inner = js_result!(InspectionManager::new(job_id, slug(kind)?, config_from(config)?))?;
        Ok(JsInspectionManager { inner })
    }

    /// Loads from a saved draft (Uint8Array).
    #[wasm_bindgen(js_name = fromBytes)]
    pub fn from_bytes(bytes: &[u8], config: JsValue) -> Result<JsInspectionManager, JsValue> {
        let inner = js_result!(InspectionManager::from_bytes(bytes, config_from(config)?))?;
        Ok(JsInspectionManager { inner })
    }

    /// Saves the draft (returns Uint8Array).
    ///
    /// # Example (JavaScript)
    /// ```js
    /// const bytes = manager.toBytes();
    /// await idbSet(`draft:${jobId}`, bytes);
    /// ```
    #[wasm_bindgen(js_name = toBytes)]
    pub fn to_bytes(&mut self) -> Uint8Array {
        let bytes = self.inner.save();
        Uint8Array::from(&bytes[..])
    }

    /// Gets the full inspection state as a JavaScript object.
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&mut self) -> Result<JsValue, JsValue> {
        let state = js_result!(self.inner.get_state())?;
        Ok(to_js_value(&state)?)
    }

    /// Overview data: step badges, counts and incomplete sections.
    #[wasm_bindgen(js_name = getSummary)]
    pub fn get_summary(&mut self) -> Result<JsValue, JsValue> {
        let summary = js_result!(self.inner.summary())?;
        Ok(to_js_value(&summary)?)
    }

    /// Finished record for the submission endpoint.
    #[wasm_bindgen(js_name = toRecord)]
    pub fn to_record(&mut self) -> Result<JsValue, JsValue> {
        let record = js_result!(self.inner.to_record())?;
        Ok(to_js_value(&record)?)
    }
}

// =============================================================================
// NAVIGATION METHODS
// =============================================================================

#[wasm_bindgen]
impl JsInspectionManager {
    /// Gets the cursor: `{ step, sub_section }`, both null on the overview.
    #[wasm_bindgen(js_name = getCursor)]
    pub fn get_cursor(&mut self) -> Result<JsValue, JsValue> {
        let cursor = js_result!(self.inner.cursor())?;
        Ok(to_js_value(&cursor)?)
    }

    /// Jumps to a step.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// manager.openStep('wheels-tyres');
    /// ```
    #[wasm_bindgen(js_name = openStep)]
    pub fn open_step(&mut self, step: &str) -> Result<(), JsValue> {
        js_result!(self.inner.open_step(slug(step)?))
    }

    #[wasm_bindgen(js_name = openSubSection)]
    pub fn open_sub_section(&mut self, section: &str) -> Result<(), JsValue> {
        js_result!(self.inner.open_sub_section(slug(section)?))
    }

    #[wasm_bindgen(js_name = closeSubSection)]
    pub fn close_sub_section(&mut self) -> Result<(), JsValue> {
        js_result!(self.inner.close_sub_section())
    }

    #[wasm_bindgen(js_name = backToOverview)]
    pub fn back_to_overview(&mut self) -> Result<(), JsValue> {
        js_result!(self.inner.back_to_overview())
    }

    /// Whether the "Continue" button is enabled.
    #[wasm_bindgen(js_name = canAdvance)]
    pub fn can_advance(&mut self) -> Result<bool, JsValue> {
        js_result!(self.inner.can_advance())
    }

    /// "Continue": returns the slug of the step now open.
    #[wasm_bindgen(js_name = advance)]
    pub fn advance(&mut self) -> Result<String, JsValue> {
        let step = js_result!(self.inner.advance())?;
        Ok(step.as_str().to_string())
    }

    /// Badge for a step: "not_started", "continue" or "complete".
    #[wasm_bindgen(js_name = stepStatus)]
    pub fn step_status(&mut self, step: &str) -> Result<JsValue, JsValue> {
        let status = js_result!(self.inner.step_status(slug(step)?))?;
        Ok(to_js_value(&status)?)
    }
}

// =============================================================================
// FORM FIELD METHODS
// =============================================================================

#[wasm_bindgen]
impl JsInspectionManager {
    /// Sets a documentation check by name (pass null to clear).
    ///
    /// # Example (JavaScript)
    /// ```js
    /// manager.setDocumentation('v5_document', true);
    /// ```
    #[wasm_bindgen(js_name = setDocumentation)]
    pub fn set_documentation(&mut self, field: &str, value: Option<bool>) -> Result<(), JsValue> {
        match field {
            "v5_document" => js_result!(self.inner.set_v5_document(value)),
            "service_documents" => js_result!(self.inner.set_service_documents(value)),
            "locking_wheel_nut" => js_result!(self.inner.set_locking_wheel_nut(value)),
            other => Err(JsValue::from_str(&format!("unknown documentation field '{}'", other))),
        }
    }

    #[wasm_bindgen(js_name = setNotes)]
    pub fn set_notes(&mut self, notes: &str) -> Result<(), JsValue> {
        js_result!(self.inner.set_notes(notes))
    }

    #[wasm_bindgen(js_name = setMileage)]
    pub fn set_mileage(&mut self, mileage: Option<u32>) -> Result<(), JsValue> {
        js_result!(self.inner.set_mileage(mileage))
    }

    #[wasm_bindgen(js_name = setKeysCount)]
    pub fn set_keys_count(&mut self, keys: Option<u32>) -> Result<(), JsValue> {
        js_result!(self.inner.set_keys_count(keys))
    }

    #[wasm_bindgen(js_name = setFuelLevel)]
    pub fn set_fuel_level(&mut self, level: Option<String>) -> Result<(), JsValue> {
        js_result!(self.inner.set_fuel_level(opt_slug(level)?))
    }

    #[wasm_bindgen(js_name = setCustomerSignature)]
    pub fn set_customer_signature(&mut self, data_uri: &str) -> Result<(), JsValue> {
        js_result!(self.inner.set_customer_signature(data_uri))
    }

    #[wasm_bindgen(js_name = setDriverSignature)]
    pub fn set_driver_signature(&mut self, data_uri: &str) -> Result<(), JsValue> {
        js_result!(self.inner.set_driver_signature(data_uri))
    }

    #[wasm_bindgen(js_name = setCustomerName)]
    pub fn set_customer_name(&mut self, name: Option<String>) -> Result<(), JsValue> {
        js_result!(self.inner.set_customer_name(name.as_deref()))
    }
}

// =============================================================================
// PHOTO METHODS
// =============================================================================

#[wasm_bindgen]
impl JsInspectionManager {
    #[wasm_bindgen(js_name = addPhoto)]
    pub fn add_photo(&mut self, section: &str, photo: String) -> Result<(), JsValue> {
        js_result!(self.inner.add_photo(slug(section)?, photo))
    }

    #[wasm_bindgen(js_name = removePhoto)]
    pub fn remove_photo(&mut self, section: &str, index: usize) -> Result<String, JsValue> {
        js_result!(self.inner.remove_photo(slug(section)?, index))
    }

    /// Gets a section's photos as an array of refs.
    #[wasm_bindgen(js_name = getPhotos)]
    pub fn get_photos(&mut self, section: &str) -> Result<Array, JsValue> {
        let photos = js_result!(self.inner.section_photos(slug(section)?))?;
        let array = Array::new();
        for photo in photos {
            array.push(&JsValue::from_str(&photo));
        }
        Ok(array)
    }

    /// Sets a wheel's tyre condition (pass null to clear).
    #[wasm_bindgen(js_name = setTyreCondition)]
    pub fn set_tyre_condition(&mut self, wheel: &str, condition: Option<String>) -> Result<(), JsValue> {
        js_result!(self.inner.set_tyre_condition(slug(wheel)?, opt_slug(condition)?))
    }
}

// =============================================================================
// DAMAGE METHODS
// =============================================================================

#[wasm_bindgen]
impl JsInspectionManager {
    /// Gets the markers of a section (or all markers when section is null).
    #[wasm_bindgen(js_name = getMarkers)]
    pub fn get_markers(&mut self, section: Option<String>) -> Result<JsValue, JsValue> {
        let markers = match opt_slug::<Section>(section)? {
            Some(section) => js_result!(self.inner.markers_in_section(section))?,
            None => js_result!(self.inner.markers())?,
        };
        Ok(to_js_value(&markers)?)
    }

    #[wasm_bindgen(js_name = deleteMarker)]
    pub fn delete_marker(&mut self, id: &str) -> Result<(), JsValue> {
        js_result!(self.inner.delete_marker(id))?;
        Ok(())
    }

    /// Current capture stage slug ("closed" when no capture is running).
    #[wasm_bindgen(js_name = captureStage)]
    pub fn capture_stage(&self) -> String {
        self.inner.capture_stage().to_string()
    }

    /// The provisional marker, or null.
    #[wasm_bindgen(js_name = getProvisionalMarker)]
    pub fn get_provisional_marker(&self) -> Result<JsValue, JsValue> {
        match self.inner.capture().provisional() {
            Some(marker) => Ok(to_js_value(marker)?),
            None => Ok(JsValue::NULL),
        }
    }

    /// Starts a capture from a tap on the reference image.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// const rect = img.getBoundingClientRect();
    /// manager.markDamage('front', e.clientX - rect.left, e.clientY - rect.top, rect.width, rect.height);
    /// ```
    #[wasm_bindgen(js_name = markDamage)]
    pub fn mark_damage(
        &mut self,
        section: &str,
        tap_x: f64,
        tap_y: f64,
        width: f64,
        height: f64,
    ) -> Result<(), JsValue> {
        let position = MarkerPosition::from_tap(tap_x, tap_y, width, height);
        js_result!(self.inner.mark_damage(slug(section)?, position))
    }

    #[wasm_bindgen(js_name = addDamagePhoto)]
    pub fn add_damage_photo(&mut self, photo: String) -> Result<(), JsValue> {
        js_result!(self.inner.add_damage_photo(photo))
    }

    #[wasm_bindgen(js_name = removeDamagePhoto)]
    pub fn remove_damage_photo(&mut self, index: usize) -> Result<String, JsValue> {
        js_result!(self.inner.remove_damage_photo(index))
    }

    #[wasm_bindgen(js_name = continueDamage)]
    pub fn continue_damage(&mut self) -> Result<(), JsValue> {
        js_result!(self.inner.continue_damage())
    }

    #[wasm_bindgen(js_name = chooseDamageType)]
    pub fn choose_damage_type(&mut self, damage_type: &str) -> Result<(), JsValue> {
        js_result!(self.inner.choose_damage_type(slug(damage_type)?))
    }

    /// Accepts severities or the small/medium/large labels.
    #[wasm_bindgen(js_name = chooseDamageSize)]
    pub fn choose_damage_size(&mut self, size: &str) -> Result<(), JsValue> {
        let severity = super::model::Severity::from_size_label(size)
            .ok_or_else(|| JsValue::from_str(&format!("unknown damage size '{}'", size)))?;
        js_result!(self.inner.choose_damage_size(severity))
    }

    #[wasm_bindgen(js_name = setDamageDescription)]
    pub fn set_damage_description(&mut self, description: &str) -> Result<(), JsValue> {
        js_result!(self.inner.set_damage_description(description))
    }

    /// Commits the marker and returns it.
    #[wasm_bindgen(js_name = completeDamage)]
    pub fn complete_damage(&mut self) -> Result<JsValue, JsValue> {
        let marker = js_result!(self.inner.complete_damage())?;
        Ok(to_js_value(&marker)?)
    }

    #[wasm_bindgen(js_name = cancelDamage)]
    pub fn cancel_damage(&mut self) {
        self.inner.cancel_damage();
    }
}
