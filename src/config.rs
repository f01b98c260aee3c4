//! Workflow policy knobs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default debounce before an edit is written to the draft stores.
pub const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 2_000;

/// Policy for one inspection flow variant.
///
/// Collection and delivery screens historically disagreed on two rules
/// (photo before classifying damage, mandatory notes on the "other" step);
/// both are explicit here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Debounce delay for auto-save, in milliseconds.
    pub autosave_delay_ms: u64,

    /// Damage capture cannot leave the photo stage without a photo.
    pub require_damage_photo: bool,

    /// The "other" step needs non-empty notes to count as complete.
    pub require_other_notes: bool,
}

impl WorkflowConfig {
    /// Creates the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: Set auto-save debounce delay.
    pub fn with_autosave_delay(mut self, delay: Duration) -> Self {
        self.autosave_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Builder: Set whether damage capture needs a photo.
    pub fn with_require_damage_photo(mut self, required: bool) -> Self {
        self.require_damage_photo = required;
        self
    }

    /// Builder: Set whether notes are mandatory on the "other" step.
    pub fn with_require_other_notes(mut self, required: bool) -> Self {
        self.require_other_notes = required;
        self
    }

    /// Returns the auto-save debounce delay.
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            autosave_delay_ms: DEFAULT_AUTOSAVE_DELAY_MS,
            require_damage_photo: true,
            require_other_notes: false,
        }
    }
}
