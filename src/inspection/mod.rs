//! Inspection workflow module.
//!
//! Provides the Automerge-backed state for a driver's collection/delivery
//! inspection: data model, completion predicates, damage capture flow and the
//! finished record.

pub mod capture;
pub mod manager;
pub mod model;
pub mod predicate;
pub mod record;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-exports for convenience
pub use capture::{CaptureStage, DamageCapture, ProvisionalMarker};
pub use manager::InspectionManager;
pub use model::*;
pub use predicate::{is_step_satisfied, step_status, StepStatus};
pub use record::{InspectionRecord, InspectionSummary, SectionRecord, SectionSummary};

#[cfg(feature = "wasm")]
pub use wasm::JsInspectionManager;
