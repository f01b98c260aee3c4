//! Handover - Local-first vehicle collection/delivery inspection workflow.
//!
//! A driver collecting or delivering a vehicle walks through a fixed set of
//! inspection steps (documentation, exterior, wheels & tyres, interior, other
//! details, signatures), photographs each area and annotates damage with
//! numbered markers. This crate holds that workflow:
//!
//! - **Automerge-backed state**: the whole inspection lives in one document,
//!   edited through [`InspectionManager`] and saved as a binary draft
//! - **Completion predicates**: one pure function decides whether a step is
//!   complete; it gates "Continue" and drives the overview badges
//! - **Debounced drafts**: [`InspectionSession`] coalesces edits and writes
//!   them to a remote store with a local fallback, so work survives app
//!   restarts and dropped connections
//!
//! # Example
//!
//! ```rust
//! use handover::{
//!     DamageType, HandoverKind, InspectionManager, MarkerPosition, Section, Severity, Step,
//!     WorkflowConfig,
//! };
//!
//! let mut manager =
//!     InspectionManager::new("job-1042", HandoverKind::Collection, WorkflowConfig::default())
//!         .unwrap();
//!
//! // Documentation step: three yes/no checks
//! manager.open_step(Step::Documentation).unwrap();
//! manager.set_v5_document(Some(true)).unwrap();
//! manager.set_service_documents(Some(false)).unwrap();
//! manager.set_locking_wheel_nut(Some(true)).unwrap();
//! assert_eq!(manager.advance().unwrap(), Step::Exterior);
//!
//! // Annotate a dent on the front panel
//! manager.mark_damage(Section::Front, MarkerPosition::new(42.0, 61.5)).unwrap();
//! manager.add_damage_photo("data:image/jpeg;base64,/9j/4AAQ").unwrap();
//! manager.continue_damage().unwrap();
//! manager.choose_damage_type(DamageType::Dent).unwrap();
//! manager.choose_damage_size(Severity::Moderate).unwrap();
//! manager.set_damage_description("Above the number plate").unwrap();
//! let marker = manager.complete_damage().unwrap();
//! assert_eq!(marker.number, 1);
//!
//! // Save as a draft
//! let bytes = manager.save();
//! let mut restored = InspectionManager::from_bytes(&bytes, WorkflowConfig::default()).unwrap();
//! assert_eq!(restored.marker_count().unwrap(), 1);
//! ```

pub mod config;
pub mod draft;
pub mod error;
pub mod inspection;
pub mod photo;
pub mod session;

// Re-exports for convenience
pub use config::WorkflowConfig;
pub use draft::{AutoSaver, DraftStore, MemoryDraftStore};
pub use error::{HandoverError, HandoverResult};
pub use inspection::{
    CaptureStage, Cursor, DamageMarker, DamageType, FuelLevel, HandoverKind, InspectionManager,
    InspectionRecord, InspectionRoot, InspectionSummary, MarkerPosition, PhotoRef, Section,
    Severity, Step, StepStatus, TyreCondition,
};
pub use photo::PhotoSource;
pub use session::{InspectionSession, Submitter};

#[cfg(not(target_arch = "wasm32"))]
pub use draft::FileDraftStore;
#[cfg(not(target_arch = "wasm32"))]
pub use photo::FilePhotoSource;

#[cfg(feature = "remote")]
pub use draft::RemoteClient;

#[cfg(feature = "wasm")]
pub use inspection::JsInspectionManager;
