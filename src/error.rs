//! Error types for the inspection workflow.

use thiserror::Error;

use crate::inspection::model::{Section, Step};

/// Result type alias for workflow operations.
pub type HandoverResult<T> = Result<T, HandoverError>;

/// Errors that can occur while driving an inspection.
#[derive(Error, Debug)]
pub enum HandoverError {
    /// Automerge error during document operations.
    #[error("Automerge error: {0}")]
    Automerge(#[from] automerge::AutomergeError),

    /// Autosurgeon hydration error.
    #[error("Hydration error: {0}")]
    Hydrate(#[from] autosurgeon::HydrateError),

    /// Autosurgeon reconcile error.
    #[error("Reconcile error: {0}")]
    Reconcile(#[from] autosurgeon::ReconcileError),

    /// "Continue" pressed while the step's requirements are not met.
    #[error("Step '{0}' is not complete")]
    StepIncomplete(Step),

    /// "Continue" on the last step; it ends through submission.
    #[error("Step '{0}' is the last step; submit instead")]
    NoNextStep(Step),

    /// Action is only available while the given step is open.
    #[error("Step '{0}' is not open")]
    NotOnStep(Step),

    /// Action needs an active step but the cursor is on the overview.
    #[error("No step is open")]
    NoActiveStep,

    /// Drill-down into a section that does not belong to the open step.
    #[error("Section '{section}' is not part of step '{step}'")]
    SectionNotInStep { section: Section, step: Step },

    /// Marker not found in the document.
    #[error("Damage marker not found: {0}")]
    MarkerNotFound(String),

    /// Photo index out of bounds for a section.
    #[error("Photo {index} not found in section '{section}' ({length} photos)")]
    PhotoNotFound {
        section: Section,
        index: usize,
        length: usize,
    },

    /// Damage capture action issued in the wrong stage.
    #[error("Damage capture: cannot {action} while in stage '{stage}'")]
    CaptureOutOfOrder { action: String, stage: String },

    /// Damage capture tried to leave the photo stage without a photo.
    #[error("Damage capture requires at least one photo")]
    PhotoRequired,

    /// Draft belongs to a different job.
    #[error("Draft is for job '{found}', expected '{expected}'")]
    JobMismatch { expected: String, found: String },

    /// The workflow was already submitted.
    #[error("Inspection for job '{0}' was already submitted")]
    AlreadySubmitted(String),

    /// Draft store failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Submission endpoint failure.
    #[error("Submission failed: {0}")]
    Submission(String),

    /// Photo capture failure.
    #[error("Photo capture failed: {0}")]
    Photo(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HandoverError {
    /// Creates a MarkerNotFound error.
    pub fn marker_not_found(id: impl Into<String>) -> Self {
        Self::MarkerNotFound(id.into())
    }

    /// Creates a PhotoNotFound error.
    pub fn photo_not_found(section: Section, index: usize, length: usize) -> Self {
        Self::PhotoNotFound {
            section,
            index,
            length,
        }
    }

    /// Creates a CaptureOutOfOrder error.
    pub fn capture_out_of_order(action: impl Into<String>, stage: impl ToString) -> Self {
        Self::CaptureOutOfOrder {
            action: action.into(),
            stage: stage.to_string(),
        }
    }

    /// Creates a JobMismatch error.
    pub fn job_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::JobMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Creates a Storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Creates a Submission error.
    pub fn submission(msg: impl Into<String>) -> Self {
        Self::Submission(msg.into())
    }

    /// Creates a Photo error.
    pub fn photo(msg: impl Into<String>) -> Self {
        Self::Photo(msg.into())
    }

    /// Creates a Serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}

impl From<serde_json::Error> for HandoverError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
