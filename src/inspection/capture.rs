//! Damage-marker capture micro-flow.
//!
//! `mark → photo → type → size → description → complete`. The provisional
//! marker lives only here until `complete()`; cancelling at any stage drops
//! it without touching the committed markers.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::model::{DamageType, MarkerPosition, PhotoRef, Section, Severity};
use crate::error::{HandoverError, HandoverResult};

/// Where the capture flow is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStage {
    /// Not capturing.
    #[default]
    Closed,
    /// Waiting for the driver to tap the reference image.
    Mark,
    Photo,
    Type,
    Size,
    Description,
}

impl fmt::Display for CaptureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureStage::Closed => "closed",
            CaptureStage::Mark => "mark",
            CaptureStage::Photo => "photo",
            CaptureStage::Type => "type",
            CaptureStage::Size => "size",
            CaptureStage::Description => "description",
        };
        f.write_str(name)
    }
}

/// A marker that has not been committed yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisionalMarker {
    pub section: Section,
    pub position: MarkerPosition,
    pub damage_type: DamageType,
    pub severity: Severity,
    pub description: String,
    pub photos: Vec<PhotoRef>,
}

/// State of one damage capture.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DamageCapture {
    stage: CaptureStage,
    section: Option<Section>,
    provisional: Option<ProvisionalMarker>,
    require_photo: bool,
}

impl DamageCapture {
    /// Creates a closed capture flow.
    pub fn new(require_photo: bool) -> Self {
        Self {
            require_photo,
            ..Default::default()
        }
    }

    pub fn stage(&self) -> CaptureStage {
        self.stage
    }

    pub fn is_open(&self) -> bool {
        self.stage != CaptureStage::Closed
    }

    /// The marker being built, once a position has been tapped.
    pub fn provisional(&self) -> Option<&ProvisionalMarker> {
        self.provisional.as_ref()
    }

    /// Opens the flow for a section ("add damage" tapped).
    pub fn open(&mut self, section: Section) {
        self.stage = CaptureStage::Mark;
        self.section = Some(section);
        self.provisional = None;
    }

    /// Records the tap position and creates the provisional marker.
    pub fn mark(&mut self, position: MarkerPosition) -> HandoverResult<()> {
        self.expect(CaptureStage::Mark, "mark")?;
        let section = self
            .section
            .ok_or_else(|| HandoverError::capture_out_of_order("mark", self.stage))?;
        self.provisional = Some(ProvisionalMarker {
            section,
            position,
            damage_type: DamageType::default(),
            severity: Severity::default(),
            description: String::new(),
            photos: Vec::new(),
        });
        self.stage = CaptureStage::Photo;
        Ok(())
    }

    /// Appends a photo of the damage.
    pub fn add_photo(&mut self, photo: impl Into<PhotoRef>) -> HandoverResult<()> {
        self.expect(CaptureStage::Photo, "add a photo")?;
        self.marker_mut("add a photo")?.photos.push(photo.into());
        Ok(())
    }

    /// Removes a damage photo taken in this capture.
    pub fn remove_photo(&mut self, index: usize) -> HandoverResult<PhotoRef> {
        self.expect(CaptureStage::Photo, "remove a photo")?;
        let marker = self.marker_mut("remove a photo")?;
        if index >= marker.photos.len() {
            let (section, length) = (marker.section, marker.photos.len());
            return Err(HandoverError::photo_not_found(section, index, length));
        }
        Ok(marker.photos.remove(index))
    }

    /// Leaves the photo stage for classification.
    pub fn continue_to_type(&mut self) -> HandoverResult<()> {
        self.expect(CaptureStage::Photo, "continue")?;
        let require_photo = self.require_photo;
        if require_photo && self.marker_mut("continue")?.photos.is_empty() {
            return Err(HandoverError::PhotoRequired);
        }
        self.stage = CaptureStage::Type;
        Ok(())
    }

    /// Selects the damage type; advances to size.
    pub fn choose_type(&mut self, damage_type: DamageType) -> HandoverResult<()> {
        self.expect(CaptureStage::Type, "choose a type")?;
        self.marker_mut("choose a type")?.damage_type = damage_type;
        self.stage = CaptureStage::Size;
        Ok(())
    }

    /// Selects the severity; advances to description.
    pub fn choose_size(&mut self, severity: Severity) -> HandoverResult<()> {
        self.expect(CaptureStage::Size, "choose a size")?;
        self.marker_mut("choose a size")?.severity = severity;
        self.stage = CaptureStage::Description;
        Ok(())
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> HandoverResult<()> {
        self.expect(CaptureStage::Description, "describe")?;
        self.marker_mut("describe")?.description = description.into();
        Ok(())
    }

    /// The finished provisional marker, leaving the flow open.
    ///
    /// Callers that commit the marker somewhere fallible read it here and
    /// close the flow with [`complete`](Self::complete) once that succeeded.
    pub fn finished(&self) -> HandoverResult<&ProvisionalMarker> {
        self.expect(CaptureStage::Description, "complete")?;
        self.provisional
            .as_ref()
            .ok_or_else(|| HandoverError::capture_out_of_order("complete", self.stage))
    }

    /// Finalizes the capture and closes the flow.
    pub fn complete(&mut self) -> HandoverResult<ProvisionalMarker> {
        self.finished()?;
        let marker = self
            .provisional
            .take()
            .ok_or_else(|| HandoverError::capture_out_of_order("complete", self.stage))?;
        self.reset();
        Ok(marker)
    }

    /// Discards the provisional marker from any stage.
    pub fn cancel(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.stage = CaptureStage::Closed;
        self.section = None;
        self.provisional = None;
    }

    fn expect(&self, stage: CaptureStage, action: &str) -> HandoverResult<()> {
        if self.stage == stage {
            Ok(())
        } else {
            Err(HandoverError::capture_out_of_order(action, self.stage))
        }
    }

    fn marker_mut(&mut self, action: &str) -> HandoverResult<&mut ProvisionalMarker> {
        let stage = self.stage;
        self.provisional
            .as_mut()
            .ok_or_else(|| HandoverError::capture_out_of_order(action, stage))
    }
}
