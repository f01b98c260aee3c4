//! Data models for the inspection workflow.
//!
//! These structs use autosurgeon derives so the whole workflow state can live
//! in an Automerge document and be saved as a draft.

use autosurgeon::{Hydrate, Reconcile};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::{NoContext, Timestamp, Uuid};

use crate::error::HandoverError;

/// A photo reference: a `data:` URI or a storage-relative path.
pub type PhotoRef = String;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generates a time-ordered marker id (UUID v7).
pub fn new_marker_id(now_ms: i64) -> String {
    let ms = now_ms.max(0) as u64;
    let ts = Timestamp::from_unix(NoContext, ms / 1000, ((ms % 1000) * 1_000_000) as u32);
    Uuid::new_v7(ts).to_string()
}

/// Declares a fieldless enum with a stable slug, `ALL`, `Display` and `FromStr`.
macro_rules! slug_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $slug:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Reconcile, Hydrate, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $slug)] $variant ),+
        }

        impl $name {
            /// Every variant, in display order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Stable slug used in drafts, records and the JS bridge.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $slug),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = HandoverError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| {
                        HandoverError::serialization(format!(
                            "unknown {} '{}'",
                            stringify!($name),
                            s
                        ))
                    })
            }
        }
    };
}

// =============================================================================
// ENUMERATIONS
// =============================================================================

slug_enum! {
    /// Which handover the inspection documents.
    #[derive(Default)]
    HandoverKind {
        #[default]
        Collection => "collection",
        Delivery => "delivery",
    }
}

slug_enum! {
    /// Inspection steps in workflow order. The overview is not a step; it is
    /// represented by a cursor with no step.
    Step {
        Documentation => "documentation",
        Exterior => "exterior",
        WheelsTyres => "wheels-tyres",
        Interior => "interior",
        Other => "other",
        Signature => "signature",
    }
}

impl Step {
    /// The step after this one, `None` for the terminal signature step.
    pub fn next(self) -> Option<Step> {
        let idx = Self::ALL.iter().position(|s| *s == self)?;
        Self::ALL.get(idx + 1).copied()
    }

    /// The step before this one.
    pub fn previous(self) -> Option<Step> {
        let idx = Self::ALL.iter().position(|s| *s == self)?;
        idx.checked_sub(1).map(|i| Self::ALL[i])
    }

    /// Sections that can be drilled into from this step.
    pub fn sections(self) -> &'static [Section] {
        match self {
            Step::Exterior => Section::EXTERIOR,
            Step::WheelsTyres => Section::WHEELS,
            Step::Interior => Section::INTERIOR,
            Step::Documentation | Step::Other | Step::Signature => &[],
        }
    }
}

slug_enum! {
    /// A named vehicle area holding photos and damage markers.
    Section {
        Front => "front",
        Rear => "rear",
        DriverSide => "driver_side",
        PassengerSide => "passenger_side",
        Roof => "roof",
        FrontLeftWheel => "front_left_wheel",
        FrontRightWheel => "front_right_wheel",
        RearLeftWheel => "rear_left_wheel",
        RearRightWheel => "rear_right_wheel",
        Dashboard => "dashboard",
        FrontSeats => "front_seats",
        RearSeats => "rear_seats",
        Boot => "boot",
    }
}

impl Section {
    /// The five exterior panel views.
    pub const EXTERIOR: &'static [Section] = &[
        Section::Front,
        Section::Rear,
        Section::DriverSide,
        Section::PassengerSide,
        Section::Roof,
    ];

    /// The four wheel positions.
    pub const WHEELS: &'static [Section] = &[
        Section::FrontLeftWheel,
        Section::FrontRightWheel,
        Section::RearLeftWheel,
        Section::RearRightWheel,
    ];

    /// Interior areas.
    pub const INTERIOR: &'static [Section] = &[
        Section::Dashboard,
        Section::FrontSeats,
        Section::RearSeats,
        Section::Boot,
    ];

    /// The step this section belongs to.
    pub fn step(self) -> Step {
        if Self::EXTERIOR.contains(&self) {
            Step::Exterior
        } else if Self::WHEELS.contains(&self) {
            Step::WheelsTyres
        } else {
            Step::Interior
        }
    }
}

slug_enum! {
    /// Damage category.
    #[derive(Default)]
    DamageType {
        Scratch => "scratch",
        Dent => "dent",
        Chip => "chip",
        Crack => "crack",
        Scuff => "scuff",
        MissingPart => "missing_part",
        Broken => "broken",
        #[default]
        Other => "other",
    }
}

slug_enum! {
    /// Damage magnitude. The delivery screens label these small/medium/large.
    #[derive(Default)]
    Severity {
        #[default]
        Minor => "minor",
        Moderate => "moderate",
        Major => "major",
    }
}

impl Severity {
    /// Maps the size labels used by some screens onto severities.
    pub fn from_size_label(label: &str) -> Option<Severity> {
        match label {
            "small" | "minor" => Some(Severity::Minor),
            "medium" | "moderate" => Some(Severity::Moderate),
            "large" | "major" => Some(Severity::Major),
            _ => None,
        }
    }
}

slug_enum! {
    /// Tyre condition recorded per wheel.
    TyreCondition {
        Good => "good",
        Worn => "worn",
        Damaged => "damaged",
        Illegal => "illegal",
    }
}

slug_enum! {
    /// Fuel gauge reading.
    FuelLevel {
        Empty => "empty",
        Quarter => "quarter",
        Half => "half",
        ThreeQuarters => "three_quarters",
        Full => "full",
    }
}

// =============================================================================
// DOCUMENT ROOT
// =============================================================================

/// Root document for one job's inspection.
#[derive(Debug, Clone, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct InspectionRoot {
    /// Job the inspection belongs to (also the draft key).
    pub job_id: String,
    pub kind: HandoverKind,

    /// Step/sub-section pointer.
    pub cursor: Cursor,

    pub documentation: DocumentationCheck,
    /// Exterior panels keyed by section slug.
    pub exterior: HashMap<String, SectionState>,
    /// Wheels keyed by section slug.
    pub wheels: HashMap<String, WheelState>,
    /// Interior areas keyed by section slug.
    pub interior: HashMap<String, SectionState>,
    pub other: OtherDetails,
    pub signatures: Signatures,

    /// Every damage marker keyed by id; section membership is a field.
    pub markers: HashMap<String, DamageMarker>,
    /// Marker ids in creation order.
    pub marker_order: Vec<String>,

    /// Timestamps (milliseconds since epoch)
    pub created_at: i64,
    pub last_updated: i64,
}

impl InspectionRoot {
    /// Creates an empty inspection with every named section present.
    pub fn new(job_id: impl Into<String>, kind: HandoverKind) -> Self {
        let now = now_millis();
        let sections = |list: &[Section]| {
            list.iter()
                .map(|s| (s.as_str().to_string(), SectionState::default()))
                .collect::<HashMap<_, _>>()
        };
        Self {
            job_id: job_id.into(),
            kind,
            exterior: sections(Section::EXTERIOR),
            interior: sections(Section::INTERIOR),
            wheels: Section::WHEELS
                .iter()
                .map(|s| (s.as_str().to_string(), WheelState::default()))
                .collect(),
            created_at: now,
            last_updated: now,
            ..Default::default()
        }
    }

    /// Photos captured for a section (empty if never touched).
    pub fn section_photos(&self, section: Section) -> &[PhotoRef] {
        let key = section.as_str();
        let photos = match section.step() {
            Step::Exterior => self.exterior.get(key).map(|s| &s.photos),
            Step::WheelsTyres => self.wheels.get(key).map(|w| &w.photos),
            _ => self.interior.get(key).map(|s| &s.photos),
        };
        photos.map(Vec::as_slice).unwrap_or(&[])
    }

    /// Mutable photo list for a section, created on first use.
    pub fn section_photos_mut(&mut self, section: Section) -> &mut Vec<PhotoRef> {
        let key = section.as_str().to_string();
        match section.step() {
            Step::Exterior => &mut self.exterior.entry(key).or_default().photos,
            Step::WheelsTyres => &mut self.wheels.entry(key).or_default().photos,
            _ => &mut self.interior.entry(key).or_default().photos,
        }
    }

    /// Wheel state for a wheel section.
    pub fn wheel(&self, section: Section) -> Option<&WheelState> {
        self.wheels.get(section.as_str())
    }

    /// Whether a section has its required data.
    pub fn is_section_complete(&self, section: Section) -> bool {
        match section.step() {
            Step::WheelsTyres => self.wheel(section).is_some_and(WheelState::is_complete),
            _ => !self.section_photos(section).is_empty(),
        }
    }

    /// Markers in creation order.
    pub fn markers_in_order(&self) -> Vec<&DamageMarker> {
        self.marker_order
            .iter()
            .filter_map(|id| self.markers.get(id))
            .collect()
    }

    /// Markers placed on one section, in creation order.
    pub fn markers_in_section(&self, section: Section) -> Vec<&DamageMarker> {
        self.markers_in_order()
            .into_iter()
            .filter(|m| m.section == section)
            .collect()
    }

    /// Returns the number of markers.
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }
}

// =============================================================================
// CURSOR
// =============================================================================

/// Where the driver currently is in the workflow.
#[derive(Debug, Clone, Copy, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct Cursor {
    /// `None` means the overview screen.
    pub step: Option<Step>,
    /// Drill-down within the step.
    pub sub_section: Option<Section>,
}

impl Cursor {
    /// Cursor on the overview.
    pub fn overview() -> Self {
        Self::default()
    }

    /// Cursor on a step, no drill-down.
    pub fn at(step: Step) -> Self {
        Self {
            step: Some(step),
            sub_section: None,
        }
    }

    pub fn is_overview(&self) -> bool {
        self.step.is_none()
    }
}

// =============================================================================
// STEP PAYLOADS
// =============================================================================

/// Yes/no checks on paperwork handed over with the vehicle.
#[derive(Debug, Clone, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct DocumentationCheck {
    pub v5_document: Option<bool>,
    pub service_documents: Option<bool>,
    pub locking_wheel_nut: Option<bool>,
}

impl DocumentationCheck {
    /// All three questions answered (either way).
    pub fn is_complete(&self) -> bool {
        self.v5_document.is_some()
            && self.service_documents.is_some()
            && self.locking_wheel_nut.is_some()
    }
}

/// Photos for one vehicle area.
#[derive(Debug, Clone, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct SectionState {
    pub photos: Vec<PhotoRef>,
}

impl SectionState {
    /// A section is complete once it has a photo; damage is optional.
    pub fn is_complete(&self) -> bool {
        !self.photos.is_empty()
    }
}

/// Photos plus tyre condition for one wheel.
#[derive(Debug, Clone, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct WheelState {
    pub photos: Vec<PhotoRef>,
    pub tyre_condition: Option<TyreCondition>,
}

impl WheelState {
    pub fn is_complete(&self) -> bool {
        !self.photos.is_empty() && self.tyre_condition.is_some()
    }
}

/// Free-form step: notes and odometer/fuel/keys readings.
#[derive(Debug, Clone, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct OtherDetails {
    pub notes: String,
    pub mileage: Option<u32>,
    pub fuel_level: Option<FuelLevel>,
    pub keys_count: Option<u32>,
}

/// Drawn signatures (data URIs) and the customer's printed name.
#[derive(Debug, Clone, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct Signatures {
    pub customer_signature: String,
    pub driver_signature: String,
    pub customer_name: Option<String>,
}

impl Signatures {
    pub fn is_complete(&self) -> bool {
        !self.customer_signature.trim().is_empty() && !self.driver_signature.trim().is_empty()
    }
}

// =============================================================================
// DAMAGE MARKER
// =============================================================================

/// Marker position as percentages of the reference image's bounding box.
#[derive(Debug, Clone, Copy, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct MarkerPosition {
    pub x: f64,
    pub y: f64,
}

impl MarkerPosition {
    /// Creates a position, clamping both axes into [0, 100].
    pub fn new(x: f64, y: f64) -> Self {
        let clamp = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, 100.0) };
        Self {
            x: clamp(x),
            y: clamp(y),
        }
    }

    /// Converts a tap inside an element's bounding box into percentages.
    pub fn from_tap(tap_x: f64, tap_y: f64, width: f64, height: f64) -> Self {
        if width <= 0.0 || height <= 0.0 {
            return Self::default();
        }
        Self::new(tap_x / width * 100.0, tap_y / height * 100.0)
    }
}

/// One annotated point of vehicle damage.
#[derive(Debug, Clone, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct DamageMarker {
    /// Time-based unique id, never reused.
    pub id: String,

    /// Display number assigned at creation; never recomputed.
    pub number: u32,

    pub position: MarkerPosition,
    pub section: Section,
    pub damage_type: DamageType,
    pub severity: Severity,
    pub description: String,
    pub photos: Vec<PhotoRef>,

    /// Creation time (milliseconds since epoch).
    pub created_at: i64,
}

impl DamageMarker {
    /// Creates a marker with default classification.
    pub fn new(id: impl Into<String>, number: u32, section: Section, position: MarkerPosition) -> Self {
        Self {
            id: id.into(),
            number,
            position,
            section,
            damage_type: DamageType::default(),
            severity: Severity::default(),
            description: String::new(),
            photos: Vec::new(),
            created_at: now_millis(),
        }
    }

    /// Builder: Set damage type.
    pub fn with_type(mut self, damage_type: DamageType) -> Self {
        self.damage_type = damage_type;
        self
    }

    /// Builder: Set severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Builder: Set description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: Add a photo.
    pub fn with_photo(mut self, photo: impl Into<PhotoRef>) -> Self {
        self.photos.push(photo.into());
        self
    }
}

// =============================================================================
// TESTS
// =============================================================================
