//! # Core Type Definitions
//!
//! This module contains the record types the stage engine reads and writes:
//! - Identifiers (`WoundId`, `TreatmentId`, `PatientId`)
//! - Clinical attributes (`PainScale`, `Centimeters`, `Exudate`, `InfectionSigns`)
//! - Records (`Wound`, `Treatment`) and their creation/patch payloads
//! - Error types (`WoundcareError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (measurements are fixed-point)
//! - Implement `Ord` where they are used as `BTreeMap` keys
//! - Are normalized once at ingestion (see [`crate::normalize`])

use crate::system::ClinicalStage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a wound record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WoundId(pub u64);

/// Identifier of a treatment ("curación") record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TreatmentId(pub u64);

/// Identifier of the patient that owns a wound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PatientId(pub u64);

impl fmt::Display for WoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TreatmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// CLINICAL ATTRIBUTES
// =============================================================================

/// Pain reported on the 0-10 numeric rating scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PainScale(u8);

impl PainScale {
    /// Highest value on the scale.
    pub const MAX: u8 = 10;

    /// Create a pain score, rejecting values above [`PainScale::MAX`].
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Get the raw score.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

/// A length in centimetres, stored as fixed-point hundredths.
///
/// `Centimeters(150)` is 1.5 cm. Comparisons are integer-only.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Centimeters(pub u32);

impl Centimeters {
    /// Hundredths per whole centimetre.
    pub const SCALE: u32 = 100;

    /// Build a measurement from whole centimetres.
    #[must_use]
    pub const fn from_whole(cm: u32) -> Self {
        Self(cm.saturating_mul(Self::SCALE))
    }

    /// Build a measurement from hundredths of a centimetre.
    #[must_use]
    pub const fn from_hundredths(hundredths: u32) -> Self {
        Self(hundredths)
    }

    /// Get the raw value in hundredths.
    #[must_use]
    pub const fn hundredths(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Centimeters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / Self::SCALE;
        let frac = self.0 % Self::SCALE;
        if frac == 0 {
            write!(f, "{}", whole)
        } else if frac % 10 == 0 {
            write!(f, "{}.{}", whole, frac / 10)
        } else {
            write!(f, "{}.{:02}", whole, frac)
        }
    }
}

/// Amount of exudate observed on the wound bed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exudate {
    Escaso,
    Moderado,
    Abundante,
    /// Any other recorded value. Kept verbatim, never matched by a rule.
    Other(String),
}

impl Exudate {
    /// Wire representation of the amount.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Exudate::Escaso => "escaso",
            Exudate::Moderado => "moderado",
            Exudate::Abundante => "abundante",
            Exudate::Other(s) => s,
        }
    }
}

impl fmt::Display for Exudate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clinician-observed signs of infection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InfectionSigns {
    /// Recorded as "si".
    Present,
    /// Recorded as "no".
    Absent,
    /// Any other recorded value. Treated as "not present" by the rules.
    Unclear(String),
}

impl InfectionSigns {
    /// Wire representation of the observation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            InfectionSigns::Present => "si",
            InfectionSigns::Absent => "no",
            InfectionSigns::Unclear(s) => s,
        }
    }
}

impl fmt::Display for InfectionSigns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The clinical attributes the stage rules look at.
///
/// Every field is optional: an unset attribute never satisfies a
/// threshold comparison.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClinicalAttributes {
    pub infection_signs: Option<InfectionSigns>,
    pub pain_scale: Option<PainScale>,
    pub exudate_amount: Option<Exudate>,
    pub length_cm: Option<Centimeters>,
    pub width_cm: Option<Centimeters>,
}

impl ClinicalAttributes {
    /// True only when infection signs were recorded as "si".
    #[must_use]
    pub fn has_infection_signs(&self) -> bool {
        matches!(self.infection_signs, Some(InfectionSigns::Present))
    }

    /// True when a pain score is recorded and strictly above `limit`.
    #[must_use]
    pub fn pain_above(&self, limit: u8) -> bool {
        self.pain_scale.is_some_and(|p| p.value() > limit)
    }

    /// True when no pain score is recorded, or it is at most `limit`.
    #[must_use]
    pub fn pain_at_most_or_unset(&self, limit: u8) -> bool {
        self.pain_scale.is_none_or(|p| p.value() <= limit)
    }

    /// True when the exudate amount equals `amount`.
    #[must_use]
    pub fn exudate_is(&self, amount: &Exudate) -> bool {
        self.exudate_amount.as_ref() == Some(amount)
    }

    /// True when both dimensions are recorded and strictly below `limit`.
    #[must_use]
    pub fn both_dimensions_below(&self, limit: Centimeters) -> bool {
        matches!(
            (self.length_cm, self.width_cm),
            (Some(l), Some(w)) if l < limit && w < limit
        )
    }

    /// True when either recorded dimension is strictly above `limit`.
    #[must_use]
    pub fn any_dimension_above(&self, limit: Centimeters) -> bool {
        self.length_cm.is_some_and(|l| l > limit) || self.width_cm.is_some_and(|w| w > limit)
    }
}

// =============================================================================
// WOUND
// =============================================================================

/// A tracked wound belonging to a patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wound {
    pub id: WoundId,
    pub patient_id: PatientId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub clinical_stage: ClinicalStage,
    pub attributes: ClinicalAttributes,
    pub location: Option<String>,
    pub wound_type: Option<String>,
    pub description: Option<String>,
}

impl Wound {
    /// Build a freshly registered wound. The stage always starts at
    /// [`ClinicalStage::ValoracionInicial`].
    #[must_use]
    pub fn register(id: WoundId, new: NewWound, now: DateTime<Utc>) -> Self {
        Self {
            id,
            patient_id: new.patient_id,
            created_at: now,
            updated_at: now,
            clinical_stage: ClinicalStage::default(),
            attributes: new.attributes,
            location: new.location,
            wound_type: new.wound_type,
            description: new.description,
        }
    }

    /// Apply a clinician edit. Stage is never touched here.
    pub fn apply_patch(&mut self, patch: WoundPatch, now: DateTime<Utc>) {
        let WoundPatch {
            infection_signs,
            pain_scale,
            exudate_amount,
            length_cm,
            width_cm,
            location,
            wound_type,
            description,
        } = patch;

        if let Some(v) = infection_signs {
            self.attributes.infection_signs = v;
        }
        if let Some(v) = pain_scale {
            self.attributes.pain_scale = v;
        }
        if let Some(v) = exudate_amount {
            self.attributes.exudate_amount = v;
        }
        if let Some(v) = length_cm {
            self.attributes.length_cm = v;
        }
        if let Some(v) = width_cm {
            self.attributes.width_cm = v;
        }
        if let Some(v) = location {
            self.location = v;
        }
        if let Some(v) = wound_type {
            self.wound_type = v;
        }
        if let Some(v) = description {
            self.description = v;
        }
        self.updated_at = now;
    }
}

/// Payload for registering a wound (already normalized).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWound {
    pub patient_id: PatientId,
    pub attributes: ClinicalAttributes,
    pub location: Option<String>,
    pub wound_type: Option<String>,
    pub description: Option<String>,
}

impl NewWound {
    /// A wound with no recorded attributes.
    #[must_use]
    pub fn for_patient(patient_id: PatientId) -> Self {
        Self {
            patient_id,
            attributes: ClinicalAttributes::default(),
            location: None,
            wound_type: None,
            description: None,
        }
    }

    /// Replace the clinical attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: ClinicalAttributes) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Partial update of a wound.
///
/// Outer `None` leaves the field untouched, `Some(None)` clears it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WoundPatch {
    pub infection_signs: Option<Option<InfectionSigns>>,
    pub pain_scale: Option<Option<PainScale>>,
    pub exudate_amount: Option<Option<Exudate>>,
    pub length_cm: Option<Option<Centimeters>>,
    pub width_cm: Option<Option<Centimeters>>,
    pub location: Option<Option<String>>,
    pub wound_type: Option<Option<String>>,
    pub description: Option<Option<String>>,
}

impl WoundPatch {
    /// Check if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// =============================================================================
// TREATMENT
// =============================================================================

/// A discrete care event applied to a wound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treatment {
    pub id: TreatmentId,
    pub wound_id: WoundId,
    pub created_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub performed_by: Option<String>,
}

/// Payload for recording a treatment (already normalized).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewTreatment {
    pub notes: Option<String>,
    pub performed_by: Option<String>,
}

/// Sort treatments most-recent-first (`created_at`, then id, descending).
pub fn sort_most_recent_first(treatments: &mut [Treatment]) {
    treatments.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the woundcare system.
///
/// - No silent failures
/// - Use `Result<T, WoundcareError>` for fallible operations
/// - The core never panics; all errors are recoverable
#[derive(Debug, Error)]
pub enum WoundcareError {
    /// The requested wound does not exist.
    #[error("Wound not found: {0}")]
    WoundNotFound(WoundId),

    /// A collaborator read failed; evaluation must not guess.
    #[error("Read failure: {0}")]
    ReadFailure(String),

    /// A collaborator write failed; the computed value was not persisted.
    #[error("Write failure: {0}")]
    WriteFailure(String),

    /// An input field could not be normalized.
    #[error("Invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl WoundcareError {
    /// Shorthand for [`WoundcareError::InvalidField`].
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
