//! # Normalization Module
//!
//! Turns loosely-typed form input into the typed clinical attributes the
//! rule cascade expects.
//!
//! - `null`, `""` and whitespace-only strings mean "absent"
//! - Numbers may arrive as JSON numbers or numeric strings
//! - Measurements accept `.` or `,` as decimal separator and are stored
//!   as fixed-point hundredths (no floating-point arithmetic)
//! - Out-of-range or malformed values are rejected, never guessed

use crate::primitives::{MAX_LABEL_LENGTH, MAX_MEASUREMENT, MAX_NOTE_LENGTH, MEASUREMENT_DECIMALS};
use crate::{
    Centimeters, ClinicalAttributes, Exudate, InfectionSigns, NewTreatment, NewWound, PainScale,
    PatientId, WoundPatch, WoundcareError,
};
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// RAW FIELD
// =============================================================================

/// A form field as it arrives on the wire.
///
/// `null` is handled by wrapping this in `Option`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawField {
    Flag(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
}

impl RawField {
    /// Textual form of the field, trimmed. `None` when blank.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        let s = match self {
            RawField::Flag(b) => b.to_string(),
            RawField::Integer(i) => i.to_string(),
            RawField::Decimal(d) => d.to_string(),
            RawField::Text(s) => s.trim().to_string(),
        };
        if s.is_empty() { None } else { Some(s) }
    }
}

impl From<&str> for RawField {
    fn from(s: &str) -> Self {
        RawField::Text(s.to_string())
    }
}

impl From<i64> for RawField {
    fn from(i: i64) -> Self {
        RawField::Integer(i)
    }
}

/// Deserialize a field that distinguishes "absent" from "null".
///
/// Use with `#[serde(default, deserialize_with = "present")]` on an
/// `Option<Option<T>>`: absent stays `None`, `null` becomes `Some(None)`.
pub fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// =============================================================================
// FIELD PARSERS
// =============================================================================

/// Parse a pain score on the 0-10 scale.
pub fn pain_scale(field: Option<&RawField>) -> Result<Option<PainScale>, WoundcareError> {
    let Some(text) = field.and_then(RawField::text) else {
        return Ok(None);
    };
    let value: u8 = text
        .parse()
        .map_err(|_| WoundcareError::invalid("pain_scale", format!("'{}' is not 0-10", text)))?;
    PainScale::new(value)
        .map(Some)
        .ok_or_else(|| WoundcareError::invalid("pain_scale", format!("{} is above 10", value)))
}

/// Parse a non-negative measurement in centimetres.
pub fn measurement(
    name: &'static str,
    field: Option<&RawField>,
) -> Result<Option<Centimeters>, WoundcareError> {
    let Some(text) = field.and_then(RawField::text) else {
        return Ok(None);
    };
    let cm = parse_centimeters(&text).map_err(|reason| WoundcareError::invalid(name, reason))?;
    if cm > MAX_MEASUREMENT {
        return Err(WoundcareError::invalid(
            name,
            format!("{} cm exceeds maximum {} cm", cm, MAX_MEASUREMENT),
        ));
    }
    Ok(Some(cm))
}

/// Parse decimal text ("3", "0.5", "1,25") into fixed-point hundredths.
///
/// At most two decimals; finer values are rejected, never rounded.
fn parse_centimeters(text: &str) -> Result<Centimeters, String> {
    let normalized = text.replace(',', ".");
    let (whole, frac) = match normalized.split_once('.') {
        Some((w, f)) => (w, f),
        None => (normalized.as_str(), ""),
    };

    let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if whole.is_empty() && frac.is_empty() {
        return Err(format!("'{}' is not a number", text));
    }
    if !is_digits(whole) || !is_digits(frac) {
        return Err(format!("'{}' is not a non-negative number", text));
    }
    if frac.len() > MEASUREMENT_DECIMALS {
        return Err(format!(
            "'{}' has more than {} decimal places (precision is 0.01 cm)",
            text, MEASUREMENT_DECIMALS
        ));
    }

    let whole: u32 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| format!("'{}' is out of range", text))?
    };
    let mut frac_digits = frac.to_string();
    while frac_digits.len() < MEASUREMENT_DECIMALS {
        frac_digits.push('0');
    }
    let frac: u32 = frac_digits
        .parse()
        .map_err(|_| format!("'{}' is not a number", text))?;

    whole
        .checked_mul(Centimeters::SCALE)
        .and_then(|w| w.checked_add(frac))
        .map(Centimeters::from_hundredths)
        .ok_or_else(|| format!("'{}' is out of range", text))
}

/// Parse the exudate amount. Unknown values are kept as [`Exudate::Other`].
pub fn exudate(field: Option<&RawField>) -> Result<Option<Exudate>, WoundcareError> {
    let Some(text) = field.and_then(RawField::text) else {
        return Ok(None);
    };
    let amount = match text.to_lowercase().as_str() {
        "escaso" => Exudate::Escaso,
        "moderado" => Exudate::Moderado,
        "abundante" => Exudate::Abundante,
        _ => Exudate::Other(text),
    };
    Ok(Some(amount))
}

/// Parse the infection-signs flag. Only "si"/"sí" (any case) or `true` means present.
pub fn infection_signs(field: Option<&RawField>) -> Result<Option<InfectionSigns>, WoundcareError> {
    let signs = match field {
        None => None,
        Some(RawField::Flag(true)) => Some(InfectionSigns::Present),
        Some(RawField::Flag(false)) => Some(InfectionSigns::Absent),
        Some(other) => other.text().map(|text| match text.to_lowercase().as_str() {
            "si" | "sí" => InfectionSigns::Present,
            "no" => InfectionSigns::Absent,
            _ => InfectionSigns::Unclear(text),
        }),
    };
    Ok(signs)
}

/// Trim and length-check a free-text field. Blank means absent.
pub fn free_text(
    name: &'static str,
    value: Option<&str>,
    max_len: usize,
) -> Result<Option<String>, WoundcareError> {
    let Some(trimmed) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if trimmed.len() > max_len {
        return Err(WoundcareError::invalid(
            name,
            format!("length {} exceeds maximum {} bytes", trimmed.len(), max_len),
        ));
    }
    Ok(Some(trimmed.to_string()))
}

// =============================================================================
// RAW PAYLOADS
// =============================================================================

/// Wound registration form as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawWound {
    pub patient_id: u64,
    #[serde(default)]
    pub infection_signs: Option<RawField>,
    #[serde(default)]
    pub pain_scale: Option<RawField>,
    #[serde(default)]
    pub exudate_amount: Option<RawField>,
    #[serde(default)]
    pub length_cm: Option<RawField>,
    #[serde(default)]
    pub width_cm: Option<RawField>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub wound_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl RawWound {
    /// Normalize into a [`NewWound`].
    pub fn normalize(&self) -> Result<NewWound, WoundcareError> {
        Ok(NewWound {
            patient_id: PatientId(self.patient_id),
            attributes: ClinicalAttributes {
                infection_signs: infection_signs(self.infection_signs.as_ref())?,
                pain_scale: pain_scale(self.pain_scale.as_ref())?,
                exudate_amount: exudate(self.exudate_amount.as_ref())?,
                length_cm: measurement("length_cm", self.length_cm.as_ref())?,
                width_cm: measurement("width_cm", self.width_cm.as_ref())?,
            },
            location: free_text("location", self.location.as_deref(), MAX_LABEL_LENGTH)?,
            wound_type: free_text("wound_type", self.wound_type.as_deref(), MAX_LABEL_LENGTH)?,
            description: free_text("description", self.description.as_deref(), MAX_NOTE_LENGTH)?,
        })
    }
}

/// Clinician edit form as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawWoundPatch {
    #[serde(default, deserialize_with = "present")]
    pub infection_signs: Option<Option<RawField>>,
    #[serde(default, deserialize_with = "present")]
    pub pain_scale: Option<Option<RawField>>,
    #[serde(default, deserialize_with = "present")]
    pub exudate_amount: Option<Option<RawField>>,
    #[serde(default, deserialize_with = "present")]
    pub length_cm: Option<Option<RawField>>,
    #[serde(default, deserialize_with = "present")]
    pub width_cm: Option<Option<RawField>>,
    #[serde(default, deserialize_with = "present")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub wound_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
}

/// Apply `parse` only when the field was sent at all.
fn patched<T, R>(
    field: &Option<Option<R>>,
    parse: impl FnOnce(Option<&R>) -> Result<Option<T>, WoundcareError>,
) -> Result<Option<Option<T>>, WoundcareError> {
    field.as_ref().map(|inner| parse(inner.as_ref())).transpose()
}

impl RawWoundPatch {
    /// Normalize into a [`WoundPatch`].
    pub fn normalize(&self) -> Result<WoundPatch, WoundcareError> {
        Ok(WoundPatch {
            infection_signs: patched(&self.infection_signs, infection_signs)?,
            pain_scale: patched(&self.pain_scale, pain_scale)?,
            exudate_amount: patched(&self.exudate_amount, exudate)?,
            length_cm: patched(&self.length_cm, |f| measurement("length_cm", f))?,
            width_cm: patched(&self.width_cm, |f| measurement("width_cm", f))?,
            location: patched(&self.location, |f| {
                free_text("location", f.map(String::as_str), MAX_LABEL_LENGTH)
            })?,
            wound_type: patched(&self.wound_type, |f| {
                free_text("wound_type", f.map(String::as_str), MAX_LABEL_LENGTH)
            })?,
            description: patched(&self.description, |f| {
                free_text("description", f.map(String::as_str), MAX_NOTE_LENGTH)
            })?,
        })
    }
}

/// Treatment form as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTreatment {
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub performed_by: Option<String>,
}

impl RawTreatment {
    /// Normalize into a [`NewTreatment`].
    pub fn normalize(&self) -> Result<NewTreatment, WoundcareError> {
        Ok(NewTreatment {
            notes: free_text("notes", self.notes.as_deref(), MAX_NOTE_LENGTH)?,
            performed_by: free_text(
                "performed_by",
                self.performed_by.as_deref(),
                MAX_LABEL_LENGTH,
            )?,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
