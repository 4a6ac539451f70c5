//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.
//!
//! Request bodies reuse the core's raw forms ([`RawWound`],
//! [`RawWoundPatch`], [`RawTreatment`]) so normalization happens in one
//! place. Measurements are rendered as JSON numbers built from their
//! decimal text, so no floating-point arithmetic is involved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use woundcare_core::{
    Centimeters, ClinicalStage, Evaluation, StageSummary, Treatment, Wound, WriteOutcome,
};

pub use woundcare_core::{RawTreatment, RawWound, RawWoundPatch};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// WOUND
// =============================================================================

fn centimeters_json(cm: Option<Centimeters>) -> Option<serde_json::Number> {
    cm.and_then(|c| c.to_string().parse().ok())
}

/// Wound JSON representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WoundJson {
    pub id: u64,
    pub patient_id: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub clinical_stage: ClinicalStage,
    pub stage_label: String,
    pub infection_signs: Option<String>,
    pub pain_scale: Option<u8>,
    pub exudate_amount: Option<String>,
    pub length_cm: Option<serde_json::Number>,
    pub width_cm: Option<serde_json::Number>,
    pub location: Option<String>,
    pub wound_type: Option<String>,
    pub description: Option<String>,
}

impl From<&Wound> for WoundJson {
    fn from(w: &Wound) -> Self {
        let a = &w.attributes;
        Self {
            id: w.id.0,
            patient_id: w.patient_id.0,
            created_at: w.created_at,
            updated_at: w.updated_at,
            clinical_stage: w.clinical_stage,
            stage_label: w.clinical_stage.label().to_string(),
            infection_signs: a.infection_signs.as_ref().map(|s| s.as_str().to_string()),
            pain_scale: a.pain_scale.map(|p| p.value()),
            exudate_amount: a.exudate_amount.as_ref().map(|e| e.as_str().to_string()),
            length_cm: centimeters_json(a.length_cm),
            width_cm: centimeters_json(a.width_cm),
            location: w.location.clone(),
            wound_type: w.wound_type.clone(),
            description: w.description.clone(),
        }
    }
}

/// Single-wound response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WoundResponse {
    pub success: bool,
    pub wound: Option<WoundJson>,
    pub error: Option<String>,
}

impl WoundResponse {
    pub fn success(wound: &Wound) -> Self {
        Self {
            success: true,
            wound: Some(WoundJson::from(wound)),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            wound: None,
            error: Some(msg.into()),
        }
    }
}

/// Wound listing response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WoundListResponse {
    pub success: bool,
    pub wounds: Vec<WoundJson>,
    pub error: Option<String>,
}

impl WoundListResponse {
    pub fn success(wounds: &[Wound]) -> Self {
        Self {
            success: true,
            wounds: wounds.iter().map(WoundJson::from).collect(),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            wounds: vec![],
            error: Some(msg.into()),
        }
    }
}

/// Query string for `GET /wounds`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WoundListQuery {
    pub patient_id: Option<u64>,
}

/// Deletion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub deleted: bool,
    pub error: Option<String>,
}

impl DeleteResponse {
    pub fn deleted(deleted: bool) -> Self {
        Self {
            success: true,
            deleted,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            deleted: false,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// TREATMENTS
// =============================================================================

/// Treatment JSON representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreatmentJson {
    pub id: u64,
    pub wound_id: u64,
    pub created_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub performed_by: Option<String>,
}

impl From<&Treatment> for TreatmentJson {
    fn from(t: &Treatment) -> Self {
        Self {
            id: t.id.0,
            wound_id: t.wound_id.0,
            created_at: t.created_at,
            notes: t.notes.clone(),
            performed_by: t.performed_by.clone(),
        }
    }
}

/// Treatment listing response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentListResponse {
    pub success: bool,
    pub treatments: Vec<TreatmentJson>,
    pub error: Option<String>,
}

impl TreatmentListResponse {
    pub fn success(treatments: &[Treatment]) -> Self {
        Self {
            success: true,
            treatments: treatments.iter().map(TreatmentJson::from).collect(),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            treatments: vec![],
            error: Some(msg.into()),
        }
    }
}

/// Response to recording a treatment.
///
/// `success` reflects the treatment only. A failed evaluation is reported
/// in `evaluation_error` and never turns the response into an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentResponse {
    pub success: bool,
    pub treatment: Option<TreatmentJson>,
    pub evaluation: Option<EvaluationJson>,
    pub evaluation_error: Option<String>,
    pub error: Option<String>,
}

impl TreatmentResponse {
    pub fn success(
        treatment: &Treatment,
        evaluation: Option<&Evaluation>,
        evaluation_error: Option<String>,
    ) -> Self {
        Self {
            success: true,
            treatment: Some(TreatmentJson::from(treatment)),
            evaluation: evaluation.map(EvaluationJson::from),
            evaluation_error,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            treatment: None,
            evaluation: None,
            evaluation_error: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// EVALUATION
// =============================================================================

/// Evaluation JSON representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationJson {
    pub wound_id: u64,
    pub previous_stage: ClinicalStage,
    pub stage: ClinicalStage,
    pub stage_label: String,
    /// Name of the matched rule; absent when no rule matched.
    pub rule: Option<String>,
    pub treatment_count: usize,
    pub days_since_creation: i64,
    /// Date of the most recent treatment; absent before the first one.
    pub last_treatment_at: Option<DateTime<Utc>>,
    /// True when the stored stage equals `stage`.
    pub persisted: bool,
    /// unchanged | persisted | conflict | missing | failed
    pub write: String,
    pub write_detail: Option<String>,
}

impl From<&Evaluation> for EvaluationJson {
    fn from(e: &Evaluation) -> Self {
        let (write, write_detail) = match &e.write {
            WriteOutcome::Unchanged => ("unchanged", None),
            WriteOutcome::Persisted => ("persisted", None),
            WriteOutcome::Conflict(current) => ("conflict", Some(current.as_str().to_string())),
            WriteOutcome::Missing => ("missing", None),
            WriteOutcome::Failed(msg) => ("failed", Some(msg.clone())),
        };
        Self {
            wound_id: e.wound_id.0,
            previous_stage: e.previous,
            stage: e.stage,
            stage_label: e.stage.label().to_string(),
            rule: e.rule.map(|r| r.name().to_string()),
            treatment_count: e.metrics.treatment_count,
            days_since_creation: e.metrics.days_since_creation,
            last_treatment_at: e.metrics.last_treatment_at,
            persisted: e.is_confirmed(),
            write: write.to_string(),
            write_detail,
        }
    }
}

/// Response to an explicit evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateResponse {
    pub success: bool,
    pub found: bool,
    pub evaluation: Option<EvaluationJson>,
    pub error: Option<String>,
}

impl EvaluateResponse {
    pub fn success(evaluation: &Evaluation) -> Self {
        Self {
            success: true,
            found: true,
            evaluation: Some(EvaluationJson::from(evaluation)),
            error: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            success: true,
            found: false,
            evaluation: None,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            found: false,
            evaluation: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// STAGE OVERRIDE
// =============================================================================

/// Manual stage override request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOverrideRequest {
    pub stage: String,
}

// =============================================================================
// SUMMARY
// =============================================================================

/// Wound counts per stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub total: usize,
    /// Wounds currently flagged `bajo_observacion`.
    pub alerts: usize,
    pub per_stage: BTreeMap<String, usize>,
}

impl From<&StageSummary> for SummaryResponse {
    fn from(s: &StageSummary) -> Self {
        Self {
            total: s.total,
            alerts: s
                .per_stage
                .iter()
                .filter(|(stage, _)| stage.is_alert())
                .map(|(_, n)| *n)
                .sum(),
            per_stage: s
                .per_stage
                .iter()
                .map(|(stage, n)| (stage.as_str().to_string(), *n))
                .collect(),
        }
    }
}

/// Generic error body (used by the summary endpoint on failure).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: msg.into(),
        }
    }
}
