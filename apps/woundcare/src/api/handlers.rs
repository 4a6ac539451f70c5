//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Every handler reads the clock once and hands that instant to the
//! registry, so one request sees one `now`.

use super::{
    AppState,
    types::{
        DeleteResponse, ErrorResponse, EvaluateResponse, HealthResponse, RawTreatment, RawWound,
        RawWoundPatch, StageOverrideRequest, SummaryResponse, TreatmentListResponse,
        TreatmentResponse, WoundListQuery, WoundListResponse, WoundResponse,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use woundcare_core::{
    ClinicalStage, EvaluationReport, PatientId, WoundId, WoundcareError, WriteOutcome,
};

/// HTTP status for a registry error.
fn error_status(e: &WoundcareError) -> StatusCode {
    match e {
        WoundcareError::WoundNotFound(_) => StatusCode::NOT_FOUND,
        WoundcareError::InvalidField { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Log what happened to an evaluation that followed a treatment.
///
/// Transitions are logged at info; anything that left the stored stage
/// different from the computed one is logged at warn.
pub fn log_evaluation(wound_id: WoundId, report: &EvaluationReport) {
    match report {
        EvaluationReport::Completed { evaluation } => match &evaluation.write {
            WriteOutcome::Unchanged => tracing::debug!(
                wound_id = wound_id.0,
                stage = %evaluation.stage,
                "Stage unchanged"
            ),
            WriteOutcome::Persisted => tracing::info!(
                event = "stage_transition",
                wound_id = wound_id.0,
                from = %evaluation.previous,
                to = %evaluation.stage,
                rule = evaluation.rule.map(|r| r.name()).unwrap_or("none"),
                "Clinical stage updated"
            ),
            WriteOutcome::Conflict(current) => tracing::warn!(
                event = "stage_write_conflict",
                wound_id = wound_id.0,
                intended = %evaluation.stage,
                current = %current,
                "Stage changed concurrently; evaluation result not written"
            ),
            WriteOutcome::Missing => tracing::warn!(
                event = "stage_write_missing",
                wound_id = wound_id.0,
                "Wound disappeared before the stage could be written"
            ),
            WriteOutcome::Failed(reason) => tracing::warn!(
                event = "stage_write_failed",
                wound_id = wound_id.0,
                intended = %evaluation.stage,
                reason = %reason,
                "Stage computed but not persisted"
            ),
        },
        EvaluationReport::WoundMissing => tracing::warn!(
            event = "evaluation_skipped",
            wound_id = wound_id.0,
            "Wound not found during evaluation"
        ),
        EvaluationReport::Failed { reason } => tracing::warn!(
            event = "evaluation_failed",
            wound_id = wound_id.0,
            reason = %reason,
            "Stage evaluation failed"
        ),
    }
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// SUMMARY HANDLER
// =============================================================================

/// Wound counts per stage.
pub async fn summary_handler(
    State(state): State<AppState>,
) -> Result<Json<SummaryResponse>, (StatusCode, Json<ErrorResponse>)> {
    let registry = state.registry.read().await;
    registry
        .summary()
        .map(|s| Json(SummaryResponse::from(&s)))
        .map_err(|e| {
            (
                error_status(&e),
                Json(ErrorResponse::new(format!("Summary failed: {}", e))),
            )
        })
}

// =============================================================================
// WOUND HANDLERS
// =============================================================================

/// Register a wound.
pub async fn create_wound_handler(
    State(state): State<AppState>,
    Json(request): Json<RawWound>,
) -> impl IntoResponse {
    let new = match request.normalize() {
        Ok(n) => n,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(WoundResponse::error(format!("Invalid wound: {}", e))),
            );
        }
    };

    let mut registry = state.registry.write().await;
    match registry.register_wound(new, Utc::now()) {
        Ok(wound) => {
            tracing::info!(
                wound_id = wound.id.0,
                patient_id = wound.patient_id.0,
                "Wound registered"
            );
            (StatusCode::CREATED, Json(WoundResponse::success(&wound)))
        }
        Err(e) => (
            error_status(&e),
            Json(WoundResponse::error(format!("Register failed: {}", e))),
        ),
    }
}

/// List wounds, optionally for one patient.
pub async fn list_wounds_handler(
    State(state): State<AppState>,
    Query(query): Query<WoundListQuery>,
) -> impl IntoResponse {
    let registry = state.registry.read().await;
    let result = match query.patient_id {
        Some(p) => registry.wounds_for_patient(PatientId(p)),
        None => registry.list_wounds(),
    };
    match result {
        Ok(wounds) => (StatusCode::OK, Json(WoundListResponse::success(&wounds))),
        Err(e) => (
            error_status(&e),
            Json(WoundListResponse::error(format!("List failed: {}", e))),
        ),
    }
}

/// Fetch one wound.
pub async fn get_wound_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    let registry = state.registry.read().await;
    match registry.wound(WoundId(id)) {
        Ok(Some(wound)) => (StatusCode::OK, Json(WoundResponse::success(&wound))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(WoundResponse::error(format!("Wound {} not found", id))),
        ),
        Err(e) => (
            error_status(&e),
            Json(WoundResponse::error(format!("Read failed: {}", e))),
        ),
    }
}

/// Edit clinical attributes. Does not re-evaluate the stage.
pub async fn update_wound_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<RawWoundPatch>,
) -> impl IntoResponse {
    let patch = match request.normalize() {
        Ok(p) => p,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(WoundResponse::error(format!("Invalid update: {}", e))),
            );
        }
    };

    let mut registry = state.registry.write().await;
    match registry.update_attributes(WoundId(id), patch, Utc::now()) {
        Ok(wound) => (StatusCode::OK, Json(WoundResponse::success(&wound))),
        Err(e) => (
            error_status(&e),
            Json(WoundResponse::error(format!("Update failed: {}", e))),
        ),
    }
}

/// Delete a wound and its treatments.
pub async fn delete_wound_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    let mut registry = state.registry.write().await;
    match registry.delete_wound(WoundId(id)) {
        Ok(true) => {
            tracing::info!(wound_id = id, "Wound deleted");
            (StatusCode::OK, Json(DeleteResponse::deleted(true)))
        }
        Ok(false) => (StatusCode::NOT_FOUND, Json(DeleteResponse::deleted(false))),
        Err(e) => (
            error_status(&e),
            Json(DeleteResponse::error(format!("Delete failed: {}", e))),
        ),
    }
}

// =============================================================================
// TREATMENT HANDLERS
// =============================================================================

/// Treatments of a wound, most-recent-first.
pub async fn list_treatments_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    let registry = state.registry.read().await;
    match registry.treatments(WoundId(id)) {
        Ok(list) => (StatusCode::OK, Json(TreatmentListResponse::success(&list))),
        Err(e) => (
            error_status(&e),
            Json(TreatmentListResponse::error(format!("List failed: {}", e))),
        ),
    }
}

/// Record a treatment and re-evaluate the wound's stage.
pub async fn create_treatment_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<RawTreatment>,
) -> impl IntoResponse {
    let new = match request.normalize() {
        Ok(n) => n,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(TreatmentResponse::error(format!("Invalid treatment: {}", e))),
            );
        }
    };

    let wound_id = WoundId(id);
    let mut registry = state.registry.write().await;
    match registry.record_treatment(wound_id, new, Utc::now()) {
        Ok(recorded) => {
            tracing::info!(
                wound_id = id,
                treatment_id = recorded.treatment.id.0,
                "Treatment recorded"
            );
            log_evaluation(wound_id, &recorded.evaluation);
            let evaluation_error = match &recorded.evaluation {
                EvaluationReport::Completed { .. } => None,
                EvaluationReport::WoundMissing => Some("wound not found".to_string()),
                EvaluationReport::Failed { reason } => Some(reason.clone()),
            };
            (
                StatusCode::CREATED,
                Json(TreatmentResponse::success(
                    &recorded.treatment,
                    recorded.evaluation.evaluation(),
                    evaluation_error,
                )),
            )
        }
        Err(e) => (
            error_status(&e),
            Json(TreatmentResponse::error(format!("Record failed: {}", e))),
        ),
    }
}

// =============================================================================
// STAGE HANDLERS
// =============================================================================

/// Re-run the stage rules on demand.
pub async fn evaluate_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    let wound_id = WoundId(id);
    let mut registry = state.registry.write().await;
    match registry.evaluate(wound_id, Utc::now()) {
        Ok(Some(evaluation)) => {
            log_evaluation(
                wound_id,
                &EvaluationReport::Completed {
                    evaluation: evaluation.clone(),
                },
            );
            (StatusCode::OK, Json(EvaluateResponse::success(&evaluation)))
        }
        Ok(None) => (StatusCode::NOT_FOUND, Json(EvaluateResponse::not_found())),
        Err(e) => {
            tracing::warn!(
                event = "evaluation_failed",
                wound_id = id,
                reason = %e,
                "Stage evaluation failed"
            );
            (
                error_status(&e),
                Json(EvaluateResponse::error(format!("Evaluation failed: {}", e))),
            )
        }
    }
}

/// Manual stage override. Bypasses the rules.
pub async fn override_stage_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<StageOverrideRequest>,
) -> impl IntoResponse {
    let stage: ClinicalStage = match request.stage.parse() {
        Ok(s) => s,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(WoundResponse::error(format!("Invalid stage: {}", e))),
            );
        }
    };

    let mut registry = state.registry.write().await;
    match registry.override_stage(WoundId(id), stage, Utc::now()) {
        Ok(wound) => {
            tracing::info!(
                event = "stage_override",
                wound_id = id,
                stage = %stage,
                "Clinical stage set manually"
            );
            (StatusCode::OK, Json(WoundResponse::success(&wound)))
        }
        Err(e) => (
            error_status(&e),
            Json(WoundResponse::error(format!("Override failed: {}", e))),
        ),
    }
}
