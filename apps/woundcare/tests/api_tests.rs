//! Integration tests for the woundcare HTTP API.
//!
//! Uses axum-test to test the API handlers without starting a real server.

// Allow unwrap and panic in tests - these are standard for test code
// Allow holding MutexGuard across await in auth tests - tests are serialized
// intentionally to avoid env var conflicts
#![allow(clippy::unwrap_used, clippy::panic, clippy::await_holding_lock)]

use axum::http::HeaderValue;
use axum_test::TestServer;
use serde_json::json;
use std::sync::Mutex;
use woundcare::api::{
    API_KEY_ENV, AppState, DeleteResponse, EvaluateResponse, HealthResponse, SummaryResponse,
    TreatmentListResponse, TreatmentResponse, WoundListResponse, WoundResponse, create_router,
};
use chrono::{DateTime, Utc};
use woundcare_core::{
    ClinicalStage, MemoryStore, NewTreatment, NewWound, Registry, StageWrite, Treatment, Wound,
    WoundId, WoundStore, WoundcareError,
};

/// Mutex to serialize tests since some of them modify env vars.
static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Guard wrapper that holds the mutex and ensures cleanup on drop.
struct TestGuard {
    _guard: std::sync::MutexGuard<'static, ()>,
}

impl Drop for TestGuard {
    fn drop(&mut self) {
        // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no concurrent env access.
        unsafe { std::env::remove_var(API_KEY_ENV) };
    }
}

fn lock_env() -> std::sync::MutexGuard<'static, ()> {
    ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
}

/// Create a test server with a fresh in-memory registry.
fn create_test_server() -> (TestServer, TestGuard) {
    create_test_server_with(Registry::new())
}

fn create_test_server_with(registry: Registry) -> (TestServer, TestGuard) {
    let guard = lock_env();
    // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::remove_var(API_KEY_ENV) };
    let router = create_router(AppState::new(registry));
    (
        TestServer::new(router).unwrap(),
        TestGuard { _guard: guard },
    )
}

/// In-memory store whose treatment history cannot be read back.
#[derive(Default)]
struct UnreadableHistory {
    inner: MemoryStore,
}

impl WoundStore for UnreadableHistory {
    fn insert_wound(&mut self, new: NewWound, now: DateTime<Utc>) -> Result<Wound, WoundcareError> {
        self.inner.insert_wound(new, now)
    }

    fn get_wound(&self, id: WoundId) -> Result<Option<Wound>, WoundcareError> {
        self.inner.get_wound(id)
    }

    fn list_wounds(&self) -> Result<Vec<Wound>, WoundcareError> {
        self.inner.list_wounds()
    }

    fn replace_wound(&mut self, wound: &Wound) -> Result<(), WoundcareError> {
        self.inner.replace_wound(wound)
    }

    fn delete_wound(&mut self, id: WoundId) -> Result<bool, WoundcareError> {
        self.inner.delete_wound(id)
    }

    fn insert_treatment(
        &mut self,
        wound_id: WoundId,
        new: NewTreatment,
        now: DateTime<Utc>,
    ) -> Result<Treatment, WoundcareError> {
        self.inner.insert_treatment(wound_id, new, now)
    }

    fn list_treatments_by_wound(&self, _: WoundId) -> Result<Vec<Treatment>, WoundcareError> {
        Err(WoundcareError::IoError("history unavailable".into()))
    }

    fn set_stage_if(
        &mut self,
        id: WoundId,
        expected: ClinicalStage,
        stage: ClinicalStage,
        now: DateTime<Utc>,
    ) -> Result<StageWrite, WoundcareError> {
        self.inner.set_stage_if(id, expected, stage, now)
    }

    fn wound_count(&self) -> Result<usize, WoundcareError> {
        self.inner.wound_count()
    }

    fn treatment_count(&self) -> Result<usize, WoundcareError> {
        self.inner.treatment_count()
    }
}

/// Register a wound and return its id.
async fn register(server: &TestServer, body: serde_json::Value) -> u64 {
    let response = server.post("/wounds").json(&body).await;
    assert_eq!(response.status_code().as_u16(), 201);
    let created: WoundResponse = response.json();
    created.wound.unwrap().id
}

async fn treat(server: &TestServer, id: u64) -> TreatmentResponse {
    let response = server
        .post(&format!("/wounds/{}/treatments", id))
        .json(&json!({ "notes": "limpieza con suero", "performed_by": "enf. Rojas" }))
        .await;
    assert_eq!(response.status_code().as_u16(), 201);
    response.json()
}

// =============================================================================
// HEALTH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _guard) = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_health_post_not_allowed() {
    let (server, _guard) = create_test_server();
    let response = server.post("/health").await;
    assert_eq!(response.status_code().as_u16(), 405);
}

// =============================================================================
// WOUND ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_register_wound_normalizes_fields() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/wounds")
        .json(&json!({
            "patient_id": 12,
            "infection_signs": "No",
            "pain_scale": "4",
            "exudate_amount": "Moderado",
            "length_cm": "3,5",
            "width_cm": 2,
            "location": "  talón derecho ",
            "description": ""
        }))
        .await;

    assert_eq!(response.status_code().as_u16(), 201);
    let body: WoundResponse = response.json();
    assert!(body.success);
    let wound = body.wound.unwrap();
    assert_eq!(wound.patient_id, 12);
    assert_eq!(wound.clinical_stage, ClinicalStage::ValoracionInicial);
    assert_eq!(wound.infection_signs.as_deref(), Some("no"));
    assert_eq!(wound.pain_scale, Some(4));
    assert_eq!(wound.exudate_amount.as_deref(), Some("moderado"));
    assert_eq!(wound.length_cm.unwrap().to_string(), "3.5");
    assert_eq!(wound.width_cm.unwrap().to_string(), "2");
    assert_eq!(wound.location.as_deref(), Some("talón derecho"));
    assert_eq!(wound.description, None);
}

#[tokio::test]
async fn test_register_wound_rejects_bad_pain() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/wounds")
        .json(&json!({ "patient_id": 1, "pain_scale": 11 }))
        .await;

    assert_eq!(response.status_code().as_u16(), 400);
    let body: WoundResponse = response.json();
    assert!(!body.success);
    assert!(body.error.unwrap().contains("pain_scale"));
}

#[tokio::test]
async fn test_invalid_json_body() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/wounds")
        .bytes(bytes::Bytes::from("not valid json"))
        .content_type("application/json")
        .await;

    assert!(response.status_code().is_client_error());
}

#[tokio::test]
async fn test_get_missing_wound_is_404() {
    let (server, _guard) = create_test_server();
    let response = server.get("/wounds/42").await;
    assert_eq!(response.status_code().as_u16(), 404);
}

#[tokio::test]
async fn test_list_wounds_by_patient() {
    let (server, _guard) = create_test_server();
    register(&server, json!({ "patient_id": 1 })).await;
    register(&server, json!({ "patient_id": 2 })).await;
    register(&server, json!({ "patient_id": 1 })).await;

    let all: WoundListResponse = server.get("/wounds").await.json();
    assert_eq!(all.wounds.len(), 3);

    let response = server
        .get("/wounds")
        .add_query_param("patient_id", 1)
        .await;
    response.assert_status_ok();
    let mine: WoundListResponse = response.json();
    assert_eq!(mine.wounds.len(), 2);
    assert!(mine.wounds.iter().all(|w| w.patient_id == 1));
}

#[tokio::test]
async fn test_patch_updates_without_evaluating() {
    let (server, _guard) = create_test_server();
    let id = register(&server, json!({ "patient_id": 1, "pain_scale": 3 })).await;

    let response = server
        .patch(&format!("/wounds/{}", id))
        .json(&json!({ "infection_signs": "si", "pain_scale": null }))
        .await;

    response.assert_status_ok();
    let body: WoundResponse = response.json();
    let wound = body.wound.unwrap();
    assert_eq!(wound.infection_signs.as_deref(), Some("si"));
    assert_eq!(wound.pain_scale, None);
    assert_eq!(wound.clinical_stage, ClinicalStage::ValoracionInicial);
}

#[tokio::test]
async fn test_delete_wound_cascades() {
    let (server, _guard) = create_test_server();
    let id = register(&server, json!({ "patient_id": 1 })).await;
    treat(&server, id).await;

    let response = server.delete(&format!("/wounds/{}", id)).await;
    response.assert_status_ok();
    let body: DeleteResponse = response.json();
    assert!(body.deleted);

    let response = server.get(&format!("/wounds/{}/treatments", id)).await;
    assert_eq!(response.status_code().as_u16(), 404);

    let response = server.delete(&format!("/wounds/{}", id)).await;
    assert_eq!(response.status_code().as_u16(), 404);
}

// =============================================================================
// TREATMENT AND EVALUATION TESTS
// =============================================================================

#[tokio::test]
async fn test_treatment_moves_wound_to_in_progress() {
    let (server, _guard) = create_test_server();
    let id = register(&server, json!({ "patient_id": 3 })).await;

    let body = treat(&server, id).await;
    assert!(body.success);
    assert_eq!(
        body.treatment.as_ref().unwrap().performed_by.as_deref(),
        Some("enf. Rojas")
    );
    let evaluation = body.evaluation.unwrap();
    assert_eq!(evaluation.previous_stage, ClinicalStage::ValoracionInicial);
    assert_eq!(evaluation.stage, ClinicalStage::TratamientoEnCurso);
    assert_eq!(evaluation.rule.as_deref(), Some("in_progress"));
    assert_eq!(evaluation.write, "persisted");
    assert!(evaluation.persisted);
    assert!(body.evaluation_error.is_none());

    let wound: WoundResponse = server.get(&format!("/wounds/{}", id)).await.json();
    assert_eq!(
        wound.wound.unwrap().clinical_stage,
        ClinicalStage::TratamientoEnCurso
    );
}

#[tokio::test]
async fn test_infected_wound_goes_under_observation() {
    let (server, _guard) = create_test_server();
    let id = register(&server, json!({ "patient_id": 3, "infection_signs": "si" })).await;

    let body = treat(&server, id).await;
    let evaluation = body.evaluation.unwrap();
    assert_eq!(evaluation.stage, ClinicalStage::BajoObservacion);
}

#[tokio::test]
async fn test_treatment_kept_when_evaluation_fails() {
    let (server, _guard) =
        create_test_server_with(Registry::with_store(UnreadableHistory::default()));
    let id = register(&server, json!({ "patient_id": 8 })).await;

    let body = treat(&server, id).await;
    assert!(body.success);
    assert!(body.treatment.is_some());
    assert!(body.evaluation.is_none());
    assert!(body.error.is_none());
    let reason = body.evaluation_error.unwrap();
    assert!(reason.contains("history unavailable"), "{reason}");

    let wound: WoundResponse = server.get(&format!("/wounds/{}", id)).await.json();
    assert_eq!(
        wound.wound.unwrap().clinical_stage,
        ClinicalStage::ValoracionInicial
    );
}

#[tokio::test]
async fn test_treatment_for_missing_wound_is_404() {
    let (server, _guard) = create_test_server();
    let response = server
        .post("/wounds/9/treatments")
        .json(&json!({}))
        .await;
    assert_eq!(response.status_code().as_u16(), 404);
    let body: TreatmentResponse = response.json();
    assert!(!body.success);
}

#[tokio::test]
async fn test_treatments_listed_newest_first() {
    let (server, _guard) = create_test_server();
    let id = register(&server, json!({ "patient_id": 3 })).await;
    let first = treat(&server, id).await.treatment.unwrap();
    let second = treat(&server, id).await.treatment.unwrap();

    let list: TreatmentListResponse = server
        .get(&format!("/wounds/{}/treatments", id))
        .await
        .json();
    assert_eq!(list.treatments.len(), 2);
    assert_eq!(list.treatments[0].id, second.id);
    assert_eq!(list.treatments[1].id, first.id);
}

#[tokio::test]
async fn test_explicit_evaluation_is_idempotent() {
    let (server, _guard) = create_test_server();
    let id = register(&server, json!({ "patient_id": 3 })).await;
    treat(&server, id).await;

    let response = server.post(&format!("/wounds/{}/evaluate", id)).await;
    response.assert_status_ok();
    let body: EvaluateResponse = response.json();
    assert!(body.found);
    let evaluation = body.evaluation.unwrap();
    assert_eq!(evaluation.stage, ClinicalStage::TratamientoEnCurso);
    assert_eq!(evaluation.write, "unchanged");
}

#[tokio::test]
async fn test_evaluate_missing_wound_is_404() {
    let (server, _guard) = create_test_server();
    let response = server.post("/wounds/5/evaluate").await;
    assert_eq!(response.status_code().as_u16(), 404);
    let body: EvaluateResponse = response.json();
    assert!(!body.found);
}

// =============================================================================
// STAGE OVERRIDE AND SUMMARY TESTS
// =============================================================================

#[tokio::test]
async fn test_manual_override() {
    let (server, _guard) = create_test_server();
    let id = register(&server, json!({ "patient_id": 3 })).await;

    let response = server
        .put(&format!("/wounds/{}/stage", id))
        .json(&json!({ "stage": "alta_clinica" }))
        .await;
    response.assert_status_ok();
    let body: WoundResponse = response.json();
    assert_eq!(body.wound.unwrap().clinical_stage, ClinicalStage::AltaClinica);

    let response = server
        .put(&format!("/wounds/{}/stage", id))
        .json(&json!({ "stage": "cerrada" }))
        .await;
    assert_eq!(response.status_code().as_u16(), 400);
}

#[tokio::test]
async fn test_summary_counts_stages() {
    let (server, _guard) = create_test_server();
    let a = register(&server, json!({ "patient_id": 1, "infection_signs": "si" })).await;
    let b = register(&server, json!({ "patient_id": 2 })).await;
    register(&server, json!({ "patient_id": 3 })).await;
    treat(&server, a).await;
    treat(&server, b).await;

    let response = server.get("/summary").await;
    response.assert_status_ok();
    let summary: SummaryResponse = response.json();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.alerts, 1);
    assert_eq!(summary.per_stage["bajo_observacion"], 1);
    assert_eq!(summary.per_stage["tratamiento_en_curso"], 1);
    assert_eq!(summary.per_stage["valoracion_inicial"], 1);
    assert_eq!(summary.per_stage["alta_clinica"], 0);
}

// =============================================================================
// AUTHENTICATION MIDDLEWARE TESTS
// =============================================================================

/// Create a test server with authentication enabled.
/// Must be called while holding ENV_TEST_MUTEX.
fn create_auth_test_server(api_key: &str) -> TestServer {
    // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::set_var(API_KEY_ENV, api_key) };
    let router = create_router(AppState::new(Registry::new()));
    TestServer::new(router).unwrap()
}

/// Clean up auth env var after test.
fn cleanup_auth_env() {
    // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::remove_var(API_KEY_ENV) };
}

#[tokio::test]
async fn test_auth_valid_bearer_token() {
    let _guard = lock_env();
    let api_key = "clinic-secret-12345";
    let server = create_auth_test_server(api_key);

    let response = server
        .get("/summary")
        .add_header(
            axum::http::header::AUTHORIZATION,
            format!("Bearer {}", api_key)
                .parse::<HeaderValue>()
                .unwrap(),
        )
        .await;

    cleanup_auth_env();

    response.assert_status_ok();
    let summary: SummaryResponse = response.json();
    assert_eq!(summary.total, 0);
}

#[tokio::test]
async fn test_auth_valid_raw_token() {
    let _guard = lock_env();
    let api_key = "clinic-raw-67890";
    let server = create_auth_test_server(api_key);

    let response = server
        .get("/wounds")
        .add_header(
            axum::http::header::AUTHORIZATION,
            api_key.parse::<HeaderValue>().unwrap(),
        )
        .await;

    cleanup_auth_env();

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_invalid_token_rejected() {
    let _guard = lock_env();
    let server = create_auth_test_server("correct-key");

    let response = server
        .get("/wounds")
        .add_header(
            axum::http::header::AUTHORIZATION,
            "Bearer wrong-key".parse::<HeaderValue>().unwrap(),
        )
        .await;

    cleanup_auth_env();

    assert_eq!(response.status_code().as_u16(), 401);
}

#[tokio::test]
async fn test_auth_missing_header_rejected() {
    let _guard = lock_env();
    let server = create_auth_test_server("required-key");

    let response = server.post("/wounds").json(&json!({ "patient_id": 1 })).await;

    cleanup_auth_env();

    assert_eq!(response.status_code().as_u16(), 401);
}

#[tokio::test]
async fn test_auth_health_endpoint_bypasses_auth() {
    let _guard = lock_env();
    let server = create_auth_test_server("secret-key-for-bypass-test");

    let response = server.get("/health").await;

    cleanup_auth_env();

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_bearer_prefix_only_rejected() {
    let _guard = lock_env();
    let server = create_auth_test_server("actual-key");

    let response = server
        .get("/wounds")
        .add_header(
            axum::http::header::AUTHORIZATION,
            "Bearer ".parse::<HeaderValue>().unwrap(),
        )
        .await;

    cleanup_auth_env();

    assert_eq!(response.status_code().as_u16(), 401);
}
