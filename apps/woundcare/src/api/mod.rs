//! # woundcare HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /summary` - Wound counts per clinical stage
//! - `POST /wounds` - Register a wound
//! - `GET /wounds?patient_id=` - List wounds
//! - `GET|PATCH|DELETE /wounds/{id}` - Read, edit, delete a wound
//! - `GET|POST /wounds/{id}/treatments` - List or record treatments
//! - `POST /wounds/{id}/evaluate` - Re-run the stage rules
//! - `PUT /wounds/{id}/stage` - Manual stage override
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `WOUNDCARE_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `WOUNDCARE_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `WOUNDCARE_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{API_KEY_ENV, get_api_key_from_env};
pub use handlers::log_evaluation;
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
pub use types::{
    DeleteResponse, ErrorResponse, EvaluateResponse, EvaluationJson, HealthResponse, RawTreatment,
    RawWound, RawWoundPatch, StageOverrideRequest, SummaryResponse, TreatmentJson,
    TreatmentListResponse, TreatmentResponse, WoundJson, WoundListQuery, WoundListResponse,
    WoundResponse,
};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post, put},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use woundcare_core::{Registry, WoundcareError};

/// Maximum accepted request body (wound descriptions are short text).
const MAX_BODY_BYTES: usize = 256 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
///
/// Writers are serialized by the lock, so a treatment and the evaluation
/// it triggers never interleave with another request's writes.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RwLock<Registry>>,
}

impl AppState {
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const CORS_METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

/// Build CORS layer from `WOUNDCARE_CORS_ORIGINS`.
///
/// - `*`: all origins (development only)
/// - unset: localhost only
/// - otherwise: comma-separated list of origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("WOUNDCARE_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (WOUNDCARE_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in WOUNDCARE_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods(CORS_METHODS)
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No WOUNDCARE_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing
/// 2. CORS
/// 3. Body limit
/// 4. Rate limiting (if enabled)
/// 5. Authentication (if configured)
pub fn create_router(state: AppState) -> Router {
    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set WOUNDCARE_API_KEY environment variable to enable authentication."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/summary", get(handlers::summary_handler))
        .route(
            "/wounds",
            post(handlers::create_wound_handler).get(handlers::list_wounds_handler),
        )
        .route(
            "/wounds/{id}",
            get(handlers::get_wound_handler)
                .patch(handlers::update_wound_handler)
                .delete(handlers::delete_wound_handler),
        )
        .route(
            "/wounds/{id}/treatments",
            get(handlers::list_treatments_handler).post(handlers::create_treatment_handler),
        )
        .route("/wounds/{id}/evaluate", post(handlers::evaluate_handler))
        .route("/wounds/{id}/stage", put(handlers::override_stage_handler));

    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer())
                .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and run until Ctrl+C.
pub async fn run_server(addr: &str, registry: Registry) -> Result<(), WoundcareError> {
    let router = create_router(AppState::new(registry));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| WoundcareError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("woundcare HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| WoundcareError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
