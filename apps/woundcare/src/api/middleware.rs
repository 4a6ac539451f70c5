//! # Middleware Module
//!
//! One request budget shared by every caller of the API.
//!
//! - `WOUNDCARE_RATE_LIMIT`: requests per second, also the burst size
//!   (default 100, `0` turns the limiter off)
//!
//! Rejected requests get `429` with the usual JSON error body and a
//! `Retry-After` header in whole seconds.

use super::types::ErrorResponse;
use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

const RATE_LIMIT_ENV: &str = "WOUNDCARE_RATE_LIMIT";

const DEFAULT_RPS: NonZeroU32 = match NonZeroU32::new(100) {
    Some(v) => v,
    None => NonZeroU32::MIN,
};

pub type GlobalRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Build the shared limiter. A zero budget is treated as the default;
/// callers decide separately whether to install the limiter at all.
pub fn create_rate_limiter(requests_per_second: u32) -> GlobalRateLimiter {
    let rps = NonZeroU32::new(requests_per_second).unwrap_or(DEFAULT_RPS);
    Arc::new(RateLimiter::direct(Quota::per_second(rps)))
}

/// Budget from `WOUNDCARE_RATE_LIMIT`.
pub fn get_rate_limit_from_env() -> u32 {
    parse_rate_limit(std::env::var(RATE_LIMIT_ENV).ok().as_deref())
}

/// Unset or malformed means the default; malformed also logs a warning.
fn parse_rate_limit(raw: Option<&str>) -> u32 {
    let Some(raw) = raw.map(str::trim) else {
        return DEFAULT_RPS.get();
    };
    match raw.parse() {
        Ok(rps) => rps,
        Err(_) => {
            tracing::warn!(
                value = raw,
                default = DEFAULT_RPS.get(),
                "Ignoring malformed {}",
                RATE_LIMIT_ENV
            );
            DEFAULT_RPS.get()
        }
    }
}

/// Whole seconds for `Retry-After`, rounded up and never zero.
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

pub async fn rate_limit_middleware(
    State(limiter): State<GlobalRateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match limiter.check() {
        Ok(()) => next.run(request).await,
        Err(not_until) => {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            let retry_after = retry_after_secs(wait);
            tracing::warn!(
                event = "rate_limited",
                method = %request.method(),
                path = %request.uri().path(),
                retry_after,
                "Request budget exhausted"
            );
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after.to_string())],
                Json(ErrorResponse::new(format!(
                    "Too many requests, retry in {}s",
                    retry_after
                ))),
            )
                .into_response()
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, middleware::from_fn_with_state, routing::get};
    use axum_test::TestServer;

    #[test]
    fn budget_is_also_the_burst() {
        let limiter = create_rate_limiter(2);
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }

    #[test]
    fn zero_budget_builds_default_limiter() {
        let limiter = create_rate_limiter(0);
        for _ in 0..DEFAULT_RPS.get() {
            assert!(limiter.check().is_ok());
        }
        assert!(limiter.check().is_err());
    }

    #[test]
    fn env_value_parsing() {
        assert_eq!(parse_rate_limit(None), 100);
        assert_eq!(parse_rate_limit(Some("25")), 25);
        assert_eq!(parse_rate_limit(Some(" 0 ")), 0);
        assert_eq!(parse_rate_limit(Some("fast")), 100);
        assert_eq!(parse_rate_limit(Some("-3")), 100);
    }

    #[test]
    fn retry_after_rounds_up() {
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
        assert_eq!(retry_after_secs(Duration::from_millis(10)), 1);
        assert_eq!(retry_after_secs(Duration::from_secs(2)), 2);
        assert_eq!(retry_after_secs(Duration::from_millis(2001)), 3);
    }

    #[tokio::test]
    async fn exhausted_budget_answers_429_with_retry_after() {
        let router = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(from_fn_with_state(create_rate_limiter(1), rate_limit_middleware));
        let server = TestServer::new(router).expect("server");

        server.get("/").await.assert_status_ok();

        let rejected = server.get("/").await;
        assert_eq!(rejected.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(rejected.header(header::RETRY_AFTER), "1");
        let body: ErrorResponse = rejected.json();
        assert!(!body.success);
        assert!(body.error.starts_with("Too many requests"));
    }
}
