//! # cred-api: Axum API Service
//!
//! HTTP surface over the campaign tracker and claim orchestrator.
//!
//! ## Routes
//!
//! - `/v1/campaigns/*`: Campaign creation, lookup, eligibility, proofs,
//!   claims and reconciliation.
//! - `/v1/proofs/verify`: Stateless proof verification.
//! - `/health/*`: Liveness and readiness probes.
//! - `/metrics`: Prometheus scrape endpoint.
//!
//! ## Middleware Stack (Tower)
//!
//! TraceLayer → metrics middleware → Handler
//!
//! ## Crate Policy
//!
//! - No business logic in route handlers; they delegate to
//!   `cred-distribution` and `cred-merkle`.
//! - All errors map to structured HTTP responses via `AppError`.

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::AppState;

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::campaigns::router())
        .merge(routes::proofs::router())
        .layer(from_fn(middleware::metrics_middleware))
        .layer(TraceLayer::new_for_http());

    let probes = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .route("/metrics", axum::routing::get(prometheus_metrics));

    Router::new().merge(probes).merge(api).with_state(state)
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 once the campaign store answers, 503 otherwise.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match state.tracker.list_campaigns() {
        Ok(_) => (StatusCode::OK, "ready".to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, format!("store unavailable: {e}"))
        }
    }
}

/// GET /metrics: Prometheus text exposition.
async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            handle.render(),
        )
            .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed",
        )
            .into_response(),
    }
}
