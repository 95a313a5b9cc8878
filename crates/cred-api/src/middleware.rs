//! # HTTP Metrics
//!
//! Request counts and latency per route template, recorded through the
//! `metrics` facade. Nothing is exported unless a recorder is installed
//! (see `main.rs`).

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;

/// Record `cred_http_requests_total` and `cred_http_request_duration_seconds`.
///
/// The path label is the matched route template (`/v1/campaigns/{id}`),
/// never the raw URI, to keep label cardinality bounded.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!(
        "cred_http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "cred_http_request_duration_seconds",
        "method" => method,
        "path" => path
    )
    .record(start.elapsed().as_secs_f64());

    response
}
