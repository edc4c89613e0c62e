use axum::http::header;
use axum::response::IntoResponse;

use crate::services::metrics;

/// Prometheus text exposition endpoint.
///
/// GET /metrics
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render(),
    )
}
