use crate::api::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

/// `GET /api/metrics`
///
/// Refreshes the process gauges before rendering the Prometheus snapshot.
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    metrics::gauge!("steamboat_setup_ready").set(if state.shared.is_ready() { 1.0 } else { 0.0 });
    metrics::gauge!("steamboat_uptime_seconds").set(state.start_time.elapsed().as_secs_f64());

    state.prometheus_handle.as_ref().map_or_else(
        || "Metrics not enabled or failed to initialize".to_string(),
        metrics_exporter_prometheus::PrometheusHandle::render,
    )
}

fn status_outcome(status: u16) -> &'static str {
    match status {
        500.. => "error",
        400..=499 => "client_error",
        _ => "success",
    }
}

/// One span and one finished event per request. End-user requests are tagged
/// with the gateway identity; admin requests get theirs from the auth layer.
pub async fn logging_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string());

    let gateway_user = req
        .headers()
        .get(state.config().server.user_header.as_str())
        .and_then(|h| h.to_str().ok())
        .map(|id| format!("user:{}", id.trim()));

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
        route = route.clone(),
        user_id = gateway_user,
    );

    async move {
        let response = next.run(req).await;

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let status = response.status().as_u16();
        let outcome = status_outcome(status);

        let labels = [
            ("method", method),
            ("route", route.unwrap_or_else(|| "unmatched".to_string())),
            ("status", status.to_string()),
        ];

        metrics::counter!("http_requests_total", &labels).increment(1);
        metrics::histogram!("http_request_duration_seconds", &labels)
            .record(start.elapsed().as_secs_f64());

        info!(
            event = "http_request_finished",
            duration_ms,
            status_code = status,
            outcome,
            "Request finished"
        );

        response
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::status_outcome;

    #[test]
    fn classifies_status_codes() {
        assert_eq!(status_outcome(200), "success");
        assert_eq!(status_outcome(304), "success");
        assert_eq!(status_outcome(401), "client_error");
        assert_eq!(status_outcome(503), "error");
    }
}
