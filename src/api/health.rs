use axum::{Json, extract::State};
use std::sync::Arc;

use super::{ApiResponse, AppState, HealthResponse};

/// `GET /api/health`
///
/// Unauthenticated. `ready` is false while administrator setup is pending;
/// `db_ready` reports whether the database answers a trivial query.
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthResponse>> {
    let db_ready = match state.store().ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            false
        }
    };

    Json(ApiResponse::success(HealthResponse {
        ready: state.shared.is_ready(),
        db_ready,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: state.start_time.elapsed().as_secs(),
    }))
}
