use crate::{types::HealthResponse, AppState};
use axum::{extract::State, Json};
use chrono::Utc;

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Server is up", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        active_meeting_count: state.facilitator.active_meeting_count(),
    })
}
