//! Preset meeting scenarios.

use crate::{
    types::{MeetingScenario, Result, SessionCreatedResponse},
    AppState,
};
use axum::{
    extract::{Path, State},
    Json,
};

/// List the scenario catalog, in index order.
#[utoipa::path(
    get,
    path = "/api/scenarios",
    responses(
        (status = 200, description = "Scenario catalog", body = Vec<MeetingScenario>)
    ),
    tag = "scenarios"
)]
pub async fn list_scenarios(State(state): State<AppState>) -> Json<Vec<MeetingScenario>> {
    Json(state.facilitator.scenarios())
}

/// Start the scenario at `index` as a problem-solving meeting.
#[utoipa::path(
    post,
    path = "/api/scenarios/{index}/start",
    params(
        ("index" = usize, Path, description = "Position in the scenario catalog")
    ),
    responses(
        (status = 200, description = "Meeting started", body = SessionCreatedResponse),
        (status = 400, description = "Unknown scenario index")
    ),
    tag = "scenarios"
)]
pub async fn start_scenario(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<SessionCreatedResponse>> {
    let session_id = state.facilitator.start_scenario(index).await?;
    Ok(Json(SessionCreatedResponse { session_id }))
}
