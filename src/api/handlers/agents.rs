use crate::{types::Participant, AppState};
use axum::{extract::State, Json};

/// List the participant catalog.
#[utoipa::path(
    get,
    path = "/api/agents",
    responses(
        (status = 200, description = "Registered participants", body = Vec<Participant>)
    ),
    tag = "agents"
)]
pub async fn list_agents(State(state): State<AppState>) -> Json<Vec<Participant>> {
    Json(state.facilitator.registry().participants())
}
