//! Meeting lifecycle and turn handlers.

use crate::{
    api::handlers::within_gateway_timeout,
    collaboration::UserMessageOutcome,
    types::{
        AgentResponsePayload, AgentResponseRequest, AppError, CreateMeetingRequest, MeetingSnapshot,
        MeetingState, Result, SendMessageRequest, SessionCreatedResponse, SuccessResponse,
    },
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::Value;

/// Participant ids from a request body; anything but an array of strings is rejected.
pub(crate) fn participant_ids(value: Option<Value>) -> Result<Vec<String>> {
    let Some(Value::Array(items)) = value else {
        return Err(AppError::Validation(
            "topic and participants array are required".to_string(),
        ));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(id) => Ok(id),
            other => Err(AppError::Validation(format!(
                "participant ids must be strings, got {}",
                other
            ))),
        })
        .collect()
}

/// List active meetings, oldest first.
#[utoipa::path(
    get,
    path = "/api/meetings/active",
    responses(
        (status = 200, description = "Active meetings", body = Vec<MeetingState>)
    ),
    tag = "meetings"
)]
pub async fn list_active_meetings(State(state): State<AppState>) -> Json<Vec<MeetingState>> {
    Json(state.facilitator.active_meetings())
}

/// Fetch one meeting's state and full history.
#[utoipa::path(
    get,
    path = "/api/meetings/{session_id}",
    params(
        ("session_id" = String, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "Meeting state and history", body = MeetingSnapshot),
        (status = 404, description = "Meeting not found")
    ),
    tag = "meetings"
)]
pub async fn get_meeting(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<MeetingSnapshot>> {
    Ok(Json(state.facilitator.snapshot(&session_id)?))
}

/// Start a meeting.
///
/// The first contribution is requested before the response is sent.
#[utoipa::path(
    post,
    path = "/api/meetings",
    request_body = CreateMeetingRequest,
    responses(
        (status = 200, description = "Meeting started", body = SessionCreatedResponse),
        (status = 400, description = "Missing topic, participants not an array, or unknown participant")
    ),
    tag = "meetings"
)]
pub async fn create_meeting(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateMeetingRequest>, JsonRejection>,
) -> Result<Json<SessionCreatedResponse>> {
    let Json(request) = payload?;
    let topic = request
        .topic
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            AppError::Validation("topic and participants array are required".to_string())
        })?;
    let participants = participant_ids(request.participants)?;

    let session_id = state
        .facilitator
        .start_meeting(
            &topic,
            &participants,
            request.meeting_type.unwrap_or_default(),
            request.context,
        )
        .await?;

    Ok(Json(SessionCreatedResponse { session_id }))
}

/// Post a human message and collect the responses it triggers.
#[utoipa::path(
    post,
    path = "/api/meetings/{session_id}/messages",
    params(
        ("session_id" = String, Path, description = "Session ID")
    ),
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Message relayed", body = UserMessageOutcome),
        (status = 400, description = "Missing content"),
        (status = 404, description = "Meeting not found"),
        (status = 409, description = "Meeting ended or a turn is in progress")
    ),
    tag = "meetings"
)]
pub async fn send_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: std::result::Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<UserMessageOutcome>> {
    let Json(request) = payload?;
    let content = request
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::Validation("content is required".to_string()))?;

    let outcome = within_gateway_timeout(
        &state,
        &session_id,
        state.facilitator.add_user_message(
            &session_id,
            &content,
            request.direct_to.unwrap_or_default(),
        ),
    )
    .await?;

    Ok(Json(outcome))
}

/// Ask one participant for its next contribution.
#[utoipa::path(
    post,
    path = "/api/meetings/{session_id}/request-response",
    params(
        ("session_id" = String, Path, description = "Session ID")
    ),
    request_body = AgentResponseRequest,
    responses(
        (status = 200, description = "Contribution broadcast", body = AgentResponsePayload),
        (status = 400, description = "Missing or unknown agent id"),
        (status = 404, description = "Meeting not found"),
        (status = 409, description = "Meeting ended or a turn is in progress"),
        (status = 502, description = "The participant failed to respond"),
        (status = 504, description = "The participant did not respond in time")
    ),
    tag = "meetings"
)]
pub async fn request_agent_response(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: std::result::Result<Json<AgentResponseRequest>, JsonRejection>,
) -> Result<Json<AgentResponsePayload>> {
    let Json(request) = payload?;
    let agent_id = request
        .agent_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::Validation("agentId is required".to_string()))?;

    let message = within_gateway_timeout(
        &state,
        &session_id,
        state
            .facilitator
            .request_agent_response(&session_id, &agent_id),
    )
    .await?;

    Ok(Json(AgentResponsePayload {
        success: true,
        message,
    }))
}

/// End a meeting. Ending it twice succeeds.
#[utoipa::path(
    delete,
    path = "/api/meetings/{session_id}",
    params(
        ("session_id" = String, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "Meeting ended", body = SuccessResponse),
        (status = 404, description = "Meeting not found")
    ),
    tag = "meetings"
)]
pub async fn end_meeting(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SuccessResponse>> {
    state.facilitator.end_meeting(&session_id)?;
    Ok(Json(SuccessResponse { success: true }))
}
