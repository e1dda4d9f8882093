use crate::api::handlers;
use crate::collaboration::{TurnFailure, UserMessageOutcome};
use crate::types::{
    AgentResponsePayload, AgentResponseRequest, AgentRole, Attachment, AttachmentKind,
    CollaborationContext, ConsensusStatus, ContextInput, CreateMeetingRequest, HealthResponse,
    MeetingConsensus, MeetingScenario, MeetingSnapshot, MeetingState, MeetingType, Message,
    MessageType, Participant, ParticipantStatus, SendMessageRequest, SessionCreatedResponse,
    SuccessResponse,
};
use utoipa::OpenApi;

/// OpenAPI document for the REST face.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Agora",
        description = "Real-time multi-agent collaboration server"
    ),
    paths(
        handlers::meetings::list_active_meetings,
        handlers::meetings::get_meeting,
        handlers::meetings::create_meeting,
        handlers::meetings::send_message,
        handlers::meetings::request_agent_response,
        handlers::meetings::end_meeting,
        handlers::scenarios::list_scenarios,
        handlers::scenarios::start_scenario,
        handlers::agents::list_agents,
        handlers::health::health_check,
    ),
    components(schemas(
        AgentResponsePayload,
        AgentResponseRequest,
        AgentRole,
        Attachment,
        AttachmentKind,
        CollaborationContext,
        ConsensusStatus,
        ContextInput,
        CreateMeetingRequest,
        HealthResponse,
        MeetingConsensus,
        MeetingScenario,
        MeetingSnapshot,
        MeetingState,
        MeetingType,
        Message,
        MessageType,
        Participant,
        ParticipantStatus,
        SendMessageRequest,
        SessionCreatedResponse,
        SuccessResponse,
        TurnFailure,
        UserMessageOutcome,
    )),
    tags(
        (name = "meetings", description = "Meeting lifecycle and turns"),
        (name = "scenarios", description = "Preset meetings"),
        (name = "agents", description = "Participant catalog"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;
