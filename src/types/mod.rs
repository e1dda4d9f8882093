use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Author id used for the context briefing appended when a session starts.
pub const SYSTEM_PARTICIPANT_ID: &str = "system";

/// Author id used for messages typed by a human operator.
pub const USER_PARTICIPANT_ID: &str = "user";

// ============= Participant Types =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    Active,
    Listening,
    Processing,
    Responding,
}

/// Static description of what a participant is good at and how it talks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentRole {
    pub name: String,
    pub specializations: Vec<String>,
    pub communication_style: String,
    pub primary_focus: String,
}

/// Catalog entry for one participant.
///
/// Everything except `status` is fixed once the participant is registered.
/// Sessions hold their own copy, so status changes in one session never leak
/// into another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub role: AgentRole,
    pub status: ParticipantStatus,
    pub expertise_tags: Vec<String>,
    /// Extra topic keywords that make this participant a natural next speaker
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affinity_keywords: Vec<String>,
}

impl Participant {
    /// Lowercased keywords matched against a session topic.
    ///
    /// Combines the explicit affinity keywords with the role specializations,
    /// where `snake_case` specializations are turned into plain words.
    pub fn affinity_terms(&self) -> Vec<String> {
        self.affinity_keywords
            .iter()
            .chain(self.role.specializations.iter())
            .map(|term| term.replace('_', " ").to_lowercase())
            .filter(|term| !term.trim().is_empty())
            .collect()
    }
}

// ============= Message Types =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Question,
    Suggestion,
    Analysis,
    Clarification,
    Decision,
    CollaborationRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    StatisticalAnalysis,
    ArchitectureDiagram,
    DomainAssessment,
    BusinessMetrics,
}

/// Structured payload riding along with a message. Opaque to the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
}

/// One contribution to a session. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(rename = "fromParticipantId")]
    pub from: String,
    /// Restricts delivery/visibility to these participants
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<String>>,
    pub timestamp: DateTime<Utc>,
    pub message_type: MessageType,
    pub content: String,
    /// Participants the content addresses; biases who speaks next
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_participants: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cultural_validation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
}

impl Message {
    /// Create a message with a fresh id and the current timestamp.
    pub fn new(from: impl Into<String>, message_type: MessageType, content: impl Into<String>) -> Self {
        Self {
            id: format!("msg_{}", Uuid::new_v4().simple()),
            from: from.into(),
            to: None,
            timestamp: Utc::now(),
            message_type,
            content: content.into(),
            referenced_participants: None,
            attachments: None,
            cultural_validation: None,
            confidence_score: None,
        }
    }

    /// Restrict delivery to the given participants. Empty lists are ignored.
    pub fn addressed_to(mut self, recipients: Vec<String>) -> Self {
        if !recipients.is_empty() {
            self.to = Some(recipients);
        }
        self
    }

    /// Name the participants this message speaks to. Empty lists are ignored.
    pub fn referencing(mut self, participants: Vec<String>) -> Self {
        if !participants.is_empty() {
            self.referenced_participants = Some(participants);
        }
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.get_or_insert_with(Vec::new).push(attachment);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence_score = Some(confidence);
        self
    }

    /// Whether every score carried by the message lies in `[0, 1]`.
    pub fn scores_in_range(&self) -> bool {
        [self.confidence_score, self.cultural_validation]
            .into_iter()
            .flatten()
            .all(|score| (0.0..=1.0).contains(&score))
    }
}

// ============= Session Types =============

/// Read-only framing of a session, fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollaborationContext {
    pub topic: String,
    pub background_info: String,
    pub objectives: Vec<String>,
    pub constraints: Vec<String>,
    pub domain_considerations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_constraint_seconds: Option<u64>,
}

/// Caller-supplied context; missing fields are filled in by whoever creates
/// the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContextInput {
    #[serde(default)]
    pub background_info: Option<String>,
    #[serde(default)]
    pub objectives: Option<Vec<String>>,
    #[serde(default)]
    pub constraints: Option<Vec<String>>,
    #[serde(default)]
    pub domain_considerations: Option<Vec<String>>,
    #[serde(default)]
    pub time_constraint_seconds: Option<u64>,
}

impl ContextInput {
    /// Resolve into a full context, leaving unspecified fields empty.
    pub fn into_context(self, topic: &str) -> CollaborationContext {
        CollaborationContext {
            topic: topic.to_string(),
            background_info: self.background_info.unwrap_or_default(),
            objectives: self.objectives.unwrap_or_default(),
            constraints: self.constraints.unwrap_or_default(),
            domain_considerations: self.domain_considerations.unwrap_or_default(),
            time_constraint_seconds: self.time_constraint_seconds,
        }
    }
}

impl From<CollaborationContext> for ContextInput {
    fn from(context: CollaborationContext) -> Self {
        Self {
            background_info: Some(context.background_info),
            objectives: Some(context.objectives),
            constraints: Some(context.constraints),
            domain_considerations: Some(context.domain_considerations),
            time_constraint_seconds: context.time_constraint_seconds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Initializing,
    Active,
    Paused,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    pub status: ConversationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_speaker_id: Option<String>,
    pub message_count: usize,
    pub agreement_level: f64,
    pub convergence_points: Vec<String>,
    pub remaining_disagreements: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MeetingType {
    #[default]
    Brainstorm,
    ProblemSolving,
    DesignReview,
    DecisionMaking,
}

impl MeetingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingType::Brainstorm => "brainstorm",
            MeetingType::ProblemSolving => "problem_solving",
            MeetingType::DesignReview => "design_review",
            MeetingType::DecisionMaking => "decision_making",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollaborationSession {
    pub session_id: String,
    pub participants: Vec<Participant>,
    pub context: CollaborationContext,
    pub conversation_state: ConversationState,
    pub meeting_type: MeetingType,
    pub moderator: String,
    pub start_time: DateTime<Utc>,
}

impl CollaborationSession {
    pub fn participant(&self, participant_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == participant_id)
    }

    pub fn participant_ids(&self) -> Vec<String> {
        self.participants.iter().map(|p| p.id.clone()).collect()
    }
}

// ============= Consensus & Capability Types =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusReport {
    pub agreement_level: f64,
    pub convergence_points: Vec<String>,
    pub remaining_disagreements: Vec<String>,
    pub next_steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentFeedback {
    pub agreement: f64,
    pub concerns: Vec<String>,
    pub suggestions: Vec<String>,
    pub next_steps: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RecommendedRole {
    Lead,
    Contributor,
    Validator,
    Observer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpertiseAssessment {
    pub relevance: f64,
    pub confidence: f64,
    pub recommended_role: RecommendedRole,
}

// ============= Meeting Types =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConsensusStatus {
    Building,
    Achieved,
    Disagreement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeetingConsensus {
    pub level: f64,
    pub status: ConsensusStatus,
}

/// Operational view of a meeting, layered over the session's conversation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeetingState {
    pub session_id: String,
    pub topic: String,
    pub meeting_type: MeetingType,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_speaker: Option<String>,
    pub participants: Vec<String>,
    pub message_count: usize,
    pub start_time: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub consensus: MeetingConsensus,
}

/// Meeting state together with its full history, as returned on join/fetch.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeetingSnapshot {
    pub meeting_state: MeetingState,
    pub history: Vec<Message>,
}

/// Preset meeting that can be started by index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeetingScenario {
    pub title: String,
    pub description: String,
    pub context: CollaborationContext,
    pub expected_participants: Vec<String>,
    pub estimated_duration_minutes: u32,
}

// ============= API Request/Response Types =============

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeetingRequest {
    #[serde(default)]
    pub topic: Option<String>,
    /// Must be an array of participant ids
    #[serde(default)]
    #[schema(value_type = Option<Vec<String>>)]
    pub participants: Option<serde_json::Value>,
    #[serde(default)]
    pub meeting_type: Option<MeetingType>,
    #[serde(default)]
    pub context: Option<ContextInput>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub direct_to: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponseRequest {
    #[serde(default)]
    pub agent_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreatedResponse {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponsePayload {
    pub success: bool,
    pub message: Message,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub active_meeting_count: usize,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unknown participant: {0}")]
    UnknownParticipant(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session {0} is closed")]
    SessionClosed(String),

    #[error("Meeting {0} is not active")]
    MeetingInactive(String),

    #[error("Response generation failed for '{participant_id}': {cause}")]
    ResponseGeneration {
        participant_id: String,
        cause: String,
    },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("A turn is already in progress for session {0}")]
    TurnInProgress(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Short stable tag describing the failure class, used in `error` events
    /// and response bodies.
    pub fn cause(&self) -> &'static str {
        match self {
            AppError::UnknownParticipant(_) => "unknown_participant",
            AppError::SessionNotFound(_) => "session_not_found",
            AppError::SessionClosed(_) => "session_closed",
            AppError::MeetingInactive(_) => "meeting_inactive",
            AppError::ResponseGeneration { .. } => "response_generation",
            AppError::Validation(_) => "validation",
            AppError::TurnInProgress(_) => "turn_in_progress",
            AppError::Timeout(_) => "timeout",
            AppError::Configuration(_) => "configuration",
            AppError::LLM(_) => "llm",
            AppError::Internal(_) => "internal",
        }
    }

    /// Only generator failures are worth retrying, and only by the caller.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::ResponseGeneration { .. } | AppError::Timeout(_) | AppError::LLM(_)
        )
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match self {
            AppError::UnknownParticipant(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::SessionClosed(_)
            | AppError::MeetingInactive(_)
            | AppError::TurnInProgress(_) => StatusCode::CONFLICT,
            AppError::ResponseGeneration { .. } | AppError::LLM(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Configuration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "cause": self.cause(),
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
