//! Domain events published by the bus and the facilitator.

use crate::types::{ConsensusReport, MeetingType, Message};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Low-level session lifecycle events emitted by the communication bus.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    SessionCreated { session_id: String },
    SessionStarted { session_id: String },
    MessageReceived { session_id: String, message: Message },
    SessionEnded { session_id: String },
}

impl BusEvent {
    pub fn session_id(&self) -> &str {
        match self {
            BusEvent::SessionCreated { session_id }
            | BusEvent::SessionStarted { session_id }
            | BusEvent::MessageReceived { session_id, .. }
            | BusEvent::SessionEnded { session_id } => session_id,
        }
    }
}

/// Events pushed to meeting observers.
///
/// Serialized as `{"event": "<name>", "data": {...}}`, which is also the
/// frame format of the WebSocket gateway.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum MeetingEvent {
    #[serde(rename_all = "camelCase")]
    MeetingStarted {
        session_id: String,
        topic: String,
        participants: Vec<String>,
        meeting_type: MeetingType,
    },
    #[serde(rename_all = "camelCase")]
    AgentMessage {
        session_id: String,
        agent: String,
        message: Message,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    ConsensusUpdate {
        session_id: String,
        consensus: ConsensusReport,
    },
    #[serde(rename_all = "camelCase")]
    MeetingEnded { session_id: String },
    #[serde(rename_all = "camelCase")]
    Error {
        session_id: Option<String>,
        message: String,
        cause: String,
    },
}

impl MeetingEvent {
    pub fn session_id(&self) -> Option<&str> {
        match self {
            MeetingEvent::MeetingStarted { session_id, .. }
            | MeetingEvent::AgentMessage { session_id, .. }
            | MeetingEvent::ConsensusUpdate { session_id, .. }
            | MeetingEvent::MeetingEnded { session_id } => Some(session_id),
            MeetingEvent::Error { session_id, .. } => session_id.as_deref(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MeetingEvent::MeetingStarted { .. } => "meetingStarted",
            MeetingEvent::AgentMessage { .. } => "agentMessage",
            MeetingEvent::ConsensusUpdate { .. } => "consensusUpdate",
            MeetingEvent::MeetingEnded { .. } => "meetingEnded",
            MeetingEvent::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meeting_event_wire_format() {
        let event = MeetingEvent::Error {
            session_id: Some("session_1".into()),
            message: "boom".into(),
            cause: "response_generation".into(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "error");
        assert_eq!(value["data"]["sessionId"], "session_1");
        assert_eq!(value["data"]["cause"], "response_generation");
        assert_eq!(event.name(), "error");
    }

    #[test]
    fn test_meeting_ended_session_id() {
        let event = MeetingEvent::MeetingEnded {
            session_id: "s".into(),
        };
        assert_eq!(event.session_id(), Some("s"));
        assert_eq!(serde_json::to_value(&event).unwrap()["event"], "meetingEnded");
    }
}
