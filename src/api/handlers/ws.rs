//! WebSocket command/event protocol.
//!
//! Clients send commands as `{"type": "<command>", "data": {...}}`:
//! `joinMeeting`, `leaveMeeting`, `startMeeting`, `startScenario`,
//! `sendMessage`, `requestAgentResponse`, `endMeeting`, `getMeetingState`,
//! `getScenarios` and `getActiveMeetings`.
//!
//! The server answers and pushes events as `{"event": "<name>", "data": {...}}`.
//! Meeting events (`meetingStarted`, `agentMessage`, `consensusUpdate`,
//! `meetingEnded`, `error`) are forwarded for every meeting the connection
//! has joined. Starting a meeting joins it automatically.

use crate::{
    api::handlers::{meetings::participant_ids, within_gateway_timeout},
    collaboration::{MeetingEvent, TurnFailure},
    types::{
        AppError, ContextInput, MeetingScenario, MeetingState, MeetingType, Message, Result,
    },
    AppState,
};
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientCommand {
    #[serde(rename_all = "camelCase")]
    JoinMeeting { session_id: String },
    #[serde(rename_all = "camelCase")]
    LeaveMeeting { session_id: String },
    #[serde(rename_all = "camelCase")]
    StartMeeting {
        #[serde(default)]
        topic: Option<String>,
        #[serde(default)]
        participants: Option<Value>,
        #[serde(default)]
        meeting_type: Option<MeetingType>,
        #[serde(default)]
        context: Option<ContextInput>,
    },
    #[serde(rename_all = "camelCase")]
    StartScenario { scenario_index: usize },
    #[serde(rename_all = "camelCase")]
    SendMessage {
        session_id: String,
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        direct_to: Option<Vec<String>>,
    },
    #[serde(rename_all = "camelCase")]
    RequestAgentResponse {
        session_id: String,
        #[serde(default)]
        agent_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    EndMeeting { session_id: String },
    #[serde(rename_all = "camelCase")]
    GetMeetingState { session_id: String },
    GetScenarios,
    GetActiveMeetings,
}

impl ClientCommand {
    pub fn session_id(&self) -> Option<&str> {
        match self {
            ClientCommand::JoinMeeting { session_id }
            | ClientCommand::LeaveMeeting { session_id }
            | ClientCommand::SendMessage { session_id, .. }
            | ClientCommand::RequestAgentResponse { session_id, .. }
            | ClientCommand::EndMeeting { session_id }
            | ClientCommand::GetMeetingState { session_id } => Some(session_id),
            _ => None,
        }
    }
}

/// Direct replies to a command.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    MeetingJoined {
        session_id: String,
        meeting_state: MeetingState,
        history: Vec<Message>,
    },
    #[serde(rename_all = "camelCase")]
    MeetingLeft { session_id: String },
    #[serde(rename_all = "camelCase")]
    MeetingCreated { session_id: String },
    #[serde(rename_all = "camelCase")]
    MessageSent {
        session_id: String,
        message_id: String,
        responses: usize,
        failures: Vec<TurnFailure>,
    },
    #[serde(rename_all = "camelCase")]
    AgentResponse { session_id: String, message: Message },
    #[serde(rename_all = "camelCase")]
    MeetingEnded { session_id: String },
    #[serde(rename_all = "camelCase")]
    MeetingState { meeting_state: MeetingState },
    Scenarios { scenarios: Vec<MeetingScenario> },
    ActiveMeetings { meetings: Vec<MeetingState> },
    #[serde(rename_all = "camelCase")]
    Error {
        session_id: Option<String>,
        message: String,
        cause: String,
    },
}

impl ServerMessage {
    fn from_error(session_id: Option<&str>, error: &AppError) -> Self {
        ServerMessage::Error {
            session_id: session_id.map(str::to_string),
            message: error.to_string(),
            cause: error.cause().to_string(),
        }
    }
}

/// Upgrade to the meeting protocol.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    info!("WebSocket connection established");
    let (mut sink, mut stream) = socket.split();
    let (outbound, mut pending) = mpsc::unbounded_channel::<String>();
    let connection = Connection::new(state.clone(), outbound.clone());

    let writer = tokio::spawn(async move {
        while let Some(text) = pending.recv().await {
            if sink.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let joined = connection.joined();
    let mut events = state.facilitator.subscribe();
    let forwarder = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if !forwards(&joined, &event) {
                        continue;
                    }
                    match serde_json::to_string(&event) {
                        Ok(text) => {
                            if outbound.send(text).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "Failed to encode meeting event"),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "WebSocket observer lagging, events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => connection.handle_text(text.as_str()).await,
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, "WebSocket receive failed");
                break;
            }
        }
    }

    forwarder.abort();
    writer.abort();
    info!("WebSocket connection closed");
}

fn forwards(joined: &Mutex<HashSet<String>>, event: &MeetingEvent) -> bool {
    event
        .session_id()
        .map_or(false, |id| joined.lock().contains(id))
}

/// One client's protocol state: the meetings it has joined and its outbound queue.
pub struct Connection {
    state: AppState,
    joined: Arc<Mutex<HashSet<String>>>,
    outbound: mpsc::UnboundedSender<String>,
}

impl Connection {
    pub fn new(state: AppState, outbound: mpsc::UnboundedSender<String>) -> Self {
        Self {
            state,
            joined: Arc::new(Mutex::new(HashSet::new())),
            outbound,
        }
    }

    pub fn joined(&self) -> Arc<Mutex<HashSet<String>>> {
        Arc::clone(&self.joined)
    }

    pub fn is_joined(&self, session_id: &str) -> bool {
        self.joined.lock().contains(session_id)
    }

    /// Whether a meeting event should be pushed to this client
    pub fn forwards(&self, event: &MeetingEvent) -> bool {
        forwards(&self.joined, event)
    }

    fn send(&self, message: &ServerMessage) {
        match serde_json::to_string(message) {
            Ok(text) => {
                // The writer is gone once the socket closes
                let _ = self.outbound.send(text);
            }
            Err(e) => warn!(error = %e, "Failed to encode reply"),
        }
    }

    /// Parse and run one text frame, replying with an `error` on failure.
    pub async fn handle_text(&self, text: &str) {
        match serde_json::from_str::<ClientCommand>(text) {
            Ok(command) => self.dispatch(command).await,
            Err(e) => {
                let error = AppError::Validation(format!("Invalid command: {}", e));
                self.send(&ServerMessage::from_error(None, &error));
            }
        }
    }

    pub async fn dispatch(&self, command: ClientCommand) {
        let session_id = command.session_id().map(str::to_string);
        if let Err(e) = self.handle(command).await {
            // Joined clients already receive generator failures as meeting events
            let already_published = matches!(
                e,
                AppError::ResponseGeneration { .. } | AppError::Timeout(_)
            ) && session_id.as_deref().map_or(false, |id| self.is_joined(id));
            if !already_published {
                self.send(&ServerMessage::from_error(session_id.as_deref(), &e));
            }
        }
    }

    async fn handle(&self, command: ClientCommand) -> Result<()> {
        let facilitator = &self.state.facilitator;
        match command {
            ClientCommand::JoinMeeting { session_id } => self.join(session_id),
            ClientCommand::LeaveMeeting { session_id } => {
                self.joined.lock().remove(&session_id);
                self.send(&ServerMessage::MeetingLeft { session_id });
                Ok(())
            }
            ClientCommand::StartMeeting {
                topic,
                participants,
                meeting_type,
                context,
            } => {
                let topic = topic.filter(|t| !t.trim().is_empty()).ok_or_else(|| {
                    AppError::Validation("topic and participants array are required".to_string())
                })?;
                let participants = participant_ids(participants)?;
                let session_id = facilitator
                    .start_meeting(
                        &topic,
                        &participants,
                        meeting_type.unwrap_or_default(),
                        context,
                    )
                    .await?;
                self.send(&ServerMessage::MeetingCreated {
                    session_id: session_id.clone(),
                });
                self.join(session_id)
            }
            ClientCommand::StartScenario { scenario_index } => {
                let session_id = facilitator.start_scenario(scenario_index).await?;
                self.send(&ServerMessage::MeetingCreated {
                    session_id: session_id.clone(),
                });
                self.join(session_id)
            }
            ClientCommand::SendMessage {
                session_id,
                content,
                direct_to,
            } => {
                let content = content
                    .filter(|c| !c.trim().is_empty())
                    .ok_or_else(|| AppError::Validation("content is required".to_string()))?;
                let outcome = within_gateway_timeout(
                    &self.state,
                    &session_id,
                    facilitator.add_user_message(
                        &session_id,
                        &content,
                        direct_to.unwrap_or_default(),
                    ),
                )
                .await?;
                self.send(&ServerMessage::MessageSent {
                    session_id,
                    message_id: outcome.message.id,
                    responses: outcome.responses.len(),
                    failures: outcome.failures,
                });
                Ok(())
            }
            ClientCommand::RequestAgentResponse {
                session_id,
                agent_id,
            } => {
                let agent_id = agent_id
                    .filter(|id| !id.trim().is_empty())
                    .ok_or_else(|| AppError::Validation("agentId is required".to_string()))?;
                let message = within_gateway_timeout(
                    &self.state,
                    &session_id,
                    facilitator.request_agent_response(&session_id, &agent_id),
                )
                .await?;
                self.send(&ServerMessage::AgentResponse {
                    session_id,
                    message,
                });
                Ok(())
            }
            ClientCommand::EndMeeting { session_id } => {
                facilitator.end_meeting(&session_id)?;
                if !self.is_joined(&session_id) {
                    self.send(&ServerMessage::MeetingEnded { session_id });
                }
                Ok(())
            }
            ClientCommand::GetMeetingState { session_id } => {
                let meeting_state = facilitator.meeting_state(&session_id)?;
                self.send(&ServerMessage::MeetingState { meeting_state });
                Ok(())
            }
            ClientCommand::GetScenarios => {
                self.send(&ServerMessage::Scenarios {
                    scenarios: facilitator.scenarios(),
                });
                Ok(())
            }
            ClientCommand::GetActiveMeetings => {
                self.send(&ServerMessage::ActiveMeetings {
                    meetings: facilitator.active_meetings(),
                });
                Ok(())
            }
        }
    }

    fn join(&self, session_id: String) -> Result<()> {
        let snapshot = self.state.facilitator.snapshot(&session_id)?;
        self.joined.lock().insert(session_id.clone());
        debug!(session_id = %session_id, "Observer joined meeting");
        self.send(&ServerMessage::MeetingJoined {
            session_id,
            meeting_state: snapshot.meeting_state,
            history: snapshot.history,
        });
        Ok(())
    }
}
