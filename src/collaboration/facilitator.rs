//! Meeting Facilitator
//!
//! Drives meetings on top of the [`CommunicationBus`]: seeds the first turn,
//! asks participants for contributions, relays human input and publishes
//! [`MeetingEvent`]s to observers.
//!
//! Each meeting carries a turn guard. Only one generator call may be in
//! flight per meeting; a second request is rejected with
//! [`AppError::TurnInProgress`] instead of being queued. Generator failures
//! are published as `error` events and never retried here.

use crate::agents::AgentRegistry;
use crate::collaboration::bus::CommunicationBus;
use crate::collaboration::events::MeetingEvent;
use crate::collaboration::scenarios;
use crate::persistence::{NullTranscriptSink, TranscriptSink};
use crate::types::{
    AppError, CollaborationContext, CollaborationSession, ConsensusReport, ConsensusStatus, ContextInput,
    MeetingConsensus, MeetingScenario, MeetingSnapshot, MeetingState, MeetingType, Message,
    MessageType, ParticipantStatus, Result, USER_PARTICIPANT_ID,
};
use crate::utils::toml_config::CollaborationConfig;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

/// Advisory time box applied when the caller gives none.
pub const DEFAULT_TIME_CONSTRAINT_SECS: u64 = 1800;

/// Knobs bound when the facilitator is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacilitatorSettings {
    pub consensus_epsilon: f64,
    pub achieved_threshold: f64,
    pub disagreement_status_threshold: f64,
    pub seed_first_turn: bool,
}

impl Default for FacilitatorSettings {
    fn default() -> Self {
        Self::from(&CollaborationConfig::default())
    }
}

impl From<&CollaborationConfig> for FacilitatorSettings {
    fn from(config: &CollaborationConfig) -> Self {
        Self {
            consensus_epsilon: config.consensus_epsilon,
            achieved_threshold: config.achieved_threshold,
            disagreement_status_threshold: config.disagreement_status_threshold,
            seed_first_turn: config.seed_first_turn,
        }
    }
}

impl FacilitatorSettings {
    pub fn consensus_status(&self, level: f64) -> ConsensusStatus {
        if level > self.achieved_threshold {
            ConsensusStatus::Achieved
        } else if level < self.disagreement_status_threshold {
            ConsensusStatus::Disagreement
        } else {
            ConsensusStatus::Building
        }
    }
}

/// A participant that could not answer during [`MeetingFacilitator::add_user_message`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TurnFailure {
    pub participant_id: String,
    pub error: String,
    pub cause: String,
}

/// Result of relaying a human message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserMessageOutcome {
    pub message: Message,
    pub responses: Vec<Message>,
    pub failures: Vec<TurnFailure>,
}

struct MeetingSlot {
    is_active: bool,
    last_activity: DateTime<Utc>,
    /// Last agreement level published to observers
    published_level: f64,
    turn_guard: Arc<Mutex<()>>,
}

/// Puts a participant back to `Listening` unless its turn reached the history.
struct StatusReset<'a> {
    bus: &'a CommunicationBus,
    session_id: &'a str,
    participant_id: &'a str,
    armed: bool,
}

impl Drop for StatusReset<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // The session may have been released meanwhile
        if self
            .bus
            .set_participant_status(self.session_id, self.participant_id, ParticipantStatus::Listening)
            .is_ok()
        {
            debug!(session_id = %self.session_id, participant = %self.participant_id, "Participant back to listening");
        }
    }
}

pub struct MeetingFacilitator {
    bus: Arc<CommunicationBus>,
    meetings: RwLock<HashMap<String, MeetingSlot>>,
    settings: FacilitatorSettings,
    sink: Arc<dyn TranscriptSink>,
    events: broadcast::Sender<MeetingEvent>,
}

impl MeetingFacilitator {
    pub fn new(
        bus: Arc<CommunicationBus>,
        settings: FacilitatorSettings,
        sink: Arc<dyn TranscriptSink>,
        event_buffer: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        Self {
            bus,
            meetings: RwLock::new(HashMap::new()),
            settings,
            sink,
            events,
        }
    }

    /// Facilitator over a default bus, without transcripts.
    pub fn with_registry(registry: Arc<AgentRegistry>) -> Self {
        Self::new(
            Arc::new(CommunicationBus::with_defaults(registry)),
            FacilitatorSettings::default(),
            Arc::new(NullTranscriptSink),
            256,
        )
    }

    pub fn bus(&self) -> &Arc<CommunicationBus> {
        &self.bus
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        self.bus.registry()
    }

    pub fn settings(&self) -> &FacilitatorSettings {
        &self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MeetingEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: MeetingEvent) {
        let _ = self.events.send(event);
    }

    /// Publish an `error` event for a failure observers should know about.
    pub fn report_error(&self, session_id: Option<&str>, error: &AppError) {
        self.emit(MeetingEvent::Error {
            session_id: session_id.map(str::to_string),
            message: error.to_string(),
            cause: error.cause().to_string(),
        });
    }

    pub fn scenarios(&self) -> Vec<MeetingScenario> {
        scenarios::catalog()
    }

    /// Create and start a meeting, then seed it with one contribution.
    ///
    /// A failing seed turn is reported as an `error` event; the meeting still
    /// starts.
    pub async fn start_meeting(
        &self,
        topic: &str,
        participant_ids: &[String],
        meeting_type: MeetingType,
        context: Option<ContextInput>,
    ) -> Result<String> {
        let context = with_defaults(topic.trim(), context.unwrap_or_default());
        let session_id =
            self.bus
                .create_session(topic, participant_ids, meeting_type, Some(context))?;
        self.bus.start_session(&session_id)?;

        let session = self.bus.session(&session_id)?;
        let guard = Arc::new(Mutex::new(()));
        let seed_turn = Arc::clone(&guard).try_lock_owned().ok();
        self.meetings.write().insert(
            session_id.clone(),
            MeetingSlot {
                is_active: true,
                last_activity: Utc::now(),
                published_level: session.conversation_state.agreement_level,
                turn_guard: Arc::clone(&guard),
            },
        );

        for message in self.bus.history(&session_id)? {
            if let Err(e) = self.sink.record(&session_id, &message).await {
                warn!(session_id = %session_id, sink = self.sink.name(), error = %e, "Failed to record transcript");
            }
        }

        info!(session_id = %session_id, topic = %session.context.topic, "Meeting started");
        self.emit(MeetingEvent::MeetingStarted {
            session_id: session_id.clone(),
            topic: session.context.topic.clone(),
            participants: session.participant_ids(),
            meeting_type,
        });

        if self.settings.seed_first_turn {
            if let Some(first) = self.seed_speaker(&session_id)? {
                if let Err(e) = self.take_turn(&session_id, &first).await {
                    debug!(session_id = %session_id, error = %e, "Seed turn failed");
                }
            }
        }

        drop(seed_turn);
        Ok(session_id)
    }

    /// Start the catalog scenario at `index` as a problem-solving meeting.
    pub async fn start_scenario(&self, index: usize) -> Result<String> {
        let scenario = scenarios::get(index)
            .ok_or_else(|| AppError::Validation(format!("Unknown scenario index: {}", index)))?;
        info!(scenario = %scenario.title, "Starting scenario");
        self.start_meeting(
            &scenario.context.topic,
            &scenario.expected_participants,
            MeetingType::ProblemSolving,
            Some(scenario.context.clone().into()),
        )
        .await
    }

    fn seed_speaker(&self, session_id: &str) -> Result<Option<String>> {
        if let Some(participant) = self.bus.determine_next_speaker(session_id)? {
            return Ok(Some(participant.id));
        }

        let session = self.bus.session(session_id)?;
        let mut best: Option<(String, f64)> = None;
        for participant in &session.participants {
            if let Some(agent) = self.registry().get_agent(&participant.id) {
                let relevance = agent.analyze_expertise(&session.context.topic).relevance;
                if best.as_ref().map_or(true, |(_, r)| relevance > *r) {
                    best = Some((participant.id.clone(), relevance));
                }
            }
        }
        Ok(best.map(|(id, _)| id))
    }

    fn acquire_turn(&self, session_id: &str) -> Result<OwnedMutexGuard<()>> {
        let guard = {
            let meetings = self.meetings.read();
            let slot = meetings
                .get(session_id)
                .ok_or_else(|| AppError::SessionNotFound(session_id.to_string()))?;
            if !slot.is_active {
                return Err(AppError::MeetingInactive(session_id.to_string()));
            }
            Arc::clone(&slot.turn_guard)
        };
        guard
            .try_lock_owned()
            .map_err(|_| AppError::TurnInProgress(session_id.to_string()))
    }

    /// Ask one participant for its next contribution and broadcast it.
    pub async fn request_agent_response(
        &self,
        session_id: &str,
        participant_id: &str,
    ) -> Result<Message> {
        let _turn = self.acquire_turn(session_id)?;
        self.take_turn(session_id, participant_id).await
    }

    /// Relay a human message, then collect responses.
    ///
    /// With `direct_to` each named participant answers in order; otherwise the
    /// turn policy picks at most one responder. Individual failures are
    /// collected in the outcome rather than aborting the remaining turns.
    pub async fn add_user_message(
        &self,
        session_id: &str,
        text: &str,
        direct_to: Vec<String>,
    ) -> Result<UserMessageOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("content is required".to_string()));
        }
        let _turn = self.acquire_turn(session_id)?;

        let session = self.bus.session(session_id)?;
        if let Some(unknown) = direct_to.iter().find(|id| session.participant(id).is_none()) {
            return Err(AppError::UnknownParticipant(unknown.clone()));
        }

        let message = Message::new(USER_PARTICIPANT_ID, MessageType::Question, text)
            .addressed_to(direct_to.clone())
            .referencing(direct_to.clone());
        let report = self.bus.broadcast_message(session_id, message.clone())?;
        self.after_append(session_id, &message, &report).await;

        let responders = if direct_to.is_empty() {
            self.bus
                .determine_next_speaker(session_id)?
                .map(|p| vec![p.id])
                .unwrap_or_default()
        } else {
            direct_to
        };

        let mut responses = Vec::new();
        let mut failures = Vec::new();
        for participant_id in responders {
            match self.take_turn(session_id, &participant_id).await {
                Ok(reply) => responses.push(reply),
                Err(e @ (AppError::SessionClosed(_) | AppError::MeetingInactive(_))) => {
                    return Err(e)
                }
                Err(e) => failures.push(TurnFailure {
                    participant_id,
                    error: e.to_string(),
                    cause: e.cause().to_string(),
                }),
            }
        }

        Ok(UserMessageOutcome {
            message,
            responses,
            failures,
        })
    }

    /// One generator call plus broadcast. The caller holds the turn guard.
    async fn take_turn(&self, session_id: &str, participant_id: &str) -> Result<Message> {
        let (session, history) = self.bus.snapshot(session_id)?;
        if session.participant(participant_id).is_none() {
            return Err(AppError::UnknownParticipant(participant_id.to_string()));
        }
        let agent = self
            .registry()
            .get_agent(participant_id)
            .ok_or_else(|| AppError::UnknownParticipant(participant_id.to_string()))?;

        self.bus
            .set_participant_status(session_id, participant_id, ParticipantStatus::Processing)?;
        // Also fires when the caller drops this future, e.g. on a gateway timeout
        let mut reset = StatusReset {
            bus: &self.bus,
            session_id,
            participant_id,
            armed: true,
        };
        debug!(session_id = %session_id, participant = %participant_id, "Requesting contribution");

        let generated = agent
            .generate_response(&session.context, &history)
            .await
            .and_then(|message| check_reply(participant_id, message));

        let message = match generated {
            Ok(message) => message,
            Err(e) => {
                let e = as_generation_error(participant_id, e);
                warn!(session_id = %session_id, participant = %participant_id, error = %e, "Response generation failed");
                self.report_error(Some(session_id), &e);
                return Err(e);
            }
        };

        self.bus
            .set_participant_status(session_id, participant_id, ParticipantStatus::Responding)?;
        let report = self.bus.broadcast_message(session_id, message.clone())?;
        // the append moved the author to Active
        reset.armed = false;
        self.after_append(session_id, &message, &report).await;
        Ok(message)
    }

    async fn after_append(&self, session_id: &str, message: &Message, report: &ConsensusReport) {
        if let Err(e) = self.sink.record(session_id, message).await {
            warn!(session_id = %session_id, sink = self.sink.name(), error = %e, "Failed to record transcript");
        }

        let publish = {
            let mut meetings = self.meetings.write();
            match meetings.get_mut(session_id) {
                Some(slot) => {
                    slot.last_activity = Utc::now();
                    let changed = (report.agreement_level - slot.published_level).abs()
                        > self.settings.consensus_epsilon;
                    if changed {
                        slot.published_level = report.agreement_level;
                    }
                    changed
                }
                None => false,
            }
        };

        self.emit(MeetingEvent::AgentMessage {
            session_id: session_id.to_string(),
            agent: message.from.clone(),
            message: message.clone(),
            timestamp: message.timestamp,
        });
        if publish {
            debug!(session_id = %session_id, agreement = report.agreement_level, "Consensus changed");
            self.emit(MeetingEvent::ConsensusUpdate {
                session_id: session_id.to_string(),
                consensus: report.clone(),
            });
        }
    }

    /// End a meeting. Ending it again is a no-op.
    pub fn end_meeting(&self, session_id: &str) -> Result<()> {
        {
            let mut meetings = self.meetings.write();
            let slot = meetings
                .get_mut(session_id)
                .ok_or_else(|| AppError::SessionNotFound(session_id.to_string()))?;
            if !slot.is_active {
                return Ok(());
            }
            slot.is_active = false;
            slot.last_activity = Utc::now();
        }

        self.bus.end_session(session_id)?;
        info!(session_id = %session_id, "Meeting ended");
        self.emit(MeetingEvent::MeetingEnded {
            session_id: session_id.to_string(),
        });
        Ok(())
    }

    /// Forget an ended meeting: its slot, session and history.
    ///
    /// Returns whether anything was removed; active meetings are kept.
    pub fn release_meeting(&self, session_id: &str) -> Result<bool> {
        let active = self
            .meetings
            .read()
            .get(session_id)
            .map(|slot| slot.is_active)
            .ok_or_else(|| AppError::SessionNotFound(session_id.to_string()))?;
        if active {
            return Ok(false);
        }

        let released = match self.bus.release_session(session_id) {
            Ok(released) => released,
            // already dropped from the bus
            Err(AppError::SessionNotFound(_)) => true,
            Err(e) => return Err(e),
        };
        if released {
            self.meetings.write().remove(session_id);
            info!(session_id = %session_id, "Meeting released");
        }
        Ok(released)
    }

    /// Release every meeting that ended at least `retention` ago.
    ///
    /// Returns the number of meetings removed.
    pub fn release_ended(&self, retention: Duration) -> usize {
        let cutoff = match chrono::Duration::from_std(retention)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
        {
            Some(cutoff) => cutoff,
            None => return 0,
        };

        let expired: Vec<String> = self
            .meetings
            .read()
            .iter()
            .filter(|(_, slot)| !slot.is_active && slot.last_activity <= cutoff)
            .map(|(id, _)| id.clone())
            .collect();

        expired
            .iter()
            .filter(|id| match self.release_meeting(id) {
                Ok(released) => released,
                Err(e) => {
                    warn!(session_id = %id, error = %e, "Failed to release meeting");
                    false
                }
            })
            .count()
    }

    /// Start a background task that periodically releases ended meetings.
    ///
    /// `retention` is consulted on every tick so configuration reloads apply.
    pub fn start_release_task<F>(self: &Arc<Self>, every: Duration, retention: F) -> JoinHandle<()>
    where
        F: Fn() -> Duration + Send + 'static,
    {
        let facilitator = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(every);
            loop {
                interval_timer.tick().await;
                let released = facilitator.release_ended(retention());
                if released > 0 {
                    debug!(released, "Released ended meetings");
                }
            }
        })
    }

    pub fn meeting_state(&self, session_id: &str) -> Result<MeetingState> {
        let session = self.bus.session(session_id)?;
        self.state_for(session)
    }

    /// Meeting state and full history, as sent to a joining observer.
    pub fn snapshot(&self, session_id: &str) -> Result<MeetingSnapshot> {
        let (session, history) = self.bus.snapshot(session_id)?;
        Ok(MeetingSnapshot {
            meeting_state: self.state_for(session)?,
            history,
        })
    }

    fn state_for(&self, session: CollaborationSession) -> Result<MeetingState> {
        let meetings = self.meetings.read();
        let slot = meetings
            .get(&session.session_id)
            .ok_or_else(|| AppError::SessionNotFound(session.session_id.clone()))?;
        let level = session.conversation_state.agreement_level;

        Ok(MeetingState {
            participants: session.participant_ids(),
            topic: session.context.topic,
            meeting_type: session.meeting_type,
            is_active: slot.is_active,
            current_speaker: session.conversation_state.current_speaker_id,
            message_count: session.conversation_state.message_count,
            start_time: session.start_time,
            last_activity: slot.last_activity,
            consensus: MeetingConsensus {
                level,
                status: self.settings.consensus_status(level),
            },
            session_id: session.session_id,
        })
    }

    /// Active meetings, oldest first.
    pub fn active_meetings(&self) -> Vec<MeetingState> {
        let ids: Vec<String> = self
            .meetings
            .read()
            .iter()
            .filter(|(_, slot)| slot.is_active)
            .map(|(id, _)| id.clone())
            .collect();

        let mut states: Vec<MeetingState> = ids
            .iter()
            .filter_map(|id| self.meeting_state(id).ok())
            .collect();
        states.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        states
    }

    pub fn active_meeting_count(&self) -> usize {
        self.meetings
            .read()
            .values()
            .filter(|slot| slot.is_active)
            .count()
    }
}

/// Fill unspecified context fields with the live-meeting defaults.
pub fn with_defaults(topic: &str, input: ContextInput) -> CollaborationContext {
    CollaborationContext {
        topic: topic.to_string(),
        background_info: input
            .background_info
            .unwrap_or_else(|| format!("Live meeting on: {}", topic)),
        objectives: input.objectives.unwrap_or_else(|| {
            vec![
                format!("Collaborate on {}", topic),
                "Reach consensus on approach".to_string(),
                "Define next steps".to_string(),
            ]
        }),
        constraints: input.constraints.unwrap_or_else(|| {
            vec![
                "Real-time discussion".to_string(),
                "All participants contribute".to_string(),
            ]
        }),
        domain_considerations: input.domain_considerations.unwrap_or_default(),
        time_constraint_seconds: Some(
            input
                .time_constraint_seconds
                .unwrap_or(DEFAULT_TIME_CONSTRAINT_SECS),
        ),
    }
}

fn check_reply(participant_id: &str, message: Message) -> Result<Message> {
    if message.from != participant_id {
        return Err(AppError::ResponseGeneration {
            participant_id: participant_id.to_string(),
            cause: format!("reply authored by '{}'", message.from),
        });
    }
    if message.content.trim().is_empty() {
        return Err(AppError::ResponseGeneration {
            participant_id: participant_id.to_string(),
            cause: "empty reply".to_string(),
        });
    }
    if !message.scores_in_range() {
        return Err(AppError::ResponseGeneration {
            participant_id: participant_id.to_string(),
            cause: "scores outside [0, 1]".to_string(),
        });
    }
    Ok(message)
}

fn as_generation_error(participant_id: &str, error: AppError) -> AppError {
    match error {
        e @ AppError::ResponseGeneration { .. } => e,
        other => AppError::ResponseGeneration {
            participant_id: participant_id.to_string(),
            cause: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConversationStatus;

    fn facilitator() -> MeetingFacilitator {
        MeetingFacilitator::with_registry(Arc::new(AgentRegistry::with_default_roles()))
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_context_defaults() {
        let context = with_defaults("Roadmap", ContextInput::default());
        assert_eq!(context.background_info, "Live meeting on: Roadmap");
        assert_eq!(context.objectives[0], "Collaborate on Roadmap");
        assert_eq!(context.constraints.len(), 2);
        assert_eq!(context.time_constraint_seconds, Some(1800));

        let context = with_defaults(
            "Roadmap",
            ContextInput {
                objectives: Some(vec!["Ship".into()]),
                ..Default::default()
            },
        );
        assert_eq!(context.objectives, vec!["Ship".to_string()]);
    }

    #[test]
    fn test_consensus_status_bands() {
        let settings = FacilitatorSettings::default();
        assert_eq!(settings.consensus_status(0.9), ConsensusStatus::Achieved);
        assert_eq!(settings.consensus_status(0.8), ConsensusStatus::Building);
        assert_eq!(settings.consensus_status(0.5), ConsensusStatus::Building);
        assert_eq!(settings.consensus_status(0.3), ConsensusStatus::Disagreement);
    }

    #[tokio::test]
    async fn test_start_meeting_seeds_first_turn() {
        let facilitator = facilitator();
        let id = facilitator
            .start_meeting(
                "API integration plan",
                &ids(&["architect", "engineer"]),
                MeetingType::Brainstorm,
                None,
            )
            .await
            .unwrap();

        let snapshot = facilitator.snapshot(&id).unwrap();
        assert_eq!(snapshot.history.len(), 2);
        assert_eq!(snapshot.history[1].from, "engineer");
        assert!(snapshot.meeting_state.is_active);
        assert_eq!(snapshot.meeting_state.message_count, 2);
        assert_eq!(snapshot.meeting_state.current_speaker.as_deref(), Some("engineer"));
    }

    #[tokio::test]
    async fn test_request_response_after_end_is_inactive() {
        let facilitator = facilitator();
        let id = facilitator
            .start_meeting("t", &ids(&["architect"]), MeetingType::Brainstorm, None)
            .await
            .unwrap();
        facilitator.end_meeting(&id).unwrap();
        facilitator.end_meeting(&id).unwrap();

        let err = facilitator
            .request_agent_response(&id, "architect")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MeetingInactive(_)));
        let err = facilitator
            .add_user_message(&id, "hello", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MeetingInactive(_)));
        assert_eq!(
            facilitator.bus().session(&id).unwrap().conversation_state.status,
            ConversationStatus::Completed
        );
        assert_eq!(facilitator.active_meeting_count(), 0);
    }

    #[tokio::test]
    async fn test_directed_user_message_gets_answers_in_order() {
        let facilitator = facilitator();
        let id = facilitator
            .start_meeting(
                "t",
                &ids(&["architect", "analyst", "strategist"]),
                MeetingType::DesignReview,
                None,
            )
            .await
            .unwrap();
        let before = facilitator.meeting_state(&id).unwrap().message_count;

        let outcome = facilitator
            .add_user_message(&id, "Thoughts?", ids(&["strategist", "analyst"]))
            .await
            .unwrap();
        let authors: Vec<&str> = outcome.responses.iter().map(|m| m.from.as_str()).collect();
        assert_eq!(authors, vec!["strategist", "analyst"]);
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.message.to, Some(ids(&["strategist", "analyst"])));
        assert_eq!(facilitator.meeting_state(&id).unwrap().message_count, before + 3);
    }

    #[tokio::test]
    async fn test_user_message_validation() {
        let facilitator = facilitator();
        let id = facilitator
            .start_meeting("t", &ids(&["architect"]), MeetingType::Brainstorm, None)
            .await
            .unwrap();
        assert!(matches!(
            facilitator.add_user_message(&id, "   ", vec![]).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            facilitator
                .add_user_message(&id, "hi", ids(&["engineer"]))
                .await,
            Err(AppError::UnknownParticipant(_))
        ));
    }

    #[tokio::test]
    async fn test_start_scenario() {
        let facilitator = facilitator();
        let id = facilitator.start_scenario(0).await.unwrap();
        let state = facilitator.meeting_state(&id).unwrap();
        assert_eq!(state.meeting_type, MeetingType::ProblemSolving);
        assert_eq!(state.participants.len(), 4);
        assert!(matches!(
            facilitator.start_scenario(9).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_events_for_a_turn() {
        let facilitator = MeetingFacilitator::new(
            Arc::new(CommunicationBus::with_defaults(Arc::new(
                AgentRegistry::with_default_roles(),
            ))),
            FacilitatorSettings {
                seed_first_turn: false,
                ..Default::default()
            },
            Arc::new(NullTranscriptSink),
            16,
        );
        let mut rx = facilitator.subscribe();
        let id = facilitator
            .start_meeting("t", &ids(&["architect"]), MeetingType::Brainstorm, None)
            .await
            .unwrap();
        assert_eq!(facilitator.meeting_state(&id).unwrap().message_count, 1);
        assert_eq!(rx.recv().await.unwrap().name(), "meetingStarted");

        facilitator.request_agent_response(&id, "architect").await.unwrap();
        match rx.recv().await.unwrap() {
            MeetingEvent::AgentMessage { agent, session_id, .. } => {
                assert_eq!(agent, "architect");
                assert_eq!(session_id, id);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_release_task_drops_ended_meetings() {
        let facilitator = Arc::new(facilitator());
        let kept = facilitator
            .start_meeting("kept", &ids(&["engineer"]), MeetingType::Brainstorm, None)
            .await
            .unwrap();
        let ended = facilitator
            .start_meeting("ended", &ids(&["analyst"]), MeetingType::Brainstorm, None)
            .await
            .unwrap();
        facilitator.end_meeting(&ended).unwrap();
        assert_eq!(facilitator.bus().session_count(), 2);

        let task = facilitator.start_release_task(Duration::from_millis(10), || Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(100)).await;
        task.abort();

        assert_eq!(facilitator.bus().session_count(), 1);
        assert!(facilitator.bus().contains(&kept));
        assert!(matches!(
            facilitator.snapshot(&ended),
            Err(AppError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_release_after_bus_dropped_session() {
        let facilitator = facilitator();
        let id = facilitator
            .start_meeting("t", &ids(&["engineer"]), MeetingType::Brainstorm, None)
            .await
            .unwrap();
        facilitator.end_meeting(&id).unwrap();
        assert!(facilitator.bus().release_session(&id).unwrap());

        assert!(facilitator.release_meeting(&id).unwrap());
        assert_eq!(facilitator.active_meeting_count(), 0);
        assert!(facilitator.meetings.read().is_empty());
    }
}
