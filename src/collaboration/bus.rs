//! Communication Bus
//!
//! Owns session lifecycle and is the single mutation point for session
//! history. Every transition is synchronous and holds only the lock of the
//! session it touches, so different sessions never contend.

use crate::agents::prompting::briefing;
use crate::agents::AgentRegistry;
use crate::collaboration::consensus::{ConsensusEvaluator, LexicalConsensusEvaluator};
use crate::collaboration::events::BusEvent;
use crate::collaboration::store::{SessionHandle, SessionRecord, SessionStore};
use crate::collaboration::turn::TurnPolicy;
use crate::types::{
    AppError, CollaborationContext, CollaborationSession, ConsensusReport, ConversationState,
    ConversationStatus, MeetingType, Message, MessageType, Participant, ParticipantStatus, Result,
    SYSTEM_PARTICIPANT_ID, USER_PARTICIPANT_ID,
};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

const DEFAULT_EVENT_BUFFER: usize = 256;

pub struct CommunicationBus {
    registry: Arc<AgentRegistry>,
    store: SessionStore,
    evaluator: Arc<dyn ConsensusEvaluator>,
    policy: TurnPolicy,
    events: broadcast::Sender<BusEvent>,
}

impl CommunicationBus {
    pub fn new(
        registry: Arc<AgentRegistry>,
        evaluator: Arc<dyn ConsensusEvaluator>,
        policy: TurnPolicy,
        event_buffer: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        Self {
            registry,
            store: SessionStore::new(),
            evaluator,
            policy,
            events,
        }
    }

    /// Bus with the lexical evaluator at its stock thresholds and the
    /// engineer as the coordination role.
    pub fn with_defaults(registry: Arc<AgentRegistry>) -> Self {
        Self::new(
            registry,
            Arc::new(LexicalConsensusEvaluator::default()),
            TurnPolicy::new(Some("engineer".to_string())),
            DEFAULT_EVENT_BUFFER,
        )
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn policy(&self) -> &TurnPolicy {
        &self.policy
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: BusEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }

    fn handle(&self, session_id: &str) -> Result<SessionHandle> {
        self.store
            .get(session_id)
            .ok_or_else(|| AppError::SessionNotFound(session_id.to_string()))
    }

    /// Allocate a session with an empty history.
    ///
    /// Duplicate ids in `participant_ids` collapse to their first occurrence.
    /// Topics are not required to be unique.
    pub fn create_session(
        &self,
        topic: &str,
        participant_ids: &[String],
        meeting_type: MeetingType,
        context: Option<CollaborationContext>,
    ) -> Result<String> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(AppError::Validation("topic must not be empty".to_string()));
        }
        if participant_ids.is_empty() {
            return Err(AppError::Validation(
                "at least one participant is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let unique: Vec<String> = participant_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();

        let mut participants = self.registry.resolve(&unique)?;
        for participant in &mut participants {
            participant.status = ParticipantStatus::Listening;
        }

        let mut context = context.unwrap_or_else(|| CollaborationContext {
            topic: topic.to_string(),
            background_info: String::new(),
            objectives: Vec::new(),
            constraints: Vec::new(),
            domain_considerations: Vec::new(),
            time_constraint_seconds: None,
        });
        context.topic = topic.to_string();

        let session_id = format!("session_{}", Uuid::new_v4().simple());
        let session = CollaborationSession {
            session_id: session_id.clone(),
            participants,
            context,
            conversation_state: ConversationState {
                status: ConversationStatus::Initializing,
                current_speaker_id: None,
                message_count: 0,
                agreement_level: self.evaluator.evaluate(&[]).agreement_level,
                convergence_points: Vec::new(),
                remaining_disagreements: Vec::new(),
            },
            meeting_type,
            moderator: USER_PARTICIPANT_ID.to_string(),
            start_time: Utc::now(),
        };

        self.store.insert(SessionRecord::new(session));
        info!(session_id = %session_id, topic = %topic, participants = ?unique, "Session created");
        self.emit(BusEvent::SessionCreated {
            session_id: session_id.clone(),
        });
        Ok(session_id)
    }

    /// Activate a session and append the context briefing as turn zero.
    ///
    /// Starting an already active session is a no-op.
    pub fn start_session(&self, session_id: &str) -> Result<()> {
        let handle = self.handle(session_id)?;
        let briefing_message = {
            let mut record = handle.lock();
            match record.session.conversation_state.status {
                ConversationStatus::Completed => {
                    return Err(AppError::SessionClosed(session_id.to_string()))
                }
                ConversationStatus::Active => return Ok(()),
                ConversationStatus::Initializing | ConversationStatus::Paused => {}
            }
            record.session.conversation_state.status = ConversationStatus::Active;

            if record.history.is_empty() {
                let message = Message::new(
                    SYSTEM_PARTICIPANT_ID,
                    MessageType::Clarification,
                    format!(
                        "Session briefing for all participants\n{}",
                        briefing(&record.session.context)
                    ),
                );
                self.append(&mut record, message.clone());
                Some(message)
            } else {
                None
            }
        };

        info!(session_id = %session_id, "Session started");
        self.emit(BusEvent::SessionStarted {
            session_id: session_id.to_string(),
        });
        if let Some(message) = briefing_message {
            self.emit(BusEvent::MessageReceived {
                session_id: session_id.to_string(),
                message,
            });
        }
        Ok(())
    }

    /// Append a message to an active session and recompute derived state.
    ///
    /// The author must be a session participant, the system or the human
    /// operator. Returns the consensus after the append.
    pub fn broadcast_message(&self, session_id: &str, message: Message) -> Result<ConsensusReport> {
        let handle = self.handle(session_id)?;
        let report = {
            let mut record = handle.lock();
            match record.session.conversation_state.status {
                ConversationStatus::Completed => {
                    return Err(AppError::SessionClosed(session_id.to_string()))
                }
                ConversationStatus::Initializing => {
                    return Err(AppError::Validation(format!(
                        "session {} has not been started",
                        session_id
                    )))
                }
                ConversationStatus::Paused => {
                    return Err(AppError::Validation(format!(
                        "session {} is paused",
                        session_id
                    )))
                }
                ConversationStatus::Active => {}
            }

            let known_author = message.from == SYSTEM_PARTICIPANT_ID
                || message.from == USER_PARTICIPANT_ID
                || record.session.participant(&message.from).is_some();
            if !known_author {
                return Err(AppError::UnknownParticipant(message.from.clone()));
            }
            if !message.scores_in_range() {
                return Err(AppError::Validation(
                    "confidence and validation scores must lie in [0, 1]".to_string(),
                ));
            }

            self.append(&mut record, message.clone())
        };

        self.emit(BusEvent::MessageReceived {
            session_id: session_id.to_string(),
            message,
        });
        Ok(report)
    }

    fn append(&self, record: &mut SessionRecord, message: Message) -> ConsensusReport {
        let author = message.from.clone();
        record.history.push(message);

        for participant in &mut record.session.participants {
            participant.status = if participant.id == author {
                ParticipantStatus::Active
            } else {
                ParticipantStatus::Listening
            };
        }

        let report = self.evaluator.evaluate(&record.history);
        let state = &mut record.session.conversation_state;
        state.message_count = record.history.len();
        state.current_speaker_id = Some(author);
        apply_report(state, &report);

        debug!(
            session_id = %record.session.session_id,
            message_count = state.message_count,
            agreement = report.agreement_level,
            "Message appended"
        );
        report
    }

    /// Next participant per the turn policy, `None` when the caller must pick.
    pub fn determine_next_speaker(&self, session_id: &str) -> Result<Option<Participant>> {
        let handle = self.handle(session_id)?;
        let record = handle.lock();
        let next = self
            .policy
            .select(
                &record.session.participants,
                &record.session.context.topic,
                record.history.last(),
            )
            .cloned();
        Ok(next)
    }

    /// Re-run the evaluator and store its result on the session.
    pub fn evaluate_consensus(&self, session_id: &str) -> Result<ConsensusReport> {
        let handle = self.handle(session_id)?;
        let mut record = handle.lock();
        let report = self.evaluator.evaluate(&record.history);
        apply_report(&mut record.session.conversation_state, &report);
        Ok(report)
    }

    /// Complete a session. Calling it again has no further effect.
    ///
    /// The session stays readable until [`release_session`](Self::release_session).
    pub fn end_session(&self, session_id: &str) -> Result<()> {
        let handle = self.handle(session_id)?;
        {
            let mut record = handle.lock();
            if record.session.conversation_state.status == ConversationStatus::Completed {
                return Ok(());
            }
            record.session.conversation_state.status = ConversationStatus::Completed;
            for participant in &mut record.session.participants {
                participant.status = ParticipantStatus::Listening;
            }
        }

        info!(session_id = %session_id, "Session ended");
        self.emit(BusEvent::SessionEnded {
            session_id: session_id.to_string(),
        });
        Ok(())
    }

    /// Drop a completed session from the store.
    ///
    /// Returns whether anything was removed; active sessions are kept.
    pub fn release_session(&self, session_id: &str) -> Result<bool> {
        let handle = self.handle(session_id)?;
        let completed =
            handle.lock().session.conversation_state.status == ConversationStatus::Completed;
        if completed {
            self.store.remove(session_id);
            debug!(session_id = %session_id, "Session released");
        }
        Ok(completed)
    }

    /// Mark a participant as processing/responding while its turn is generated.
    pub fn set_participant_status(
        &self,
        session_id: &str,
        participant_id: &str,
        status: ParticipantStatus,
    ) -> Result<()> {
        let handle = self.handle(session_id)?;
        let mut record = handle.lock();
        let participant = record
            .session
            .participants
            .iter_mut()
            .find(|p| p.id == participant_id)
            .ok_or_else(|| AppError::UnknownParticipant(participant_id.to_string()))?;
        participant.status = status;
        Ok(())
    }

    pub fn session(&self, session_id: &str) -> Result<CollaborationSession> {
        Ok(self.handle(session_id)?.lock().session.clone())
    }

    pub fn history(&self, session_id: &str) -> Result<Vec<Message>> {
        Ok(self.handle(session_id)?.lock().history.clone())
    }

    /// Session and history read under one lock, so they agree with each other.
    pub fn snapshot(&self, session_id: &str) -> Result<(CollaborationSession, Vec<Message>)> {
        let handle = self.handle(session_id)?;
        let record = handle.lock();
        Ok((record.session.clone(), record.history.clone()))
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.store.contains(session_id)
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.store.ids()
    }

    pub fn session_count(&self) -> usize {
        self.store.len()
    }
}

fn apply_report(state: &mut ConversationState, report: &ConsensusReport) {
    state.agreement_level = report.agreement_level;
    state.convergence_points = report.convergence_points.clone();
    state.remaining_disagreements = report.remaining_disagreements.clone();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaboration::consensus::{NEXT_STEP_CONTINUE, NEXT_STEP_IMPLEMENT};

    fn bus() -> CommunicationBus {
        CommunicationBus::with_defaults(Arc::new(AgentRegistry::with_default_roles()))
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn started(bus: &CommunicationBus, topic: &str, participants: &[&str]) -> String {
        let id = bus
            .create_session(topic, &ids(participants), MeetingType::Brainstorm, None)
            .unwrap();
        bus.start_session(&id).unwrap();
        id
    }

    #[test]
    fn test_create_session_rejects_unknown_participant() {
        let bus = bus();
        let err = bus
            .create_session("topic", &ids(&["architect", "ghost"]), MeetingType::Brainstorm, None)
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownParticipant(ref id) if id == "ghost"));
        assert_eq!(bus.session_count(), 0);
    }

    #[test]
    fn test_create_session_allows_duplicate_topics_and_dedupes_ids() {
        let bus = bus();
        let a = bus
            .create_session("same", &ids(&["architect", "architect"]), MeetingType::Brainstorm, None)
            .unwrap();
        let b = bus
            .create_session("same", &ids(&["architect"]), MeetingType::Brainstorm, None)
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(bus.session(&a).unwrap().participants.len(), 1);
    }

    #[test]
    fn test_start_session_appends_briefing() {
        let bus = bus();
        let id = started(&bus, "shared planning", &["architect", "engineer"]);

        let (session, history) = bus.snapshot(&id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from, SYSTEM_PARTICIPANT_ID);
        assert_eq!(session.conversation_state.status, ConversationStatus::Active);
        assert_eq!(session.conversation_state.message_count, 1);

        // Idempotent
        bus.start_session(&id).unwrap();
        assert_eq!(bus.history(&id).unwrap().len(), 1);
    }

    #[test]
    fn test_start_missing_session() {
        assert!(matches!(
            bus().start_session("session_nope"),
            Err(AppError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_broadcast_before_start_is_rejected() {
        let bus = bus();
        let id = bus
            .create_session("t", &ids(&["architect"]), MeetingType::Brainstorm, None)
            .unwrap();
        let message = Message::new("architect", MessageType::Suggestion, "hi");
        assert!(matches!(
            bus.broadcast_message(&id, message),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_message_count_tracks_history() {
        let bus = bus();
        let id = started(&bus, "shared planning", &["architect", "engineer"]);
        for (i, author) in ["architect", "engineer", "user", "architect"].iter().enumerate() {
            bus.broadcast_message(&id, Message::new(*author, MessageType::Suggestion, "noted"))
                .unwrap();
            let (session, history) = bus.snapshot(&id).unwrap();
            assert_eq!(session.conversation_state.message_count, history.len());
            assert_eq!(history.len(), i + 2);
            assert_eq!(
                session.conversation_state.current_speaker_id.as_deref(),
                Some(*author)
            );
        }
    }

    #[test]
    fn test_agreement_scenario() {
        let bus = bus();
        let id = started(&bus, "shared planning", &["architect", "engineer"]);
        let report = bus
            .broadcast_message(
                &id,
                Message::new("architect", MessageType::Suggestion, "Yes, I agree with that plan."),
            )
            .unwrap();
        assert_eq!(report.agreement_level, 1.0);
        assert!(!report.convergence_points.is_empty());
        assert_eq!(report.next_steps, vec![NEXT_STEP_IMPLEMENT.to_string()]);

        let session = bus.session(&id).unwrap();
        assert_eq!(session.conversation_state.agreement_level, 1.0);
        let architect = session.participant("architect").unwrap();
        assert_eq!(architect.status, ParticipantStatus::Active);
        assert_eq!(
            session.participant("engineer").unwrap().status,
            ParticipantStatus::Listening
        );
    }

    #[test]
    fn test_disagreement_scenario() {
        let bus = bus();
        let id = started(&bus, "shared planning", &["architect", "engineer"]);
        let report = bus
            .broadcast_message(
                &id,
                Message::new(
                    "engineer",
                    MessageType::Analysis,
                    "Correct in principle, but I see an issue and a real concern.",
                ),
            )
            .unwrap();
        assert_eq!(report.agreement_level, 0.25);
        assert!(!report.remaining_disagreements.is_empty());
        assert_eq!(report.next_steps, vec![NEXT_STEP_CONTINUE.to_string()]);
    }

    #[test]
    fn test_neutral_consensus_below_two_messages() {
        let bus = bus();
        let id = bus
            .create_session("t", &ids(&["architect"]), MeetingType::Brainstorm, None)
            .unwrap();
        let report = bus.evaluate_consensus(&id).unwrap();
        assert_eq!(report.agreement_level, 0.5);
        assert!(report.convergence_points.is_empty());
        assert!(report.remaining_disagreements.is_empty());

        bus.start_session(&id).unwrap();
        let report = bus.evaluate_consensus(&id).unwrap();
        assert_eq!(report.agreement_level, 0.5);
        assert!(report.convergence_points.is_empty());
    }

    #[test]
    fn test_end_session_closes_it() {
        let bus = bus();
        let id = started(&bus, "t", &["architect"]);
        bus.end_session(&id).unwrap();
        bus.end_session(&id).unwrap();

        let err = bus
            .broadcast_message(&id, Message::new("architect", MessageType::Decision, "done"))
            .unwrap_err();
        assert!(matches!(err, AppError::SessionClosed(_)));
        assert!(matches!(bus.start_session(&id), Err(AppError::SessionClosed(_))));
    }

    #[test]
    fn test_release_only_completed_sessions() {
        let bus = bus();
        let id = started(&bus, "t", &["architect"]);
        assert!(!bus.release_session(&id).unwrap());
        bus.end_session(&id).unwrap();
        assert!(bus.release_session(&id).unwrap());
        assert!(!bus.contains(&id));
    }

    #[test]
    fn test_outsider_cannot_speak() {
        let bus = bus();
        let id = started(&bus, "t", &["architect"]);
        let err = bus
            .broadcast_message(&id, Message::new("analyst", MessageType::Analysis, "hi"))
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownParticipant(_)));
        assert_eq!(bus.session(&id).unwrap().conversation_state.message_count, 1);
    }

    #[test]
    fn test_out_of_range_scores_rejected() {
        let bus = bus();
        let id = started(&bus, "t", &["architect"]);
        let message = Message::new("architect", MessageType::Analysis, "hi").with_confidence(1.5);
        assert!(matches!(
            bus.broadcast_message(&id, message),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_next_speaker_follows_reference_over_topic() {
        let bus = bus();
        let id = started(&bus, "platform architecture", &["architect", "analyst"]);
        assert_eq!(
            bus.determine_next_speaker(&id).unwrap().unwrap().id,
            "architect"
        );

        let message = Message::new("user", MessageType::Question, "what do the numbers say?")
            .referencing(ids(&["analyst"]));
        bus.broadcast_message(&id, message).unwrap();
        assert_eq!(
            bus.determine_next_speaker(&id).unwrap().unwrap().id,
            "analyst"
        );
    }

    #[test]
    fn test_events_are_emitted() {
        let bus = bus();
        let mut rx = bus.subscribe();
        let id = started(&bus, "t", &["architect"]);

        assert!(matches!(rx.try_recv().unwrap(), BusEvent::SessionCreated { .. }));
        assert!(matches!(rx.try_recv().unwrap(), BusEvent::SessionStarted { .. }));
        match rx.try_recv().unwrap() {
            BusEvent::MessageReceived { session_id, message } => {
                assert_eq!(session_id, id);
                assert_eq!(message.from, SYSTEM_PARTICIPANT_ID);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
