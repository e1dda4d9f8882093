//! Turn selection.
//!
//! Deterministic and side-effect free. Only the `referencedParticipants` of the
//! last message and the static topic are consulted, never message sentiment.

use crate::types::{Message, Participant};
use tracing::debug;

/// Why a participant was picked, mostly useful in logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnReason {
    Referenced,
    TopicAffinity,
    Default,
}

#[derive(Debug, Clone, Default)]
pub struct TurnPolicy {
    default_participant: Option<String>,
}

impl TurnPolicy {
    pub fn new(default_participant: Option<String>) -> Self {
        Self {
            default_participant,
        }
    }

    pub fn default_participant(&self) -> Option<&str> {
        self.default_participant.as_deref()
    }

    /// Pick the next speaker, or `None` when the caller must choose explicitly.
    ///
    /// Priority, first match wins:
    /// 1. the first session participant named in the last message's references
    /// 2. the first participant whose affinity terms occur in the topic
    /// 3. the configured default participant, when it is in the session
    pub fn select<'a>(
        &self,
        participants: &'a [Participant],
        topic: &str,
        last: Option<&Message>,
    ) -> Option<&'a Participant> {
        self.select_with_reason(participants, topic, last)
            .map(|(participant, _)| participant)
    }

    pub fn select_with_reason<'a>(
        &self,
        participants: &'a [Participant],
        topic: &str,
        last: Option<&Message>,
    ) -> Option<(&'a Participant, TurnReason)> {
        if let Some(refs) = last.and_then(|m| m.referenced_participants.as_ref()) {
            if let Some(p) = participants.iter().find(|p| refs.contains(&p.id)) {
                debug!(participant = %p.id, "next speaker chosen by reference");
                return Some((p, TurnReason::Referenced));
            }
        }

        if let Some(p) = topic_affinity(participants, topic) {
            debug!(participant = %p.id, "next speaker chosen by topic affinity");
            return Some((p, TurnReason::TopicAffinity));
        }

        let fallback = self
            .default_participant
            .as_deref()
            .and_then(|id| participants.iter().find(|p| p.id == id));
        if let Some(p) = fallback {
            debug!(participant = %p.id, "next speaker is the default participant");
            return Some((p, TurnReason::Default));
        }

        None
    }
}

/// First participant whose affinity terms appear in the topic (case-insensitive).
pub fn topic_affinity<'a>(participants: &'a [Participant], topic: &str) -> Option<&'a Participant> {
    let topic = topic.to_lowercase();
    participants.iter().find(|p| {
        p.affinity_terms()
            .iter()
            .any(|term| topic.contains(term.as_str()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentRole, MessageType, ParticipantStatus};

    fn participant(id: &str, keywords: &[&str]) -> Participant {
        Participant {
            id: id.to_string(),
            role: AgentRole {
                name: id.to_string(),
                specializations: vec![],
                communication_style: "plain".to_string(),
                primary_focus: "anything".to_string(),
            },
            status: ParticipantStatus::Listening,
            expertise_tags: vec![],
            affinity_keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn session() -> Vec<Participant> {
        vec![
            participant("architect", &["architecture"]),
            participant("analyst", &["data"]),
            participant("engineer", &["code"]),
        ]
    }

    fn referencing(ids: &[&str]) -> Message {
        Message::new("user", MessageType::Question, "thoughts?")
            .referencing(ids.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_reference_wins_over_topic() {
        let policy = TurnPolicy::new(Some("engineer".into()));
        let last = referencing(&["analyst"]);
        let session = session();
        let (picked, reason) = policy
            .select_with_reason(&session, "architecture review", Some(&last))
            .unwrap();
        assert_eq!(picked.id, "analyst");
        assert_eq!(reason, TurnReason::Referenced);
    }

    #[test]
    fn test_multiple_references_follow_session_order() {
        let policy = TurnPolicy::default();
        let last = referencing(&["engineer", "architect"]);
        let session = session();
        let picked = policy.select(&session, "", Some(&last)).unwrap();
        assert_eq!(picked.id, "architect");
    }

    #[test]
    fn test_references_outside_session_fall_through() {
        let policy = TurnPolicy::default();
        let last = referencing(&["strategist"]);
        let session = session();
        let picked = policy.select(&session, "Data pipeline", Some(&last)).unwrap();
        assert_eq!(picked.id, "analyst");
    }

    #[test]
    fn test_topic_affinity_is_case_insensitive() {
        let policy = TurnPolicy::default();
        let session = session();
        let picked = policy.select(&session, "Refactor the CODE base", None).unwrap();
        assert_eq!(picked.id, "engineer");
    }

    #[test]
    fn test_default_participant_fallback() {
        let policy = TurnPolicy::new(Some("engineer".into()));
        let session = session();
        let (picked, reason) = policy
            .select_with_reason(&session, "quarterly offsite", None)
            .unwrap();
        assert_eq!(picked.id, "engineer");
        assert_eq!(reason, TurnReason::Default);
    }

    #[test]
    fn test_default_outside_session_yields_none() {
        let policy = TurnPolicy::new(Some("strategist".into()));
        assert!(policy.select(&session(), "quarterly offsite", None).is_none());
    }

    #[test]
    fn test_no_default_yields_none() {
        assert!(TurnPolicy::default()
            .select(&session(), "quarterly offsite", None)
            .is_none());
    }
}
