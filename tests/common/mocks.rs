//! Mock participants and LLM clients shared by the integration tests.
//!
//! Nothing here touches the network, so the suites stay deterministic.

use agora::agents::CollaborativeAgent;
use agora::llm::LLMClient;
use agora::types::{
    AgentFeedback, AgentRole, AppError, CollaborationContext, ExpertiseAssessment, Message,
    MessageType, Participant, ParticipantStatus, RecommendedRole, Result,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Catalog entry for a test participant.
pub fn participant(id: &str, affinity: &[&str]) -> Participant {
    Participant {
        id: id.to_string(),
        role: AgentRole {
            name: format!("{} role", id),
            specializations: vec![format!("{}_work", id)],
            communication_style: "plain".to_string(),
            primary_focus: format!("{} concerns", id),
        },
        status: ParticipantStatus::Listening,
        expertise_tags: vec![id.to_string()],
        affinity_keywords: affinity.iter().map(|k| k.to_string()).collect(),
    }
}

/// Participant that replies with a fixed line, optionally after a delay.
///
/// Counts how often it was asked to speak.
pub struct ScriptedAgent {
    profile: Participant,
    reply: String,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedAgent {
    pub fn new(id: &str, reply: &str) -> Self {
        Self {
            profile: participant(id, &[]),
            reply: reply.to_string(),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_affinity(mut self, keywords: &[&str]) -> Self {
        self.profile.affinity_keywords = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared counter of `generate_response` calls.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl CollaborativeAgent for ScriptedAgent {
    fn profile(&self) -> &Participant {
        &self.profile
    }

    async fn generate_response(
        &self,
        _context: &CollaborationContext,
        _history: &[Message],
    ) -> Result<Message> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(Message::new(&self.profile.id, MessageType::Suggestion, &self.reply).with_confidence(0.8))
    }

    async fn provide_feedback(&self, _topic: &str, _messages: &[Message]) -> Result<AgentFeedback> {
        Ok(AgentFeedback {
            agreement: 0.5,
            concerns: vec![],
            suggestions: vec![],
            next_steps: vec![],
        })
    }

    fn analyze_expertise(&self, topic: &str) -> ExpertiseAssessment {
        let topic = topic.to_lowercase();
        let hits = self
            .profile
            .affinity_keywords
            .iter()
            .filter(|k| topic.contains(k.as_str()))
            .count();
        ExpertiseAssessment {
            relevance: (0.2 + 0.25 * hits as f64).min(1.0),
            confidence: 0.8,
            recommended_role: if hits > 0 {
                RecommendedRole::Lead
            } else {
                RecommendedRole::Observer
            },
        }
    }

    fn suggest_collaborators(&self, _topic: &str) -> Vec<String> {
        vec![]
    }
}

/// Participant whose generator always fails.
pub struct FailingAgent {
    profile: Participant,
}

impl FailingAgent {
    pub fn new(id: &str) -> Self {
        Self {
            profile: participant(id, &[]),
        }
    }
}

#[async_trait]
impl CollaborativeAgent for FailingAgent {
    fn profile(&self) -> &Participant {
        &self.profile
    }

    async fn generate_response(
        &self,
        _context: &CollaborationContext,
        _history: &[Message],
    ) -> Result<Message> {
        Err(AppError::LLM("Mock generator failure".to_string()))
    }

    async fn provide_feedback(&self, _topic: &str, _messages: &[Message]) -> Result<AgentFeedback> {
        Err(AppError::LLM("Mock generator failure".to_string()))
    }

    fn analyze_expertise(&self, _topic: &str) -> ExpertiseAssessment {
        ExpertiseAssessment {
            relevance: 0.2,
            confidence: 0.5,
            recommended_role: RecommendedRole::Observer,
        }
    }

    fn suggest_collaborators(&self, _topic: &str) -> Vec<String> {
        vec![]
    }
}

/// Mock LLM client with a canned reply, or a failure.
#[derive(Clone)]
pub struct MockLLMClient {
    response: String,
    should_fail: bool,
}

impl MockLLMClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            should_fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            response: String::new(),
            should_fail: true,
        }
    }

    fn reply(&self) -> Result<String> {
        if self.should_fail {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }
        Ok(self.response.clone())
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.reply()
    }

    async fn generate_with_system(&self, _system: &str, _prompt: &str) -> Result<String> {
        self.reply()
    }

    async fn generate_with_history(&self, _messages: &[(String, String)]) -> Result<String> {
        self.reply()
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
