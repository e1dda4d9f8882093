//! Configurable role implementation
//!
//! Builds a participant entirely from an `[agents.<id>]` table in
//! `agora.toml`, so new roles can join meetings without code changes.

use crate::agents::prompting::{decapitalize, last_contribution, matched_terms, rotate, RoleCore};
use crate::agents::CollaborativeAgent;
use crate::llm::LLMClient;
use crate::types::{
    AgentFeedback, AgentRole, Attachment, AttachmentKind, CollaborationContext,
    ExpertiseAssessment, Message, MessageType, Participant, ParticipantStatus, RecommendedRole,
    Result,
};
use crate::utils::toml_config::AgentConfig;
use async_trait::async_trait;
use serde_json::json;

const CONFIDENCE: f64 = 0.8;

/// A role whose profile and prompt come from configuration
pub struct ConfigurableAgent {
    core: RoleCore,
}

impl ConfigurableAgent {
    /// Create a configurable role
    ///
    /// # Arguments
    ///
    /// * `id` - Participant id (the `[agents.<id>]` key)
    /// * `role` - Role description taken from the same table
    /// * `config` - The agent configuration from agora.toml
    /// * `llm` - Client for the bound model, if any
    pub fn new(
        id: &str,
        role: AgentRole,
        config: &AgentConfig,
        llm: Option<Box<dyn LLMClient>>,
    ) -> Self {
        let system_prompt = config
            .system_prompt
            .clone()
            .unwrap_or_else(|| Self::default_system_prompt(&role));

        let profile = Participant {
            id: id.to_string(),
            role,
            status: ParticipantStatus::Listening,
            expertise_tags: config.expertise_tags.clone(),
            affinity_keywords: config.affinity.clone(),
        };

        Self {
            core: RoleCore::new(profile, llm, system_prompt),
        }
    }

    fn default_system_prompt(role: &AgentRole) -> String {
        format!(
            "You are the {} in a live planning meeting. Your communication style is {}. \
             Focus on {}.",
            role.name, role.communication_style, role.primary_focus
        )
    }

    pub fn system_prompt(&self) -> &str {
        self.core.system_prompt()
    }

    /// Model bound to this role, if any
    pub fn model_name(&self) -> Option<&str> {
        self.core.model_name()
    }

    fn compose_offline(&self, context: &CollaborationContext, history: &[Message]) -> String {
        let role = &self.core.profile().role;
        let mut parts = vec![format!(
            "As {}, my focus on \"{}\" is {}.",
            role.name, context.topic, role.primary_focus
        )];

        if let Some(previous) = last_contribution(history, self.core.id()) {
            parts.push(format!("Responding to {}:", previous.from));
        }

        let lens = rotate(&role.specializations, history.len())
            .map(|s| s.replace('_', " "))
            .unwrap_or_else(|| role.primary_focus.clone());
        match rotate(&context.objectives, history.len()) {
            Some(objective) => parts.push(format!(
                "Through the lens of {}, {} needs attention next.",
                lens,
                decapitalize(objective)
            )),
            None => parts.push(format!("I'd look at this through the lens of {}.", lens)),
        }

        parts.join(" ")
    }
}

#[async_trait]
impl CollaborativeAgent for ConfigurableAgent {
    fn profile(&self) -> &Participant {
        self.core.profile()
    }

    async fn generate_response(
        &self,
        context: &CollaborationContext,
        history: &[Message],
    ) -> Result<Message> {
        let content = self
            .core
            .compose(context, history, || self.compose_offline(context, history))
            .await?;

        let matched = matched_terms(self.core.profile(), &context.topic);
        Ok(Message::new(self.core.id(), MessageType::Analysis, content)
            .with_attachment(Attachment {
                kind: AttachmentKind::DomainAssessment,
                data: json!({
                    "focus": self.core.profile().role.primary_focus,
                    "matchedTerms": matched,
                }),
                metadata: None,
            })
            .with_confidence(CONFIDENCE))
    }

    async fn provide_feedback(&self, _topic: &str, messages: &[Message]) -> Result<AgentFeedback> {
        let focus = &self.core.profile().role.primary_focus;
        Ok(self.core.feedback(
            messages,
            vec![format!("Check the plan against {}", focus)],
            Vec::new(),
        ))
    }

    fn analyze_expertise(&self, topic: &str) -> ExpertiseAssessment {
        self.core.assess(topic, CONFIDENCE, RecommendedRole::Observer)
    }

    fn suggest_collaborators(&self, _topic: &str) -> Vec<String> {
        Vec::new()
    }
}
