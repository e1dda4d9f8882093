use crate::agents::prompting::{decapitalize, last_contribution, own_turns, rotate, RoleCore};
use crate::agents::CollaborativeAgent;
use crate::llm::LLMClient;
use crate::types::{
    AgentFeedback, AgentRole, Attachment, AttachmentKind, CollaborationContext,
    ExpertiseAssessment, Message, MessageType, Participant, ParticipantStatus, RecommendedRole,
    Result,
};
use async_trait::async_trait;
use serde_json::json;

pub const ARCHITECT_ID: &str = "architect";

const CONFIDENCE: f64 = 0.92;

/// Platform architect and community lead. Usually opens and frames a meeting.
pub struct ArchitectAgent {
    core: RoleCore,
}

impl ArchitectAgent {
    pub fn new() -> Self {
        Self::with_llm(None, None)
    }

    pub fn with_llm(llm: Option<Box<dyn LLMClient>>, system_prompt: Option<String>) -> Self {
        let system_prompt = system_prompt.unwrap_or_else(Self::default_system_prompt);
        Self {
            core: RoleCore::new(Self::profile_entry(), llm, system_prompt),
        }
    }

    pub fn profile_entry() -> Participant {
        Participant {
            id: ARCHITECT_ID.to_string(),
            role: AgentRole {
                name: "Platform Architect & Community Lead".to_string(),
                specializations: vec![
                    "platform_architecture".to_string(),
                    "system_design".to_string(),
                    "community_needs".to_string(),
                    "cultural_competency".to_string(),
                ],
                communication_style: "visionary, community-focused leadership".to_string(),
                primary_focus: "platform architecture and community fit".to_string(),
            },
            status: ParticipantStatus::Listening,
            expertise_tags: vec![
                "architecture".to_string(),
                "community".to_string(),
                "leadership".to_string(),
            ],
            affinity_keywords: vec![
                "architecture".to_string(),
                "platform".to_string(),
                "community".to_string(),
                "design".to_string(),
                "wellness".to_string(),
                "cultural".to_string(),
            ],
        }
    }

    fn default_system_prompt() -> String {
        r#"You are the Platform Architect and Community Lead in a live planning meeting.
Frame problems in terms of platform structure and the needs of the community the product serves.
Keep contributions short, concrete and addressed to the other participants by name when useful."#
            .to_string()
    }

    fn compose_offline(&self, context: &CollaborationContext, history: &[Message]) -> String {
        let turn = own_turns(history, ARCHITECT_ID);
        let mut parts = Vec::new();

        if let Some(previous) = last_contribution(history, ARCHITECT_ID) {
            parts.push(format!(
                "Picking up on what {} raised: yes, that fits the platform direction.",
                previous.from
            ));
        }

        let anchor = rotate(&context.objectives, turn)
            .map(decapitalize)
            .unwrap_or_else(|| "a small set of well-bounded services".to_string());
        parts.push(format!(
            "For \"{}\", I would anchor the design on {}.",
            context.topic, anchor
        ));

        if let Some(consideration) = rotate(&context.domain_considerations, turn) {
            parts.push(format!(
                "Every component should keep this in view: {}.",
                decapitalize(consideration)
            ));
        }

        parts.push(
            "I'd like implementation input on how this maps onto our existing services."
                .to_string(),
        );
        parts.join(" ")
    }
}

impl Default for ArchitectAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CollaborativeAgent for ArchitectAgent {
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

        let mut message = Message::new(ARCHITECT_ID, MessageType::Suggestion, content)
            .referencing(vec!["engineer".to_string()])
            .with_attachment(Attachment {
                kind: AttachmentKind::ArchitectureDiagram,
                data: json!({
                    "topic": context.topic,
                    "layers": ["experience", "domain services", "data platform"],
                }),
                metadata: None,
            })
            .with_confidence(CONFIDENCE);

        if !context.domain_considerations.is_empty() {
            message.cultural_validation = Some(0.9);
        }
        Ok(message)
    }

    async fn provide_feedback(&self, _topic: &str, messages: &[Message]) -> Result<AgentFeedback> {
        Ok(self.core.feedback(
            messages,
            vec![
                "Validate the direction with community representatives early".to_string(),
                "Keep service boundaries aligned with user journeys".to_string(),
            ],
            vec!["Draft the target architecture".to_string()],
        ))
    }

    fn analyze_expertise(&self, topic: &str) -> ExpertiseAssessment {
        self.core.assess(topic, CONFIDENCE, RecommendedRole::Contributor)
    }

    fn suggest_collaborators(&self, topic: &str) -> Vec<String> {
        let topic = topic.to_lowercase();
        let mut ids = vec!["engineer", "analyst", "strategist"];
        if topic.contains("data") || topic.contains("metric") {
            ids.swap(0, 1);
        }
        ids.into_iter().map(String::from).collect()
    }
}
