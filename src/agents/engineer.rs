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

pub const ENGINEER_ID: &str = "engineer";

const CONFIDENCE: f64 = 0.88;

/// Technical implementation lead; the coordination role turn selection falls
/// back to when nobody else is an obvious fit.
pub struct EngineerAgent {
    core: RoleCore,
}

impl EngineerAgent {
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
            id: ENGINEER_ID.to_string(),
            role: AgentRole {
                name: "Technical Implementation Lead".to_string(),
                specializations: vec![
                    "code_implementation".to_string(),
                    "technical_integration".to_string(),
                    "development_support".to_string(),
                    "api_design".to_string(),
                ],
                communication_style: "supportive, practical technical guidance".to_string(),
                primary_focus: "implementation feasibility".to_string(),
            },
            status: ParticipantStatus::Listening,
            expertise_tags: vec![
                "implementation".to_string(),
                "integration".to_string(),
                "delivery".to_string(),
            ],
            affinity_keywords: vec![
                "implementation".to_string(),
                "code".to_string(),
                "integration".to_string(),
                "api".to_string(),
                "technical".to_string(),
                "develop".to_string(),
            ],
        }
    }

    fn default_system_prompt() -> String {
        r#"You are the Technical Implementation Lead in a live planning meeting.
Turn proposals into concrete, phased build plans, name integration points and call out constraints that affect delivery.
Answer questions directly before adding your own suggestions."#
            .to_string()
    }

    fn phases(context: &CollaborationContext) -> Vec<String> {
        if context.objectives.is_empty() {
            return vec![
                "Spike the riskiest integration".to_string(),
                "Build the core flow".to_string(),
                "Harden and roll out".to_string(),
            ];
        }
        context.objectives.iter().take(3).cloned().collect()
    }

    fn compose_offline(&self, context: &CollaborationContext, history: &[Message]) -> String {
        let turn = own_turns(history, ENGINEER_ID);
        let mut parts = vec![format!(
            "From an implementation standpoint on \"{}\":",
            context.topic
        )];

        if let Some(previous) = last_contribution(history, ENGINEER_ID) {
            if previous.message_type == MessageType::Question {
                parts.push(format!(
                    "to answer {} directly, this is buildable in phases.",
                    previous.from
                ));
            } else {
                parts.push(format!("{}'s proposal is buildable in phases.", previous.from));
            }
        } else {
            parts.push("this is buildable in phases.".to_string());
        }

        let plan = Self::phases(context)
            .iter()
            .enumerate()
            .map(|(i, phase)| format!("Phase {}: {}", i + 1, decapitalize(phase)))
            .collect::<Vec<_>>()
            .join("; ");
        parts.push(format!("{}.", plan));

        if let Some(constraint) = rotate(&context.constraints, turn) {
            parts.push(format!(
                "One constraint to plan around: {}.",
                decapitalize(constraint)
            ));
        }

        parts.push(
            "Before wiring the integration points I need the data requirements pinned down."
                .to_string(),
        );
        parts.join(" ")
    }
}

impl Default for EngineerAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CollaborativeAgent for EngineerAgent {
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

        let answering_question = last_contribution(history, ENGINEER_ID)
            .is_some_and(|m| m.message_type == MessageType::Question);
        let message_type = if answering_question {
            MessageType::Clarification
        } else {
            MessageType::Suggestion
        };

        Ok(Message::new(ENGINEER_ID, message_type, content)
            .referencing(vec!["analyst".to_string()])
            .with_attachment(Attachment {
                kind: AttachmentKind::ArchitectureDiagram,
                data: json!({ "phases": Self::phases(context) }),
                metadata: Some(json!({ "view": "implementation_plan" })),
            })
            .with_confidence(CONFIDENCE))
    }

    async fn provide_feedback(&self, _topic: &str, messages: &[Message]) -> Result<AgentFeedback> {
        Ok(self.core.feedback(
            messages,
            vec![
                "Prototype the riskiest integration first".to_string(),
                "Define API contracts before parallel work starts".to_string(),
            ],
            vec!["Break the plan into deliverable milestones".to_string()],
        ))
    }

    fn analyze_expertise(&self, topic: &str) -> ExpertiseAssessment {
        self.core.assess(topic, CONFIDENCE, RecommendedRole::Contributor)
    }

    fn suggest_collaborators(&self, topic: &str) -> Vec<String> {
        let topic = topic.to_lowercase();
        let mut ids = vec!["architect".to_string(), "analyst".to_string()];
        if ["cost", "budget", "infrastructure"]
            .iter()
            .any(|k| topic.contains(k))
        {
            ids.insert(0, "strategist".to_string());
        }
        ids
    }
}
