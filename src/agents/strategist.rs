use crate::agents::prompting::{decapitalize, own_turns, RoleCore};
use crate::agents::CollaborativeAgent;
use crate::llm::LLMClient;
use crate::types::{
    AgentFeedback, AgentRole, Attachment, AttachmentKind, CollaborationContext,
    ExpertiseAssessment, Message, MessageType, Participant, ParticipantStatus, RecommendedRole,
    Result,
};
use async_trait::async_trait;
use serde_json::json;

pub const STRATEGIST_ID: &str = "strategist";

const CONFIDENCE: f64 = 0.87;

/// Business intelligence and operations. Pushes for decisions once a
/// discussion has run for a while.
pub struct StrategistAgent {
    core: RoleCore,
}

impl StrategistAgent {
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
            id: STRATEGIST_ID.to_string(),
            role: AgentRole {
                name: "Business Intelligence & Operations".to_string(),
                specializations: vec![
                    "business_strategy".to_string(),
                    "operational_efficiency".to_string(),
                    "cloud_infrastructure".to_string(),
                    "enterprise_integration".to_string(),
                ],
                communication_style: "results-focused, strategic, actionable".to_string(),
                primary_focus: "business value and operational scale".to_string(),
            },
            status: ParticipantStatus::Listening,
            expertise_tags: vec![
                "strategy".to_string(),
                "operations".to_string(),
                "infrastructure".to_string(),
            ],
            affinity_keywords: vec![
                "business".to_string(),
                "cost".to_string(),
                "budget".to_string(),
                "market".to_string(),
                "operations".to_string(),
                "infrastructure".to_string(),
            ],
        }
    }

    fn default_system_prompt() -> String {
        r#"You are the Business Intelligence and Operations lead in a live planning meeting.
Weigh proposals by business value, cost and operational load, and steer the group towards decisions with owners."#
            .to_string()
    }

    /// Long-running discussions get a decision rather than another suggestion.
    fn ready_to_decide(history: &[Message]) -> bool {
        own_turns(history, STRATEGIST_ID) > 0 && history.len() >= 6
    }

    fn compose_offline(&self, context: &CollaborationContext, history: &[Message]) -> String {
        let mut parts = vec![format!("On the business side of \"{}\":", context.topic)];

        let budget = context
            .constraints
            .iter()
            .find(|c| c.to_lowercase().contains("budget"));
        match budget {
            Some(constraint) => parts.push(format!(
                "given {}, I'd phase the rollout and check the return at each step.",
                decapitalize(constraint)
            )),
            None => parts.push(
                "the fastest path to value is a narrow first release we can measure.".to_string(),
            ),
        }

        if Self::ready_to_decide(history) {
            parts.push(
                "We have heard every angle; I propose we commit to the phased plan and assign owners."
                    .to_string(),
            );
        }

        if let Some(seconds) = context.time_constraint_seconds {
            parts.push(format!(
                "With {} minutes on the clock, let's leave with an owner for each next step.",
                seconds / 60
            ));
        }

        parts.push("Architecture should confirm this scales without new fixed costs.".to_string());
        parts.join(" ")
    }
}

impl Default for StrategistAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CollaborativeAgent for StrategistAgent {
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

        let message_type = if Self::ready_to_decide(history) {
            MessageType::Decision
        } else {
            MessageType::Suggestion
        };

        Ok(Message::new(STRATEGIST_ID, message_type, content)
            .referencing(vec!["architect".to_string()])
            .with_attachment(Attachment {
                kind: AttachmentKind::BusinessMetrics,
                data: json!({
                    "objectives": context.objectives.len(),
                    "constraints": context.constraints.len(),
                    "timeboxMinutes": context.time_constraint_seconds.map(|s| s / 60),
                }),
                metadata: None,
            })
            .with_confidence(CONFIDENCE))
    }

    async fn provide_feedback(&self, _topic: &str, messages: &[Message]) -> Result<AgentFeedback> {
        Ok(self.core.feedback(
            messages,
            vec![
                "Tie every milestone to a business outcome".to_string(),
                "Estimate running costs before committing".to_string(),
            ],
            vec!["Assign an owner to each decision".to_string()],
        ))
    }

    fn analyze_expertise(&self, topic: &str) -> ExpertiseAssessment {
        self.core.assess(topic, CONFIDENCE, RecommendedRole::Observer)
    }

    fn suggest_collaborators(&self, _topic: &str) -> Vec<String> {
        vec![
            "architect".to_string(),
            "analyst".to_string(),
            "engineer".to_string(),
        ]
    }
}
