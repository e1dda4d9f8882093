use crate::agents::prompting::{decapitalize, own_turns, participation, rotate, RoleCore};
use crate::agents::CollaborativeAgent;
use crate::collaboration::consensus::count_in_messages;
use crate::llm::LLMClient;
use crate::types::{
    AgentFeedback, AgentRole, Attachment, AttachmentKind, CollaborationContext,
    ExpertiseAssessment, Message, MessageType, Participant, ParticipantStatus, RecommendedRole,
    Result,
};
use async_trait::async_trait;
use serde_json::json;

pub const ANALYST_ID: &str = "analyst";

const CONFIDENCE: f64 = 0.91;

/// Research and data analytics lead. Validates claims when not leading.
pub struct AnalystAgent {
    core: RoleCore,
}

impl AnalystAgent {
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
            id: ANALYST_ID.to_string(),
            role: AgentRole {
                name: "Research & Data Analytics Lead".to_string(),
                specializations: vec![
                    "statistical_analysis".to_string(),
                    "experimental_design".to_string(),
                    "data_science".to_string(),
                    "research_methodology".to_string(),
                ],
                communication_style: "evidence-based, methodical".to_string(),
                primary_focus: "measurable outcomes".to_string(),
            },
            status: ParticipantStatus::Listening,
            expertise_tags: vec![
                "analytics".to_string(),
                "research".to_string(),
                "experimentation".to_string(),
            ],
            affinity_keywords: vec![
                "data".to_string(),
                "analysis".to_string(),
                "research".to_string(),
                "experiment".to_string(),
                "metric".to_string(),
                "statistic".to_string(),
            ],
        }
    }

    fn default_system_prompt() -> String {
        r#"You are the Research and Data Analytics Lead in a live planning meeting.
Ground the discussion in evidence: propose measures of success, experiments and the data needed to decide.
Point out when a claim has not been tested yet."#
            .to_string()
    }

    fn compose_offline(&self, context: &CollaborationContext, history: &[Message]) -> String {
        let (contributions, speakers) = participation(history);
        let level = count_in_messages(history).agreement_level();

        let mut parts = vec![format!(
            "Looking at the discussion so far ({} contributions from {} participants),",
            contributions, speakers
        )];

        if contributions < 2 {
            parts.push("it is too early to read a direction from it.".to_string());
        } else if level >= 0.7 {
            parts.push("the signals line up, so we should fix success measures now.".to_string());
        } else if level < 0.5 {
            parts.push(
                "positions still diverge; a small A/B experiment would settle it before we commit."
                    .to_string(),
            );
        } else {
            parts.push("we are partly aligned and need sharper evidence.".to_string());
        }

        let turn = own_turns(history, ANALYST_ID);
        if let Some(objective) = rotate(&context.objectives, turn) {
            parts.push(format!(
                "Proposed measure: track progress on {} with a baseline taken before launch.",
                decapitalize(objective)
            ));
        }

        parts.push("I'd like the business view on which outcome matters most.".to_string());
        parts.join(" ")
    }
}

impl Default for AnalystAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CollaborativeAgent for AnalystAgent {
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

        let (contributions, speakers) = participation(history);
        let agreement_signal = count_in_messages(history).agreement_level();

        Ok(Message::new(ANALYST_ID, MessageType::Analysis, content)
            .referencing(vec!["strategist".to_string()])
            .with_attachment(Attachment {
                kind: AttachmentKind::StatisticalAnalysis,
                data: json!({
                    "contributions": contributions,
                    "distinctSpeakers": speakers,
                    "agreementSignal": agreement_signal,
                }),
                metadata: Some(json!({ "method": "lexical marker count" })),
            })
            .with_confidence(CONFIDENCE))
    }

    async fn provide_feedback(&self, _topic: &str, messages: &[Message]) -> Result<AgentFeedback> {
        Ok(self.core.feedback(
            messages,
            vec![
                "Agree on success metrics before building".to_string(),
                "Take a baseline measurement now".to_string(),
            ],
            vec!["Design a validation experiment".to_string()],
        ))
    }

    fn analyze_expertise(&self, topic: &str) -> ExpertiseAssessment {
        self.core.assess(topic, CONFIDENCE, RecommendedRole::Validator)
    }

    fn suggest_collaborators(&self, topic: &str) -> Vec<String> {
        let topic = topic.to_lowercase();
        if topic.contains("business") || topic.contains("market") {
            vec!["strategist".to_string(), "engineer".to_string()]
        } else {
            vec!["engineer".to_string(), "architect".to_string()]
        }
    }
}
