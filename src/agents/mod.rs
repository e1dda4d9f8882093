pub mod analyst;
pub mod architect;
pub mod configurable;
pub mod engineer;
pub mod prompting;
pub mod registry;
pub mod strategist;

use crate::llm::LLMClient;
use crate::types::{
    AgentFeedback, CollaborationContext, ExpertiseAssessment, Message, Participant, Result,
};
use async_trait::async_trait;
use std::sync::Arc;

// Re-export commonly used types
pub use analyst::AnalystAgent;
pub use architect::ArchitectAgent;
pub use configurable::ConfigurableAgent;
pub use engineer::EngineerAgent;
pub use registry::{AgentRegistry, AgentRegistryBuilder};
pub use strategist::StrategistAgent;

/// Ids of the roles that ship with the server, in catalog order.
pub const BUILTIN_ROLES: [&str; 4] = ["architect", "engineer", "analyst", "strategist"];

/// Capability contract every participant implements.
///
/// The coordinator only ever calls through this trait; it never needs to know
/// which role it is talking to or how many roles exist.
#[async_trait]
pub trait CollaborativeAgent: Send + Sync {
    /// Catalog entry describing this participant
    fn profile(&self) -> &Participant;

    fn id(&self) -> &str {
        &self.profile().id
    }

    /// Produce the next contribution given the session context and full history
    async fn generate_response(
        &self,
        context: &CollaborationContext,
        history: &[Message],
    ) -> Result<Message>;

    /// Assess a stretch of conversation from this role's point of view
    async fn provide_feedback(&self, topic: &str, messages: &[Message]) -> Result<AgentFeedback>;

    /// How relevant this role is to a topic, and which part it should play
    fn analyze_expertise(&self, topic: &str) -> ExpertiseAssessment;

    /// Participant ids this role would like to hear from on a topic
    fn suggest_collaborators(&self, topic: &str) -> Vec<String>;
}

/// Build one of the shipped roles by id.
///
/// With an LLM client the role prompts the model; without one it composes its
/// replies offline from its profile and the conversation.
pub fn builtin_role(
    id: &str,
    llm: Option<Box<dyn LLMClient>>,
    system_prompt: Option<String>,
) -> Option<Arc<dyn CollaborativeAgent>> {
    let agent: Arc<dyn CollaborativeAgent> = match id {
        "architect" => Arc::new(ArchitectAgent::with_llm(llm, system_prompt)),
        "engineer" => Arc::new(EngineerAgent::with_llm(llm, system_prompt)),
        "analyst" => Arc::new(AnalystAgent::with_llm(llm, system_prompt)),
        "strategist" => Arc::new(StrategistAgent::with_llm(llm, system_prompt)),
        _ => return None,
    };
    Some(agent)
}
