//! Agent Registry
//!
//! Read-only catalog of the participants a session may include, built once at
//! startup. Insertion order is kept so listings and turn selection are stable.
//!
//! ## Configuration
//!
//! The four built-in roles are always present. An `[agents.<id>]` table with a
//! `model` binds a built-in role to that model (otherwise it runs offline);
//! tables with any other id add a [`ConfigurableAgent`].

use crate::agents::configurable::ConfigurableAgent;
use crate::agents::{builtin_role, CollaborativeAgent, BUILTIN_ROLES};
use crate::llm::{LLMClient, ProviderRegistry};
use crate::types::{AppError, Participant, Result};
use crate::utils::toml_config::{AgentConfig, AgoraConfig};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Registry of participants and their response generators
#[derive(Clone, Default)]
pub struct AgentRegistry {
    order: Vec<String>,
    agents: HashMap<String, Arc<dyn CollaborativeAgent>>,
}

impl AgentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the four built-in roles, all offline
    pub fn with_default_roles() -> Self {
        let mut registry = Self::new();
        for id in BUILTIN_ROLES {
            if let Some(agent) = builtin_role(id, None, None) {
                registry.register(agent);
            }
        }
        registry
    }

    /// Build the registry from TOML configuration
    ///
    /// Creates an LLM client for every role bound to a model.
    pub async fn from_config(config: &AgoraConfig, providers: &ProviderRegistry) -> Result<Self> {
        let mut registry = Self::new();

        for id in BUILTIN_ROLES {
            let agent_config = config.get_agent(id);
            let llm = Self::client_for(id, agent_config, providers).await?;
            let prompt = agent_config.and_then(|c| c.system_prompt.clone());
            if let Some(agent) = builtin_role(id, llm, prompt) {
                registry.register(agent);
            }
        }

        let mut custom: Vec<(&String, &AgentConfig)> = config
            .agents
            .iter()
            .filter(|(id, _)| !BUILTIN_ROLES.contains(&id.as_str()))
            .collect();
        custom.sort_by(|a, b| a.0.cmp(b.0));

        for (id, agent_config) in custom {
            let role = agent_config.custom_role().ok_or_else(|| {
                AppError::Configuration(format!(
                    "Agent '{}' needs role_name, communication_style and primary_focus",
                    id
                ))
            })?;
            let llm = Self::client_for(id, Some(agent_config), providers).await?;
            registry.register(Arc::new(ConfigurableAgent::new(id, role, agent_config, llm)));
        }

        info!(participants = ?registry.ids(), "Agent registry ready");
        Ok(registry)
    }

    async fn client_for(
        id: &str,
        config: Option<&AgentConfig>,
        providers: &ProviderRegistry,
    ) -> Result<Option<Box<dyn LLMClient>>> {
        match config.and_then(|c| c.model.as_deref()) {
            Some(model) => {
                let client = providers.create_client_for_model(model).await?;
                info!(participant = %id, model = %client.model_name(), "Role bound to model");
                Ok(Some(client))
            }
            None => Ok(None),
        }
    }

    /// Register a participant, replacing any previous one with the same id
    pub fn register(&mut self, agent: Arc<dyn CollaborativeAgent>) {
        let id = agent.id().to_string();
        if !self.agents.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.agents.insert(id, agent);
    }

    /// Get the response generator for a participant
    pub fn get_agent(&self, id: &str) -> Option<Arc<dyn CollaborativeAgent>> {
        self.agents.get(id).cloned()
    }

    pub fn has_agent(&self, id: &str) -> bool {
        self.agents.contains_key(id)
    }

    /// Catalog entry for a participant
    pub fn participant(&self, id: &str) -> Option<Participant> {
        self.agents.get(id).map(|a| a.profile().clone())
    }

    /// All catalog entries in registration order
    pub fn participants(&self) -> Vec<Participant> {
        self.order
            .iter()
            .filter_map(|id| self.participant(id))
            .collect()
    }

    /// Participant ids in registration order
    pub fn ids(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Look up every id, failing on the first unknown one
    pub fn resolve(&self, ids: &[String]) -> Result<Vec<Participant>> {
        ids.iter()
            .map(|id| {
                self.participant(id)
                    .ok_or_else(|| AppError::UnknownParticipant(id.clone()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Builder for creating AgentRegistry with fluent API
#[derive(Default)]
pub struct AgentRegistryBuilder {
    include_defaults: bool,
    agents: Vec<Arc<dyn CollaborativeAgent>>,
}

impl AgentRegistryBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the four offline built-in roles
    pub fn with_default_roles(mut self) -> Self {
        self.include_defaults = true;
        self
    }

    /// Add (or replace) a participant
    pub fn with_agent(mut self, agent: Arc<dyn CollaborativeAgent>) -> Self {
        self.agents.push(agent);
        self
    }

    /// Build the AgentRegistry
    pub fn build(self) -> AgentRegistry {
        let mut registry = if self.include_defaults {
            AgentRegistry::with_default_roles()
        } else {
            AgentRegistry::new()
        };
        for agent in self.agents {
            registry.register(agent);
        }
        registry
    }
}
