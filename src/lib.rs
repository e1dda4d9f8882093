//! # Agora - real-time multi-agent collaboration server
//!
//! Agora hosts structured, turn-taking meetings between expert AI roles. Each
//! meeting has a fixed set of participants and a shared topic; contributions
//! are broadcast live to observers and a running consensus estimate tracks
//! how far the participants agree.
//!
//! ## Overview
//!
//! Agora can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `agora-server` binary
//! 2. **As a library** - Embed the coordinator in your own service
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use agora::agents::AgentRegistry;
//! use agora::collaboration::MeetingFacilitator;
//! use agora::types::MeetingType;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> agora::Result<()> {
//!     let registry = Arc::new(AgentRegistry::with_default_roles());
//!     let facilitator = MeetingFacilitator::with_registry(registry);
//!
//!     let participants = vec!["architect".to_string(), "engineer".to_string()];
//!     let session_id = facilitator
//!         .start_meeting("API redesign", &participants, MeetingType::DesignReview, None)
//!         .await?;
//!
//!     facilitator.request_agent_response(&session_id, "architect").await?;
//!     println!("{:?}", facilitator.meeting_state(&session_id)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama local inference (default) |
//! | `swagger-ui` | Interactive API docs at `/swagger-ui` |
//!
//! OpenAI-compatible endpoints are always available.
//!
//! ## Modules
//!
//! - [`agents`] - Participant roles and the agent registry
//! - [`collaboration`] - Bus, turn policy, consensus and the meeting facilitator
//! - [`api`] - REST and WebSocket gateway
//! - [`llm`] - LLM client implementations
//! - [`persistence`] - Transcript sinks
//! - [`types`] - Data model and error handling

#![cfg_attr(docsrs, feature(doc_cfg))]

/// Participant roles and the agent registry.
pub mod agents;
/// HTTP and WebSocket gateway.
pub mod api;
/// Command-line interface.
pub mod cli;
/// Sessions, turn-taking, consensus and meetings.
pub mod collaboration;
/// LLM provider clients and abstractions.
pub mod llm;
/// Durable meeting transcripts.
pub mod persistence;
/// Core types (data model, requests, responses, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use agents::{AgentRegistry, AgentRegistryBuilder, CollaborativeAgent};
pub use collaboration::{CommunicationBus, MeetingFacilitator};
pub use llm::{LLMClient, Provider, ProviderRegistry};
pub use types::{AppError, Result};
pub use utils::toml_config::{AgoraConfig, AgoraConfigManager};

use crate::collaboration::{
    ConsensusThresholds, FacilitatorSettings, LexicalConsensusEvaluator, TurnPolicy,
};
use crate::persistence::{JsonlTranscriptSink, NullTranscriptSink, TranscriptSink};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// TOML configuration with hot-reload support
    pub config_manager: Arc<AgoraConfigManager>,
    /// Meeting facilitator shared by the REST and WebSocket faces
    pub facilitator: Arc<MeetingFacilitator>,
}

impl AppState {
    pub fn new(config_manager: Arc<AgoraConfigManager>, facilitator: Arc<MeetingFacilitator>) -> Self {
        Self {
            config_manager,
            facilitator,
        }
    }

    /// Build the full state from configuration: providers, roles and the
    /// facilitator.
    pub async fn from_config(config_manager: Arc<AgoraConfigManager>) -> Result<Self> {
        let config = config_manager.config();
        let providers = ProviderRegistry::from_config(&config);
        let registry = AgentRegistry::from_config(&config, &providers).await?;
        let facilitator = build_facilitator(&config, Arc::new(registry));
        Ok(Self::new(config_manager, Arc::new(facilitator)))
    }
}

/// Wire a facilitator from the collaboration, gateway and persistence settings.
pub fn build_facilitator(config: &AgoraConfig, registry: Arc<AgentRegistry>) -> MeetingFacilitator {
    let evaluator = LexicalConsensusEvaluator::new(ConsensusThresholds::from(&config.collaboration));
    let policy = TurnPolicy::new(config.collaboration.default_participant.clone());
    let bus = CommunicationBus::new(
        registry,
        Arc::new(evaluator),
        policy,
        config.gateway.event_buffer,
    );

    let sink: Arc<dyn TranscriptSink> = match &config.persistence.transcript_dir {
        Some(dir) => Arc::new(JsonlTranscriptSink::new(dir.clone())),
        None => Arc::new(NullTranscriptSink),
    };

    MeetingFacilitator::new(
        Arc::new(bus),
        FacilitatorSettings::from(&config.collaboration),
        sink,
        config.gateway.event_buffer,
    )
}
