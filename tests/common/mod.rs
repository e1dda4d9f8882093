#![allow(dead_code)]

pub mod mocks;

use agora::agents::{AgentRegistry, AgentRegistryBuilder, CollaborativeAgent};
use agora::collaboration::MeetingFacilitator;
use std::sync::Arc;

/// Registry holding exactly the given participants.
pub fn registry_with(agents: Vec<Arc<dyn CollaborativeAgent>>) -> Arc<AgentRegistry> {
    let builder = agents
        .into_iter()
        .fold(AgentRegistryBuilder::new(), |builder, agent| {
            builder.with_agent(agent)
        });
    Arc::new(builder.build())
}

/// Facilitator over the shipped roles, all running offline.
pub fn offline_facilitator() -> Arc<MeetingFacilitator> {
    Arc::new(MeetingFacilitator::with_registry(Arc::new(
        AgentRegistry::with_default_roles(),
    )))
}
