//! Real-time collaboration core: sessions, turn-taking, consensus and the
//! meeting layer built on top of them.

pub mod bus;
pub mod consensus;
pub mod events;
pub mod facilitator;
pub mod scenarios;
pub mod store;
pub mod turn;

pub use bus::CommunicationBus;
pub use consensus::{ConsensusEvaluator, ConsensusThresholds, LexicalConsensusEvaluator};
pub use events::{BusEvent, MeetingEvent};
pub use facilitator::{FacilitatorSettings, MeetingFacilitator, TurnFailure, UserMessageOutcome};
pub use store::SessionStore;
pub use turn::TurnPolicy;
