//! Durable transcripts.
//!
//! A sink receives every message appended by the facilitator. Sinks are best
//! effort: a failing sink is logged and never affects the turn.

pub mod jsonl;

pub use jsonl::JsonlTranscriptSink;

use crate::types::{Message, Result};
use async_trait::async_trait;

#[async_trait]
pub trait TranscriptSink: Send + Sync {
    /// Persist one message of a session
    async fn record(&self, session_id: &str, message: &Message) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTranscriptSink;

#[async_trait]
impl TranscriptSink for NullTranscriptSink {
    async fn record(&self, _session_id: &str, _message: &Message) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "null"
    }
}
