//! LLM Provider Clients and Abstractions
//!
//! Role adapters that are bound to a model call through [`LLMClient`]:
//! - [`ProviderRegistry`] resolves a configured model to its provider
//! - `ollama` (cargo feature, on by default) talks to a local Ollama server
//! - `openai` talks to any OpenAI-compatible chat completions endpoint

/// Core LLM client trait and provider selection.
pub mod client;
/// Registry for managing named providers and models.
pub mod provider_registry;

#[cfg(feature = "ollama")]
pub mod ollama;

pub mod openai;

pub use client::{LLMClient, Provider, SamplingParams};
pub use provider_registry::ProviderRegistry;
