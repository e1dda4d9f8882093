//! Provider Registry for managing multiple LLM providers
//!
//! Holds the named `[providers.*]` and `[models.*]` tables from `agora.toml`
//! and resolves a model name through its provider into a ready client.

use crate::llm::client::{LLMClient, Provider, SamplingParams};
use crate::types::{AppError, Result};
use crate::utils::toml_config::{AgoraConfig, ModelConfig, ProviderConfig};
use std::collections::HashMap;

/// Registry for managing multiple named LLM providers
pub struct ProviderRegistry {
    /// Provider configurations keyed by name
    providers: HashMap<String, ProviderConfig>,
    /// Model configurations keyed by name
    models: HashMap<String, ModelConfig>,
}

impl ProviderRegistry {
    /// Create a new empty provider registry
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            models: HashMap::new(),
        }
    }

    /// Create a provider registry from TOML configuration
    pub fn from_config(config: &AgoraConfig) -> Self {
        Self {
            providers: config.providers.clone(),
            models: config.models.clone(),
        }
    }

    /// Register a provider configuration
    pub fn register_provider(&mut self, name: &str, config: ProviderConfig) {
        self.providers.insert(name.to_string(), config);
    }

    /// Register a model configuration
    pub fn register_model(&mut self, name: &str, config: ModelConfig) {
        self.models.insert(name.to_string(), config);
    }

    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    pub fn get_model(&self, name: &str) -> Option<&ModelConfig> {
        self.models.get(name)
    }

    /// Get all model names, sorted
    pub fn model_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.models.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn has_model(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Resolve the model -> provider chain without creating a client
    pub fn resolve(&self, model_name: &str) -> Result<Provider> {
        let model_config = self.get_model(model_name).ok_or_else(|| {
            AppError::Configuration(format!("Model '{}' not found in configuration", model_name))
        })?;

        let provider_config = self.get_provider(&model_config.provider).ok_or_else(|| {
            AppError::Configuration(format!(
                "Provider '{}' referenced by model '{}' not found",
                model_config.provider, model_name
            ))
        })?;

        Provider::from_model_config(model_config, provider_config)
    }

    /// Create an LLM client for a specific model by name
    pub async fn create_client_for_model(&self, model_name: &str) -> Result<Box<dyn LLMClient>> {
        self.resolve(model_name)?.create_client().await
    }

    /// Create an LLM client for a provider using its default model
    pub async fn create_client_for_provider(
        &self,
        provider_name: &str,
    ) -> Result<Box<dyn LLMClient>> {
        let provider_config = self.get_provider(provider_name).ok_or_else(|| {
            AppError::Configuration(format!(
                "Provider '{}' not found in configuration",
                provider_name
            ))
        })?;

        Provider::from_config(provider_config, None, SamplingParams::default())?
            .create_client()
            .await
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_registry() -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        registry.register_provider(
            "ollama-local",
            ProviderConfig::Ollama {
                base_url: "http://localhost:11434".to_string(),
                default_model: "ministral-3:3b".to_string(),
            },
        );
        registry.register_model(
            "fast",
            ModelConfig {
                provider: "ollama-local".to_string(),
                model: "granite4:tiny-h".to_string(),
                temperature: 0.3,
                max_tokens: 256,
            },
        );
        registry.register_model(
            "orphan",
            ModelConfig {
                provider: "missing".to_string(),
                model: "x".to_string(),
                temperature: 0.7,
                max_tokens: 512,
            },
        );
        registry
    }

    #[test]
    fn test_resolve_model_to_provider() {
        let registry = create_test_registry();
        let provider = registry.resolve("fast").unwrap();
        assert_eq!(provider.name(), "Ollama");
        assert_eq!(provider.model(), "granite4:tiny-h");
    }

    #[test]
    fn test_resolve_unknown_model() {
        let registry = create_test_registry();
        assert!(matches!(
            registry.resolve("nope"),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn test_resolve_missing_provider() {
        let registry = create_test_registry();
        let err = registry.resolve("orphan").unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_model_names_sorted() {
        let registry = create_test_registry();
        assert_eq!(registry.model_names(), vec!["fast", "orphan"]);
        assert!(registry.has_model("fast"));
    }

    #[tokio::test]
    async fn test_create_client_for_unknown_provider() {
        let registry = create_test_registry();
        let result = registry.create_client_for_provider("nope").await;
        assert!(result.is_err());
    }
}
