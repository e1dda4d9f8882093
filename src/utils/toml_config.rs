//! TOML-based configuration for Agora
//!
//! This module provides declarative configuration for the HTTP/WebSocket
//! server, the collaboration thresholds, LLM providers and models, and the
//! participant roles via a TOML file (`agora.toml`).
//!
//! # Hot Reloading
//!
//! Configuration changes are detected and applied at runtime when the watcher
//! is started. Use `AgoraConfigManager` for thread-safe access to the current
//! configuration. Collaboration thresholds are bound when the facilitator is
//! built; only gateway settings are read live.

use crate::agents::BUILTIN_ROLES;
use crate::types::AgentRole;
use arc_swap::ArcSwap;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Root configuration structure loaded from agora.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgoraConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub collaboration: CollaborationConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Named LLM provider configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Named model configurations
    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,

    /// Participant bindings and additional roles, keyed by participant id
    #[serde(default)]
    pub agents: HashMap<String, AgentConfig>,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

// ============= Collaboration Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborationConfig {
    /// How many trailing messages the consensus evaluator looks at
    #[serde(default = "default_consensus_window")]
    pub consensus_window: usize,

    #[serde(default = "default_convergence_threshold")]
    pub convergence_threshold: f64,

    #[serde(default = "default_disagreement_threshold")]
    pub disagreement_threshold: f64,

    #[serde(default = "default_implementation_threshold")]
    pub implementation_threshold: f64,

    /// Minimum agreement change before a consensus update is published
    #[serde(default = "default_consensus_epsilon")]
    pub consensus_epsilon: f64,

    /// Meeting consensus status thresholds (achieved / disagreement)
    #[serde(default = "default_achieved_threshold")]
    pub achieved_threshold: f64,

    #[serde(default = "default_disagreement_status_threshold")]
    pub disagreement_status_threshold: f64,

    /// Coordination role used when no referenced or topic-affine speaker exists
    #[serde(default = "default_participant")]
    pub default_participant: Option<String>,

    /// Whether starting a meeting immediately requests the first contribution
    #[serde(default = "default_true")]
    pub seed_first_turn: bool,
}

fn default_consensus_window() -> usize {
    10
}

fn default_convergence_threshold() -> f64 {
    0.7
}

fn default_disagreement_threshold() -> f64 {
    0.5
}

fn default_implementation_threshold() -> f64 {
    0.8
}

fn default_consensus_epsilon() -> f64 {
    0.01
}

fn default_achieved_threshold() -> f64 {
    0.8
}

fn default_disagreement_status_threshold() -> f64 {
    0.4
}

fn default_participant() -> Option<String> {
    Some("engineer".to_string())
}

fn default_true() -> bool {
    true
}

impl Default for CollaborationConfig {
    fn default() -> Self {
        Self {
            consensus_window: default_consensus_window(),
            convergence_threshold: default_convergence_threshold(),
            disagreement_threshold: default_disagreement_threshold(),
            implementation_threshold: default_implementation_threshold(),
            consensus_epsilon: default_consensus_epsilon(),
            achieved_threshold: default_achieved_threshold(),
            disagreement_status_threshold: default_disagreement_status_threshold(),
            default_participant: default_participant(),
            seed_first_turn: true,
        }
    }
}

// ============= Gateway Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Requests for an agent response are dropped after this many seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Capacity of the meeting event broadcast channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Ended meetings stay readable this long before they are released
    #[serde(default = "default_ended_retention")]
    pub ended_retention_secs: u64,
}

fn default_request_timeout() -> u64 {
    60
}

fn default_event_buffer() -> usize {
    256
}

fn default_ended_retention() -> u64 {
    300
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            event_buffer: default_event_buffer(),
            ended_retention_secs: default_ended_retention(),
        }
    }
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn ended_retention(&self) -> Duration {
        Duration::from_secs(self.ended_retention_secs)
    }
}

// ============= Persistence Configuration =============

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Directory receiving one JSONL transcript per session
    #[serde(default)]
    pub transcript_dir: Option<PathBuf>,
}

// ============= Provider Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        default_model: String,
    },
    OpenAI {
        /// Environment variable containing API key
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        default_model: String,
    },
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

// ============= Model Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Reference to a provider name defined in [providers]
    pub provider: String,

    /// Model name/identifier to use with the provider
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_model_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_model_max_tokens() -> u32 {
    512
}

// ============= Agent Configuration =============

/// Binding for one participant id.
///
/// For the built-in roles only `model` and `system_prompt` matter. Any other
/// id must carry a complete role description (`role_name`,
/// `communication_style`, `primary_focus`) and becomes a configurable role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Reference to a model name defined in [models]; offline when absent
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub system_prompt: Option<String>,

    #[serde(default)]
    pub role_name: Option<String>,

    #[serde(default)]
    pub specializations: Vec<String>,

    #[serde(default)]
    pub communication_style: Option<String>,

    #[serde(default)]
    pub primary_focus: Option<String>,

    /// Topic keywords that make this participant the natural next speaker
    #[serde(default)]
    pub affinity: Vec<String>,

    #[serde(default)]
    pub expertise_tags: Vec<String>,
}

impl AgentConfig {
    /// The role described by this entry, if every required field is present.
    pub fn custom_role(&self) -> Option<AgentRole> {
        match (&self.role_name, &self.communication_style, &self.primary_focus) {
            (Some(name), Some(style), Some(focus)) => Some(AgentRole {
                name: name.clone(),
                specializations: self.specializations.clone(),
                communication_style: style.clone(),
                primary_focus: focus.clone(),
            }),
            _ => None,
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Configuration warnings that don't prevent operation but may indicate issues
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub kind: ConfigWarningKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarningKind {
    UnusedProvider,
    UnusedModel,
    UnknownDefaultParticipant,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    #[error("Provider '{0}' referenced by model '{1}' does not exist")]
    MissingProvider(String, String),

    #[error("Model '{0}' referenced by agent '{1}' does not exist")]
    MissingModel(String, String),

    #[error("Agent '{0}' is not a built-in role and lacks role_name, communication_style or primary_focus")]
    IncompleteRole(String),

    #[error("Watch error: {0}")]
    WatchError(#[from] notify::Error),
}

impl AgoraConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: AgoraConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for internal consistency and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_collaboration()?;

        if self.gateway.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.request_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.gateway.event_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.event_buffer must be greater than zero".into(),
            ));
        }

        for provider in self.providers.values() {
            if let ProviderConfig::OpenAI { api_key_env, .. } = provider {
                self.validate_env_var(api_key_env)?;
            }
        }

        // Validate model -> provider references
        for (model_name, model_config) in &self.models {
            if !self.providers.contains_key(&model_config.provider) {
                return Err(ConfigError::MissingProvider(
                    model_config.provider.clone(),
                    model_name.clone(),
                ));
            }
        }

        // Validate agent -> model references and custom role completeness
        for (agent_name, agent_config) in &self.agents {
            if let Some(model) = &agent_config.model {
                if !self.models.contains_key(model) {
                    return Err(ConfigError::MissingModel(model.clone(), agent_name.clone()));
                }
            }

            let builtin = BUILTIN_ROLES.contains(&agent_name.as_str());
            if !builtin && agent_config.custom_role().is_none() {
                return Err(ConfigError::IncompleteRole(agent_name.clone()));
            }
        }

        Ok(())
    }

    fn validate_collaboration(&self) -> Result<(), ConfigError> {
        let c = &self.collaboration;

        if c.consensus_window == 0 {
            return Err(ConfigError::ValidationError(
                "collaboration.consensus_window must be greater than zero".into(),
            ));
        }

        let thresholds = [
            ("convergence_threshold", c.convergence_threshold),
            ("disagreement_threshold", c.disagreement_threshold),
            ("implementation_threshold", c.implementation_threshold),
            ("consensus_epsilon", c.consensus_epsilon),
            ("achieved_threshold", c.achieved_threshold),
            ("disagreement_status_threshold", c.disagreement_status_threshold),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "collaboration.{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if c.disagreement_threshold > c.convergence_threshold {
            return Err(ConfigError::ValidationError(
                "collaboration.disagreement_threshold must not exceed convergence_threshold".into(),
            ));
        }
        if c.disagreement_status_threshold > c.achieved_threshold {
            return Err(ConfigError::ValidationError(
                "collaboration.disagreement_status_threshold must not exceed achieved_threshold"
                    .into(),
            ));
        }

        Ok(())
    }

    /// Validate configuration with warnings for unused items
    ///
    /// Returns Ok with warnings, or Err if validation fails
    pub fn validate_with_warnings(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        self.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(self.check_unused_providers());
        warnings.extend(self.check_unused_models());
        warnings.extend(self.check_default_participant());

        Ok(warnings)
    }

    /// Check for providers that aren't referenced by any model
    fn check_unused_providers(&self) -> Vec<ConfigWarning> {
        let referenced: HashSet<_> = self.models.values().map(|m| m.provider.as_str()).collect();

        self.providers
            .keys()
            .filter(|name| !referenced.contains(name.as_str()))
            .map(|name| ConfigWarning {
                kind: ConfigWarningKind::UnusedProvider,
                message: format!(
                    "Provider '{}' is defined but not referenced by any model",
                    name
                ),
            })
            .collect()
    }

    /// Check for models that aren't bound to any agent
    fn check_unused_models(&self) -> Vec<ConfigWarning> {
        let referenced: HashSet<_> = self
            .agents
            .values()
            .filter_map(|a| a.model.as_deref())
            .collect();

        self.models
            .keys()
            .filter(|name| !referenced.contains(name.as_str()))
            .map(|name| ConfigWarning {
                kind: ConfigWarningKind::UnusedModel,
                message: format!("Model '{}' is defined but not bound to any agent", name),
            })
            .collect()
    }

    fn check_default_participant(&self) -> Option<ConfigWarning> {
        let id = self.collaboration.default_participant.as_deref()?;
        if BUILTIN_ROLES.contains(&id) || self.agents.contains_key(id) {
            return None;
        }
        Some(ConfigWarning {
            kind: ConfigWarningKind::UnknownDefaultParticipant,
            message: format!(
                "Default participant '{}' is not a registered role; turn selection will have no fallback",
                id
            ),
        })
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        Ok(())
    }

    /// Get a resolved value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok()
    }

    /// Get provider by name
    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// Get model by name
    pub fn get_model(&self, name: &str) -> Option<&ModelConfig> {
        self.models.get(name)
    }

    /// Get agent config by name
    pub fn get_agent(&self, name: &str) -> Option<&AgentConfig> {
        self.agents.get(name)
    }

    /// Address the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// ============= Hot Reloading Configuration Manager =============

/// Thread-safe configuration manager with hot reloading support
pub struct AgoraConfigManager {
    config: Arc<ArcSwap<AgoraConfig>>,
    config_path: PathBuf,
    watcher: RwLock<Option<RecommendedWatcher>>,
}

impl AgoraConfigManager {
    /// Create a new configuration manager and load the initial config
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        // Absolute path for reliable file watching
        let path = path.as_ref();
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(ConfigError::ReadError)?
                .join(path)
        };

        let config = AgoraConfig::load(&path)?;

        Ok(Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: path,
            watcher: RwLock::new(None),
        })
    }

    /// Create a config manager directly from a config (useful for testing)
    /// This won't have file watching capabilities.
    pub fn from_config(config: AgoraConfig) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: PathBuf::from("agora.toml"),
            watcher: RwLock::new(None),
        }
    }

    /// Get the current configuration (lockless read)
    pub fn config(&self) -> Arc<AgoraConfig> {
        self.config.load_full()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Manually reload the configuration from disk
    pub fn reload(&self) -> Result<(), ConfigError> {
        info!("Reloading configuration from {:?}", self.config_path);

        let new_config = AgoraConfig::load(&self.config_path)?;
        self.config.store(Arc::new(new_config));

        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Start watching for configuration file changes
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_watching(&self) -> Result<(), ConfigError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        let config_path = self.config_path.clone();
        let config_arc = Arc::clone(&self.config);
        let file_name = self.config_path.file_name().map(|n| n.to_os_string());

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    let touches_config = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if touches_config && (event.kind.is_modify() || event.kind.is_create()) {
                        // Debounced in the receiver
                        let _ = tx.send(());
                    }
                }
                Err(e) => {
                    error!("Config watcher error: {:?}", e);
                }
            }
        })?;

        // Watch the parent directory so editors that replace the file are seen
        if let Some(parent) = self.config_path.parent() {
            watcher.watch(parent, RecursiveMode::NonRecursive)?;
        }

        *self.watcher.write() = Some(watcher);

        tokio::spawn(async move {
            let mut last_reload: Option<std::time::Instant> = None;
            let debounce_duration = Duration::from_millis(500);

            while rx.recv().await.is_some() {
                if last_reload.is_some_and(|at| at.elapsed() < debounce_duration) {
                    continue;
                }

                // Wait a bit for the write to complete
                tokio::time::sleep(Duration::from_millis(100)).await;

                match AgoraConfig::load(&config_path) {
                    Ok(new_config) => {
                        config_arc.store(Arc::new(new_config));
                        info!("Configuration hot-reloaded successfully");
                        last_reload = Some(std::time::Instant::now());
                    }
                    Err(e) => {
                        warn!(
                            "Failed to hot-reload config: {}. Keeping previous config.",
                            e
                        );
                    }
                }
            }
        });

        info!("Configuration hot-reload watcher started");
        Ok(())
    }

    /// Stop watching for configuration changes
    pub fn stop_watching(&self) {
        *self.watcher.write() = None;
        info!("Configuration hot-reload watcher stopped");
    }
}

impl Clone for AgoraConfigManager {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            config_path: self.config_path.clone(),
            watcher: RwLock::new(None), // Watcher is not cloned
        }
    }
}
