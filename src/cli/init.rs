//! Init command implementation
//!
//! Writes a starter `agora.toml` (plus `.env.example` and `.gitignore`).

use super::output::Output;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// agora.toml already exists
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
    /// LLM provider to configure (none, ollama or openai)
    pub provider: String,
    /// Host address for the server
    pub host: String,
    /// Port for the server
    pub port: u16,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing Agora");

    let base_path = &config.path;
    let config_path = base_path.join("agora.toml");
    if config_path.exists() && !config.force {
        output.warning("agora.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    if let Err(e) = fs::create_dir_all(base_path.join("data/transcripts")) {
        output.error(&format!("Failed to create data/transcripts: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("directory", "data/transcripts");

    if let Err(e) = write_file(&config_path, &generate_agora_toml(&config), config.force) {
        output.error(&format!("Failed to create agora.toml: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", "agora.toml");

    if config.provider == "openai" {
        let env_path = base_path.join(".env.example");
        if let Err(e) = write_file(&env_path, ENV_EXAMPLE, config.force) {
            output.error(&format!("Failed to create .env.example: {}", e));
            return InitResult::Error(e.to_string());
        }
        output.created("env", ".env.example");
    }

    let gitignore_path = base_path.join(".gitignore");
    if gitignore_path.exists() {
        output.skipped(".gitignore", "already exists");
    } else if let Err(e) = write_file(&gitignore_path, GITIGNORE, false) {
        output.warning(&format!("Failed to create .gitignore: {}", e));
    } else {
        output.created("file", ".gitignore");
    }

    output.success("Agora initialized");
    output.header("Next Steps");
    match config.provider.as_str() {
        "ollama" => {
            output.info("Start Ollama (if not running):");
            output.command("ollama serve");
            output.command("ollama pull llama3.2:3b");
        }
        "openai" => {
            output.info("Set your API key:");
            output.command("cp .env.example .env");
        }
        _ => output.info("Roles run offline until [agents.<id>] entries name a model"),
    }
    output.info("Start the server:");
    output.command("agora-server");
    output.hint(&format!(
        "WebSocket endpoint: ws://{}:{}/ws",
        config.host, config.port
    ));

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

const ENV_EXAMPLE: &str = "# API key for the [providers.openai] entry in agora.toml\nOPENAI_API_KEY=\n";

const GITIGNORE: &str = "/target\n.env\ndata/\n";

fn generate_agora_toml(config: &InitConfig) -> String {
    let llm_section = match config.provider.as_str() {
        "ollama" => {
            r#"
[providers.ollama-local]
type = "ollama"
base_url = "http://localhost:11434"
default_model = "llama3.2:3b"

[models.local]
provider = "ollama-local"
model = "llama3.2:3b"
temperature = 0.7
max_tokens = 512

[agents.architect]
model = "local"

[agents.engineer]
model = "local"

[agents.analyst]
model = "local"

[agents.strategist]
model = "local"
"#
        }
        "openai" => {
            r#"
[providers.openai]
type = "openai"
api_key_env = "OPENAI_API_KEY"
api_base = "https://api.openai.com/v1"
default_model = "gpt-4o-mini"

[models.remote]
provider = "openai"
model = "gpt-4o-mini"
temperature = 0.7
max_tokens = 512

[agents.architect]
model = "remote"

[agents.engineer]
model = "remote"

[agents.analyst]
model = "remote"

[agents.strategist]
model = "remote"
"#
        }
        _ => {
            r#"
# Roles compose their replies offline. To bind a role to a model, add a
# [providers.<name>] and [models.<name>] entry and set [agents.<id>] model.
"#
        }
    };

    format!(
        r#"# Agora configuration

[server]
host = "{host}"
port = {port}
log_level = "info"
log_format = "pretty"

[collaboration]
consensus_window = 10
convergence_threshold = 0.7
disagreement_threshold = 0.5
implementation_threshold = 0.8
consensus_epsilon = 0.01
achieved_threshold = 0.8
disagreement_status_threshold = 0.4
default_participant = "engineer"
seed_first_turn = true

[gateway]
request_timeout_secs = 60
event_buffer = 256
ended_retention_secs = 300

[persistence]
transcript_dir = "data/transcripts"
{llm_section}"#,
        host = config.host,
        port = config.port,
        llm_section = llm_section,
    )
}
