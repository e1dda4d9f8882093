//! Configuration loading, hot reload and config-driven startup.

use agora::cli::init::{self, InitConfig, InitResult};
use agora::cli::output::Output;
use agora::persistence::jsonl::JsonlTranscriptSink;
use agora::types::MeetingType;
use agora::{AgoraConfig, AgoraConfigManager, AppState};
use serde_json::json;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OFFLINE_CONFIG: &str = r#"
[server]
port = 4200

[collaboration]
consensus_window = 8

[agents.ethicist]
role_name = "Ethics Reviewer"
specializations = ["privacy"]
communication_style = "careful"
primary_focus = "user trust"
affinity = ["consent"]
"#;

#[test]
fn test_manager_loads_and_reloads_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("agora.toml");
    fs::write(&path, OFFLINE_CONFIG).unwrap();

    let manager = AgoraConfigManager::new(&path).expect("config loads");
    assert_eq!(manager.config().server.port, 4200);
    assert_eq!(manager.config().collaboration.consensus_window, 8);
    assert_eq!(
        manager.config().gateway.ended_retention(),
        Duration::from_secs(300)
    );
    assert!(manager.config_path().is_absolute());

    fs::write(&path, OFFLINE_CONFIG.replace("4200", "4300")).unwrap();
    manager.reload().expect("reload succeeds");
    assert_eq!(manager.config().server.port, 4300);
}

#[test]
fn test_invalid_reload_keeps_previous_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("agora.toml");
    fs::write(&path, OFFLINE_CONFIG).unwrap();
    let manager = AgoraConfigManager::new(&path).unwrap();

    fs::write(&path, "[collaboration]\nconsensus_window = 0\n").unwrap();
    assert!(manager.reload().is_err());
    assert_eq!(manager.config().collaboration.consensus_window, 8);
}

#[test]
fn test_missing_file_is_reported() {
    let dir = TempDir::new().unwrap();
    assert!(AgoraConfigManager::new(dir.path().join("absent.toml")).is_err());
}

#[test]
fn test_init_writes_loadable_config() {
    let dir = TempDir::new().unwrap();
    let output = Output::no_color();

    for provider in ["none", "ollama"] {
        let result = init::run(
            InitConfig {
                path: dir.path().to_path_buf(),
                force: true,
                provider: provider.to_string(),
                host: "127.0.0.1".to_string(),
                port: 3005,
            },
            &output,
        );
        assert!(matches!(result, InitResult::Success));

        let config = AgoraConfig::load(dir.path().join("agora.toml")).expect("generated config is valid");
        assert_eq!(config.server.port, 3005);
    }
    assert!(dir.path().join("data/transcripts").is_dir());

    let again = init::run(
        InitConfig {
            path: dir.path().to_path_buf(),
            force: false,
            provider: "none".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3005,
        },
        &output,
    );
    assert!(matches!(again, InitResult::AlreadyExists));
}

#[tokio::test]
async fn test_custom_role_joins_meetings() {
    let config = AgoraConfig::parse(OFFLINE_CONFIG).unwrap();
    let state = AppState::from_config(Arc::new(AgoraConfigManager::from_config(config)))
        .await
        .expect("state builds offline");

    let registry = state.facilitator.registry();
    assert_eq!(registry.len(), 5);
    assert!(registry.has_agent("ethicist"));

    let session_id = state
        .facilitator
        .start_meeting(
            "Consent flows for the new sign-up",
            &["engineer".to_string(), "ethicist".to_string()],
            MeetingType::DesignReview,
            None,
        )
        .await
        .unwrap();

    let snapshot = state.facilitator.snapshot(&session_id).unwrap();
    assert_eq!(snapshot.history.len(), 2);
    assert_eq!(snapshot.history[1].from, "ethicist");
}

#[tokio::test]
async fn test_model_bound_role_and_transcripts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Model-backed idea." } }]
        })))
        .mount(&server)
        .await;

    let transcripts = TempDir::new().unwrap();
    // PATH is always set, so it stands in for an API key variable
    let toml = format!(
        r#"
[persistence]
transcript_dir = "{dir}"

[providers.mock]
type = "openai"
api_key_env = "PATH"
api_base = "{base}/v1"
default_model = "gpt-4o-mini"

[models.fast]
provider = "mock"
model = "gpt-4o-mini"

[agents.strategist]
model = "fast"
"#,
        dir = transcripts.path().display(),
        base = server.uri(),
    );
    let config = AgoraConfig::parse(&toml).expect("config with mocked provider");
    let state = AppState::from_config(Arc::new(AgoraConfigManager::from_config(config)))
        .await
        .unwrap();

    let session_id = state
        .facilitator
        .start_meeting(
            "Pricing",
            &["strategist".to_string()],
            MeetingType::DecisionMaking,
            None,
        )
        .await
        .unwrap();
    let reply = state
        .facilitator
        .request_agent_response(&session_id, "strategist")
        .await
        .unwrap();
    assert_eq!(reply.content, "Model-backed idea.");

    let stored = JsonlTranscriptSink::new(transcripts.path())
        .load(&session_id)
        .await
        .unwrap();
    let authors: Vec<&str> = stored.iter().map(|m| m.from.as_str()).collect();
    assert_eq!(authors, vec!["system", "strategist", "strategist"]);
}
