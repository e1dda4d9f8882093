//! HTTP gateway tests against the full router.

mod common;

use agora::agents::{AgentRegistry, CollaborativeAgent};
use agora::api::routes::app;
use agora::collaboration::MeetingFacilitator;
use agora::types::{MeetingSnapshot, MeetingState, ParticipantStatus, SessionCreatedResponse};
use agora::{build_facilitator, AgoraConfig, AgoraConfigManager, AppState};
use axum::http::StatusCode;
use axum_test::TestServer;
use common::mocks::{FailingAgent, ScriptedAgent};
use common::registry_with;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn server_and_facilitator(
    config: AgoraConfig,
    registry: Arc<AgentRegistry>,
) -> (TestServer, Arc<MeetingFacilitator>) {
    let facilitator = Arc::new(build_facilitator(&config, registry));
    let state = AppState::new(
        Arc::new(AgoraConfigManager::from_config(config)),
        facilitator.clone(),
    );
    let server = TestServer::new(app(state)).expect("Failed to create test server");
    (server, facilitator)
}

fn server_with(config: AgoraConfig, registry: Arc<AgentRegistry>) -> TestServer {
    server_and_facilitator(config, registry).0
}

fn create_test_server() -> TestServer {
    server_with(
        AgoraConfig::default(),
        Arc::new(AgentRegistry::with_default_roles()),
    )
}

fn scripted_server(agents: Vec<Arc<dyn CollaborativeAgent>>) -> TestServer {
    server_with(AgoraConfig::default(), registry_with(agents))
}

async fn create_meeting(server: &TestServer, topic: &str, participants: &[&str]) -> String {
    let response = server
        .post("/api/meetings")
        .json(&json!({
            "topic": topic,
            "participants": participants,
            "meetingType": "problem_solving",
        }))
        .await;
    response.assert_status_ok();
    response.json::<SessionCreatedResponse>().session_id
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["activeMeetingCount"], 0);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_list_agents() {
    let server = create_test_server();

    let response = server.get("/api/agents").await;

    response.assert_status_ok();
    let body: Vec<Value> = response.json();
    let ids: Vec<&str> = body.iter().filter_map(|p| p["id"].as_str()).collect();
    assert_eq!(ids, vec!["architect", "engineer", "analyst", "strategist"]);
}

#[tokio::test]
async fn test_create_and_get_meeting() {
    let server = create_test_server();
    let session_id = create_meeting(&server, "API redesign", &["architect", "engineer"]).await;
    assert!(session_id.starts_with("session_"));

    let response = server.get(&format!("/api/meetings/{}", session_id)).await;

    response.assert_status_ok();
    let snapshot: MeetingSnapshot = response.json();
    assert_eq!(snapshot.meeting_state.session_id, session_id);
    assert_eq!(snapshot.meeting_state.topic, "API redesign");
    assert!(snapshot.meeting_state.is_active);
    // briefing plus the seeded contribution
    assert_eq!(snapshot.history.len(), 2);
    assert_eq!(snapshot.meeting_state.message_count, 2);

    let active: Vec<MeetingState> = server.get("/api/meetings/active").await.json();
    assert_eq!(active.len(), 1);
}

#[tokio::test]
async fn test_create_meeting_validation() {
    let server = create_test_server();

    let missing_topic = server
        .post("/api/meetings")
        .json(&json!({ "participants": ["architect"] }))
        .await;
    missing_topic.assert_status_bad_request();

    let not_an_array = server
        .post("/api/meetings")
        .json(&json!({ "topic": "Plans", "participants": "architect" }))
        .await;
    not_an_array.assert_status_bad_request();

    let unknown = server
        .post("/api/meetings")
        .json(&json!({ "topic": "Plans", "participants": ["ghost"] }))
        .await;
    unknown.assert_status_bad_request();
    let body: Value = unknown.json();
    assert_eq!(body["cause"], "unknown_participant");

    let malformed = server
        .post("/api/meetings")
        .content_type("application/json")
        .text("{not json")
        .await;
    malformed.assert_status_bad_request();

    let health: Value = server.get("/health").await.json();
    assert_eq!(health["activeMeetingCount"], 0);
}

#[tokio::test]
async fn test_get_unknown_meeting() {
    let server = create_test_server();

    let response = server.get("/api/meetings/session_missing").await;

    response.assert_status_not_found();
    let body: Value = response.json();
    assert_eq!(body["cause"], "session_not_found");
}

#[tokio::test]
async fn test_send_message_directed() {
    let server = scripted_server(vec![
        Arc::new(ScriptedAgent::new("alpha", "Alpha here.")),
        Arc::new(ScriptedAgent::new("beta", "Beta here.")),
    ]);
    let session_id = create_meeting(&server, "Release plan", &["alpha", "beta"]).await;

    let response = server
        .post(&format!("/api/meetings/{}/messages", session_id))
        .json(&json!({ "content": "Beta, your view?", "directTo": ["beta"] }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"]["from"], "user");
    assert_eq!(body["message"]["messageType"], "question");
    assert_eq!(body["responses"][0]["from"], "beta");
    assert_eq!(body["failures"].as_array().map(Vec::len), Some(0));

    let empty = server
        .post(&format!("/api/meetings/{}/messages", session_id))
        .json(&json!({ "content": "  " }))
        .await;
    empty.assert_status_bad_request();
}

#[tokio::test]
async fn test_request_agent_response() {
    let server = scripted_server(vec![
        Arc::new(ScriptedAgent::new("alpha", "Alpha here.")),
        Arc::new(FailingAgent::new("broken")),
    ]);
    let session_id = create_meeting(&server, "Release plan", &["alpha", "broken"]).await;
    let path = format!("/api/meetings/{}/request-response", session_id);

    let ok = server.post(&path).json(&json!({ "agentId": "alpha" })).await;
    ok.assert_status_ok();
    let body: Value = ok.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"]["from"], "alpha");

    let missing = server.post(&path).json(&json!({})).await;
    missing.assert_status_bad_request();

    let unknown = server.post(&path).json(&json!({ "agentId": "ghost" })).await;
    unknown.assert_status_bad_request();

    let failed = server.post(&path).json(&json!({ "agentId": "broken" })).await;
    failed.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = failed.json();
    assert_eq!(body["cause"], "response_generation");
}

#[tokio::test]
async fn test_request_agent_response_times_out() {
    let mut config = AgoraConfig::default();
    config.gateway.request_timeout_secs = 1;
    config.collaboration.seed_first_turn = false;
    let (server, facilitator) = server_and_facilitator(
        config,
        registry_with(vec![Arc::new(
            ScriptedAgent::new("slow", "Eventually.").with_delay(Duration::from_secs(3)),
        )]),
    );
    let session_id = create_meeting(&server, "Patience", &["slow"]).await;
    let path = format!("/api/meetings/{}/request-response", session_id);

    let response = server.post(&path).json(&json!({ "agentId": "slow" })).await;

    response.assert_status(StatusCode::GATEWAY_TIMEOUT);
    let snapshot: MeetingSnapshot = server
        .get(&format!("/api/meetings/{}", session_id))
        .await
        .json();
    assert_eq!(snapshot.history.len(), 1);

    let session = facilitator.bus().session(&session_id).unwrap();
    assert_eq!(
        session.participant("slow").unwrap().status,
        ParticipantStatus::Listening
    );

    // the abandoned turn released the meeting's turn guard
    server
        .post(&path)
        .json(&json!({ "agentId": "slow" }))
        .await
        .assert_status(StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_end_meeting() {
    let server = create_test_server();
    let session_id = create_meeting(&server, "Wrap up", &["strategist"]).await;
    let path = format!("/api/meetings/{}", session_id);

    let response = server.delete(&path).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["success"], true);

    // idempotent
    server.delete(&path).await.assert_status_ok();

    let state: MeetingSnapshot = server.get(&path).await.json();
    assert!(!state.meeting_state.is_active);

    let refused = server
        .post(&format!("{}/request-response", path))
        .json(&json!({ "agentId": "strategist" }))
        .await;
    refused.assert_status(StatusCode::CONFLICT);

    server
        .delete("/api/meetings/session_missing")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_released_meeting_is_gone() {
    let (server, facilitator) = server_and_facilitator(
        AgoraConfig::default(),
        Arc::new(AgentRegistry::with_default_roles()),
    );
    let session_id = create_meeting(&server, "Retro", &["analyst"]).await;
    let path = format!("/api/meetings/{}", session_id);
    server.delete(&path).await.assert_status_ok();
    assert_eq!(facilitator.bus().session_count(), 1);

    assert_eq!(facilitator.release_ended(Duration::ZERO), 1);

    assert_eq!(facilitator.bus().session_count(), 0);
    server.get(&path).await.assert_status_not_found();
    server.delete(&path).await.assert_status_not_found();
}

#[tokio::test]
async fn test_scenarios() {
    let server = create_test_server();

    let list: Vec<Value> = server.get("/api/scenarios").await.json();
    assert_eq!(list.len(), 3);
    assert!(list.iter().all(|s| s["title"].is_string()));

    let response = server.post("/api/scenarios/1/start").await;
    response.assert_status_ok();
    let session_id = response.json::<SessionCreatedResponse>().session_id;

    let snapshot: MeetingSnapshot = server
        .get(&format!("/api/meetings/{}", session_id))
        .await
        .json();
    assert_eq!(
        snapshot.meeting_state.topic,
        list[1]["context"]["topic"].as_str().unwrap_or_default()
    );

    server
        .post("/api/scenarios/7/start")
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn test_openapi_document() {
    let server = create_test_server();

    let response = server.get("/api-docs/openapi.json").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["paths"]["/api/meetings"].is_object());
    assert!(body["paths"]["/health"].is_object());
}
