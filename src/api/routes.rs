use crate::api::docs::ApiDoc;
use crate::api::handlers::{agents, health, meetings, scenarios, ws};
use crate::AppState;
use axum::{
    http::Method,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

/// Routes under `/api`.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(
            "/meetings",
            get(meetings::list_active_meetings).post(meetings::create_meeting),
        )
        .route("/meetings/active", get(meetings::list_active_meetings))
        .route(
            "/meetings/{session_id}",
            get(meetings::get_meeting).delete(meetings::end_meeting),
        )
        .route(
            "/meetings/{session_id}/messages",
            post(meetings::send_message),
        )
        .route(
            "/meetings/{session_id}/request-response",
            post(meetings::request_agent_response),
        )
        .route("/scenarios", get(scenarios::list_scenarios))
        .route(
            "/scenarios/{index}/start",
            post(scenarios::start_scenario),
        )
        .route("/agents", get(agents::list_agents))
}

/// The complete application: REST, WebSocket, health, docs and middleware.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    let router = Router::new()
        .nest("/api", create_router())
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health::health_check))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/swagger.json", ApiDoc::openapi()),
    );

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
