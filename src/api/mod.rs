//! HTTP and WebSocket gateway
//!
//! Both faces call through the same [`MeetingFacilitator`](crate::collaboration::MeetingFacilitator),
//! so a change made through one is immediately visible through the other.
//!
//! # REST Endpoints
//!
//! - `GET /api/meetings`, `GET /api/meetings/active` - Active meetings
//! - `POST /api/meetings` - Start a meeting
//! - `GET /api/meetings/{id}` - Meeting state and history
//! - `DELETE /api/meetings/{id}` - End a meeting
//! - `POST /api/meetings/{id}/messages` - Post a human message
//! - `POST /api/meetings/{id}/request-response` - Ask one participant to speak
//! - `GET /api/scenarios`, `POST /api/scenarios/{index}/start` - Preset meetings
//! - `GET /api/agents` - Participant catalog
//! - `GET /health` - Liveness check
//!
//! # WebSocket
//!
//! `GET /ws` upgrades to the command/event protocol described in
//! [`handlers::ws`].
//!
//! # OpenAPI Documentation
//!
//! The document is served at `/api-docs/openapi.json`; with the `swagger-ui`
//! feature, interactive documentation is available at `/swagger-ui/`.

/// OpenAPI document.
pub mod docs;
/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;
