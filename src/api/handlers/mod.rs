//! API request handlers.

/// Participant catalog.
pub mod agents;
/// Liveness check.
pub mod health;
/// Meeting lifecycle and turns.
pub mod meetings;
/// Preset meeting scenarios.
pub mod scenarios;
/// WebSocket command/event protocol.
pub mod ws;

use crate::types::{AppError, Result};
use crate::AppState;
use std::future::Future;
use tracing::warn;

/// Run a generator-bound operation under the gateway request timeout.
///
/// The timeout is read from the live configuration on every call. A stalled
/// request is dropped, which releases the meeting's turn guard, and reported
/// as an `error` event on the meeting.
pub(crate) async fn within_gateway_timeout<T, F>(
    state: &AppState,
    session_id: &str,
    operation: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let timeout = state.config_manager.config().gateway.request_timeout();
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => {
            let error = AppError::Timeout(format!(
                "no response within {}s for session {}",
                timeout.as_secs(),
                session_id
            ));
            warn!(session_id = %session_id, "Gateway request timed out");
            state.facilitator.report_error(Some(session_id), &error);
            Err(error)
        }
    }
}
