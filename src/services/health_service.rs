use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether the store is usable and every controller write was fully committed.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    if let Err(err) = state.store().health_check() {
        warn!(error = %err, "storage health check failed");
    }
    if state.controller().is_degraded() {
        warn!("controller cells hold writes that were not fully committed");
    }

    if state.is_degraded() {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}
