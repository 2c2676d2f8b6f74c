use std::time::SystemTime;

use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::format_system_time;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// RFC 3339 time the check ran.
    pub checked_at: String,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok() -> Self {
        Self::with_status("ok")
    }

    /// Create a health response indicating a write did not reach the store or the channel.
    pub fn degraded() -> Self {
        Self::with_status("degraded")
    }

    fn with_status(status: &str) -> Self {
        Self {
            status: status.to_string(),
            checked_at: format_system_time(SystemTime::now()),
        }
    }
}
