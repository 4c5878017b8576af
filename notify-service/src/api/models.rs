//! API request and response models.

use serde::{Deserialize, Serialize};

use crate::notification::DispatchStatsSnapshot;

/// Query parameters for `GET /events`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentEventsQuery {
    /// Number of events to return; non-positive values yield an empty list.
    pub n: Option<i64>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub events: EventHistoryHealth,
    pub dispatch: DispatchHealth,
}

/// History part of the health response.
#[derive(Debug, Clone, Serialize)]
pub struct EventHistoryHealth {
    /// Events currently retained.
    pub stored: usize,
    /// Retention ceiling.
    pub capacity: usize,
    /// Events received since start.
    pub total: u64,
}

/// Dispatch part of the health response.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchHealth {
    pub notifiers: Vec<String>,
    pub queue_capacity: usize,
    pub pending: usize,
    pub closed: bool,
    #[serde(flatten)]
    pub stats: DispatchStatsSnapshot,
}

/// Log filter request / response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogFilter {
    pub filter: String,
}
