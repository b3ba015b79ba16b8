//! Health check and service statistics reporting
//!
//! Backs the CLI `--health-check` mode.

use crate::error::Result;
use crate::service::app::AppState;
use serde::{Deserialize, Serialize};

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStats {
    /// Number of active rooms
    pub active_rooms: usize,
    /// Users currently in the waiting pool
    pub users_waiting: usize,
    /// Live connections
    pub active_sessions: usize,
    /// Total rooms created since service start
    pub rooms_created: u64,
    /// Total match requests since service start
    pub match_requests: u64,
    /// Service uptime information
    pub uptime_info: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
    /// Current timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Service statistics
    pub stats: ServiceStats,
}

impl HealthCheck {
    /// Perform a health check of the service components
    pub async fn check(app_state: &AppState) -> Result<Self> {
        let matchmaker = app_state.matchmaker();

        // Reading stats exercises the matchmaker's internal locks; a poisoned
        // lock shows up here as an error and means unhealthy.
        let (status, stats) = match matchmaker.stats() {
            Ok(mm_stats) => {
                let users_waiting = matchmaker.waiting_count().await.unwrap_or(0);
                (
                    HealthStatus::Healthy,
                    ServiceStats {
                        active_rooms: matchmaker.active_rooms(),
                        users_waiting,
                        active_sessions: app_state.sessions().len(),
                        rooms_created: mm_stats.rooms_created,
                        match_requests: mm_stats.match_requests,
                        uptime_info: format!("{}s", app_state.uptime_seconds()),
                    },
                )
            }
            Err(_) => (
                HealthStatus::Unhealthy,
                ServiceStats {
                    active_rooms: 0,
                    users_waiting: 0,
                    active_sessions: 0,
                    rooms_created: 0,
                    match_requests: 0,
                    uptime_info: format!("{}s", app_state.uptime_seconds()),
                },
            ),
        };

        Ok(HealthCheck {
            status,
            service: app_state.config().service.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            stats,
        })
    }
}
