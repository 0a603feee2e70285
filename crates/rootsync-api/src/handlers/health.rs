//! Health check handler.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use rootsync_core::Root;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::AppState;

/// Health check response structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service health status
    pub status: HealthStatus,
    /// Timestamp when health check was performed
    pub timestamp: DateTime<Utc>,
    /// Individual component health checks
    pub checks: HealthChecks,
    /// Service version information
    pub version: String,
}

/// Overall health status enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Ledger holds the local root
    Healthy,
    /// Ledger lags the local root; mutations and proofs still work
    Degraded,
}

/// Individual component health check results.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthChecks {
    /// Ledger synchronization
    pub ledger: LedgerHealth,
}

/// Ledger synchronization health.
#[derive(Debug, Serialize, Deserialize)]
pub struct LedgerHealth {
    /// Whether the ledger holds the local root
    pub in_sync: bool,
    /// Current local root
    pub local_root: Root,
    /// Last root the ledger confirmed
    pub last_confirmed_root: Option<Root>,
    /// Most recent publication error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Health check endpoint handler.
///
/// Always answers 200: divergence degrades the service but does not take it
/// down.
#[instrument(name = "health_check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let sync = state.service.get_sync_status().await;
    let status = if sync.in_sync { HealthStatus::Healthy } else { HealthStatus::Degraded };

    debug!(status = ?status, "health check completed");

    let response = HealthResponse {
        status,
        timestamp: state.clock.now(),
        checks: HealthChecks {
            ledger: LedgerHealth {
                in_sync: sync.in_sync,
                local_root: sync.local_root,
                last_confirmed_root: sync.last_confirmed_root,
                message: sync.last_error,
            },
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (StatusCode::OK, Json(response))
}
