//! Sync status and manual resync.

use axum::{extract::State, Json};
use rootsync_whitelist::SyncStatus;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{whitelist::PublicationView, ApiError};
use crate::AppState;

/// Result of a manual resync.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResyncResponse {
    /// What happened on the ledger.
    pub publication: PublicationView,
    /// Status after the resync.
    pub status: SyncStatus,
}

/// Reports whether the ledger holds the local root.
#[instrument(name = "get_sync_status", skip(state))]
pub async fn get_sync_status(State(state): State<AppState>) -> Json<SyncStatus> {
    Json(state.service.get_sync_status().await)
}

/// Re-publishes the current local root.
///
/// # Errors
///
/// - 502: ledger rejected the root
/// - 503: ledger unavailable after retries
#[instrument(name = "resync", skip(state))]
pub async fn resync(State(state): State<AppState>) -> Result<Json<ResyncResponse>, ApiError> {
    let publication = state.service.resync().await?;
    info!(synced = publication.is_synced(), "manual resync completed");

    Ok(Json(ResyncResponse {
        publication: PublicationView::from(&publication),
        status: state.service.get_sync_status().await,
    }))
}
