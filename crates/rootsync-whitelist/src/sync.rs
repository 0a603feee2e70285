//! Local versus ledger state.
//!
//! The locally computed root and the last root the ledger confirmed are
//! tracked separately. When they differ the service is diverged; that is a
//! normal, observable state repaired by a later publication.

use chrono::{DateTime, Utc};
use rootsync_core::{PublicationRecord, Root, EMPTY_ROOT};
use rootsync_publisher::{ErrorCategory, PublishError, Receipt};
use serde::{Deserialize, Serialize};

/// What happened to the ledger after a mutation or resync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Publication {
    /// The ledger confirmed the current root.
    Confirmed(Receipt),
    /// The ledger already held the current root; nothing was sent.
    AlreadyPublished,
    /// Publication failed; the ledger still holds the previous root.
    Diverged {
        /// Error from the failed publication.
        error: PublishError,
    },
}

impl Publication {
    /// Whether the ledger matches the local root after this publication.
    pub fn is_synced(&self) -> bool {
        !matches!(self, Self::Diverged { .. })
    }
}

/// Snapshot of synchronization health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Whether the ledger holds the local root.
    pub in_sync: bool,
    /// Root of the current local whitelist.
    pub local_root: Root,
    /// Last root the ledger confirmed, if any publication ever succeeded.
    pub last_confirmed_root: Option<Root>,
    /// Identifier of the last confirmed ledger write.
    pub last_confirmation_id: Option<String>,
    /// When the last confirmation arrived.
    pub last_confirmed_at: Option<DateTime<Utc>>,
    /// Number of whitelisted addresses.
    pub leaf_count: usize,
    /// Error from the most recent failed publication, cleared on success.
    /// Also set when the ledger confirmed a root but its record could not be
    /// saved.
    pub last_error: Option<String>,
    /// Category of the failed publication behind `last_error`.
    pub last_error_category: Option<ErrorCategory>,
}

/// Mutable publication bookkeeping kept by the service.
#[derive(Debug, Clone, Default)]
pub(crate) struct SyncState {
    pub(crate) confirmed: Option<PublicationRecord>,
    pub(crate) last_error: Option<PublishError>,
    /// Why the confirmed record is not on disk, if it is not.
    pub(crate) record_error: Option<String>,
}

impl SyncState {
    pub(crate) fn new(confirmed: Option<PublicationRecord>) -> Self {
        Self { confirmed, ..Self::default() }
    }

    /// Root the ledger holds. A ledger that never confirmed anything holds
    /// the empty root.
    pub(crate) fn ledger_root(&self) -> Root {
        self.confirmed.as_ref().map_or(EMPTY_ROOT, |record| record.root)
    }

    pub(crate) fn status(&self, local_root: Root, leaf_count: usize) -> SyncStatus {
        SyncStatus {
            in_sync: self.ledger_root() == local_root,
            local_root,
            last_confirmed_root: self.confirmed.as_ref().map(|record| record.root),
            last_confirmation_id: self.confirmed.as_ref().map(|r| r.confirmation_id.clone()),
            last_confirmed_at: self.confirmed.as_ref().map(|record| record.confirmed_at),
            leaf_count,
            last_error: self.last_error.as_ref().map(ToString::to_string).or_else(|| {
                self.record_error
                    .as_ref()
                    .map(|error| format!("publication record not saved: {error}"))
            }),
            last_error_category: self.last_error.as_ref().map(PublishError::category),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_in_sync_with_empty_root() {
        let state = SyncState::default();
        let status = state.status(EMPTY_ROOT, 0);

        assert!(status.in_sync);
        assert_eq!(status.last_confirmed_root, None);
    }

    #[test]
    fn differing_roots_are_diverged() {
        let state = SyncState {
            confirmed: Some(PublicationRecord {
                root: Root([1; 32]),
                confirmation_id: "0x01".into(),
                confirmed_at: Utc::now(),
            }),
            last_error: Some(PublishError::transient("503")),
            record_error: None,
        };
        let status = state.status(Root([2; 32]), 3);

        assert!(!status.in_sync);
        assert_eq!(status.last_confirmed_root, Some(Root([1; 32])));
        assert_eq!(status.last_error.as_deref(), Some("transient ledger failure: 503"));
        assert_eq!(status.last_error_category, Some(ErrorCategory::Transient));
    }

    #[test]
    fn unsaved_record_is_reported_while_in_sync() {
        let state = SyncState {
            confirmed: Some(PublicationRecord {
                root: Root([1; 32]),
                confirmation_id: "0x01".into(),
                confirmed_at: Utc::now(),
            }),
            last_error: None,
            record_error: Some("disk full".into()),
        };
        let status = state.status(Root([1; 32]), 1);

        assert!(status.in_sync);
        assert_eq!(status.last_error.as_deref(), Some("publication record not saved: disk full"));
        assert_eq!(status.last_error_category, None);
    }
}
