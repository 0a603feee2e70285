//! Whitelist synchronization service.
//!
//! `WhitelistService` owns the persisted address set and its Merkle tree,
//! publishes every new root to the ledger, and reports divergence when the
//! ledger lags. `Reconciler` repairs divergence in the background.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod reconciler;
pub mod service;
pub mod sync;

pub use error::{Result, WhitelistError};
pub use reconciler::Reconciler;
pub use service::{MutationReceipt, WhitelistService};
pub use sync::{Publication, SyncStatus};
