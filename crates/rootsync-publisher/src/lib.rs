//! Publication of whitelist roots to an external ledger.
//!
//! `RootPublisher` drives a `Ledger` with per-attempt timeouts and bounded,
//! jittered exponential backoff. `JsonRpcLedger` talks to an EVM node;
//! `ledger::mock::MockLedger` scripts outcomes for tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod ledger;
pub mod publisher;
pub mod retry;

pub use client::{JsonRpcLedger, LedgerConfig};
pub use error::{ErrorCategory, PublishError, Result};
pub use ledger::{Ledger, LedgerConfirmation, LedgerFuture};
pub use publisher::{PublisherConfig, Receipt, RootPublisher};
pub use retry::{BackoffStrategy, RetryDecision, RetryPolicy};
