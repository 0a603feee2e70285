//! Error type for whitelist service operations.

use rootsync_commitment::CommitmentError;
use rootsync_core::CoreError;
use rootsync_publisher::PublishError;
use thiserror::Error;

/// Result type alias using `WhitelistError`.
pub type Result<T> = std::result::Result<T, WhitelistError>;

/// Errors returned by `WhitelistService`.
///
/// Publication failures after a successful mutation are not errors; they are
/// reported as divergence on the mutation receipt and in the sync status.
/// `Publish` only comes back from an explicit resync.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WhitelistError {
    /// Validation, membership, or storage failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Proof could not be produced.
    #[error(transparent)]
    Commitment(#[from] CommitmentError),

    /// Ledger publication failed.
    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl WhitelistError {
    /// Whether the caller's input caused the error.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Core(err) => err.is_client_error(),
            Self::Commitment(CommitmentError::NotFound { .. }) => true,
            Self::Commitment(_) | Self::Publish(_) => false,
        }
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Publish(err) if err.is_retryable())
    }
}
