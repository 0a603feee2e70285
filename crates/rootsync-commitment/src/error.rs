//! Error types for commitment and proof operations.

/// Errors raised while building proofs or verifying them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitmentError {
    /// Address is not a leaf of the tree.
    #[error("address {address} is not in the tree")]
    NotFound {
        /// Canonical form of the missing address.
        address: String,
    },

    /// Leaf index is outside the tree.
    #[error("leaf index {index} out of range for tree of {len} leaves")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of leaves in the tree.
        len: usize,
    },

    /// Proof does not recompute the expected root.
    #[error("proof verification failed: {reason}")]
    ProofVerificationFailed {
        /// Why verification failed.
        reason: String,
    },
}

impl CommitmentError {
    /// Creates a not-found error.
    pub fn not_found(address: impl Into<String>) -> Self {
        Self::NotFound { address: address.into() }
    }

    /// Creates a proof verification failure.
    pub fn proof_verification_failed(reason: impl Into<String>) -> Self {
        Self::ProofVerificationFailed { reason: reason.into() }
    }
}

/// Result type alias for commitment operations.
pub type Result<T> = std::result::Result<T, CommitmentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_formatting() {
        assert_eq!(
            CommitmentError::not_found("0xaa").to_string(),
            "address 0xaa is not in the tree"
        );
        assert_eq!(
            CommitmentError::IndexOutOfRange { index: 4, len: 3 }.to_string(),
            "leaf index 4 out of range for tree of 3 leaves"
        );
    }
}
