//! Error types for address validation, set membership, and persistence.
//!
//! Every variant leaves the address set untouched: validation and membership
//! errors are raised before any state change, and storage failures abort the
//! mutation before the in-memory list is swapped.

use thiserror::Error;

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by address parsing and `AddressSet` operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Input is not a well-formed hex address.
    #[error("invalid address {input:?}: {reason}")]
    InvalidAddress {
        /// The rejected input as received.
        input: String,
        /// Why the input was rejected.
        reason: String,
    },

    /// Address is already whitelisted.
    #[error("address {address} is already whitelisted")]
    DuplicateAddress {
        /// Canonical form of the duplicate address.
        address: String,
    },

    /// Address is not whitelisted.
    #[error("address {address} is not whitelisted")]
    NotFound {
        /// Canonical form of the missing address.
        address: String,
    },

    /// Durable write or read failed; the mutation was not applied.
    #[error("storage failure: {message}")]
    StorageFailure {
        /// Underlying I/O or encoding error message.
        message: String,
    },
}

impl CoreError {
    /// Creates an invalid address error.
    pub fn invalid_address(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress { input: input.into(), reason: reason.into() }
    }

    /// Creates a duplicate address error.
    pub fn duplicate(address: impl Into<String>) -> Self {
        Self::DuplicateAddress { address: address.into() }
    }

    /// Creates a not-found error.
    pub fn not_found(address: impl Into<String>) -> Self {
        Self::NotFound { address: address.into() }
    }

    /// Creates a storage failure error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::StorageFailure { message: message.into() }
    }

    /// Check if this error was caused by the caller's input rather than
    /// by the service.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::InvalidAddress { .. } | Self::DuplicateAddress { .. } | Self::NotFound { .. } => {
                true
            },
            Self::StorageFailure { .. } => false,
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::storage(format!("malformed persisted state: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_classified() {
        assert!(CoreError::invalid_address("zz", "not hex").is_client_error());
        assert!(CoreError::duplicate("0xaa").is_client_error());
        assert!(CoreError::not_found("0xaa").is_client_error());
        assert!(!CoreError::storage("disk full").is_client_error());
    }

    #[test]
    fn error_message_formatting() {
        let err = CoreError::duplicate("0xaa");
        assert_eq!(err.to_string(), "address 0xaa is already whitelisted");

        let err = CoreError::invalid_address("0xZZ", "contains non-hex character");
        assert_eq!(err.to_string(), "invalid address \"0xZZ\": contains non-hex character");
    }

    #[test]
    fn io_errors_become_storage_failures() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        assert!(matches!(CoreError::from(io), CoreError::StorageFailure { .. }));
    }
}
