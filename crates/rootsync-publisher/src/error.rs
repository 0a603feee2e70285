//! Error types for root publication.
//!
//! The split that matters is transient versus permanent: only transient
//! failures justify an automatic retry. Timeouts are transient. Exhausting
//! the retry budget is reported separately so callers can tell "the ledger
//! said no" from "we stopped asking".

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for publication operations.
pub type Result<T> = std::result::Result<T, PublishError>;

/// Errors that can occur while publishing a root.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PublishError {
    /// Network or node-side failure that may succeed on retry.
    #[error("transient ledger failure: {message}")]
    TransientFailure {
        /// What went wrong.
        message: String,
    },

    /// The ledger rejected the root; retrying will not help.
    #[error("permanent ledger failure: {message}")]
    PermanentFailure {
        /// Why the ledger rejected the call.
        message: String,
    },

    /// No acknowledgement within the allotted time.
    #[error("ledger call timed out after {timeout_ms}ms")]
    Timeout {
        /// Timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// Gave up after the configured number of transient failures.
    #[error("publication failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Error from the final attempt.
        last_error: Box<PublishError>,
    },

    /// Publisher or ledger client is misconfigured.
    #[error("invalid ledger configuration: {message}")]
    Configuration {
        /// Configuration error message.
        message: String,
    },
}

impl PublishError {
    /// Creates a transient failure.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::TransientFailure { message: message.into() }
    }

    /// Creates a permanent failure.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::PermanentFailure { message: message.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(timeout: std::time::Duration) -> Self {
        Self::Timeout { timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX) }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Whether a later attempt may succeed.
    ///
    /// True for transient failures, timeouts, and exhausted retries (the
    /// underlying cause was transient). False for rejections and
    /// misconfiguration.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::TransientFailure { .. } | Self::Timeout { .. } | Self::RetriesExhausted { .. } => {
                true
            },
            Self::PermanentFailure { .. } | Self::Configuration { .. } => false,
        }
    }

    /// Coarse category for logs and API responses.
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from(self)
    }
}

/// Category of publication error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Retryable failure.
    Transient,
    /// Rejection by the ledger.
    Permanent,
    /// Local misconfiguration.
    Configuration,
}

impl From<&PublishError> for ErrorCategory {
    fn from(error: &PublishError) -> Self {
        match error {
            PublishError::TransientFailure { .. }
            | PublishError::Timeout { .. }
            | PublishError::RetriesExhausted { .. } => Self::Transient,
            PublishError::PermanentFailure { .. } => Self::Permanent,
            PublishError::Configuration { .. } => Self::Configuration,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Permanent => write!(f, "permanent"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn retryable_errors_identified_correctly() {
        assert!(PublishError::transient("connection refused").is_retryable());
        assert!(PublishError::timeout(Duration::from_secs(30)).is_retryable());
        assert!(PublishError::RetriesExhausted {
            attempts: 5,
            last_error: Box::new(PublishError::transient("503")),
        }
        .is_retryable());

        assert!(!PublishError::permanent("signer unauthorized").is_retryable());
        assert!(!PublishError::configuration("bad url").is_retryable());
    }

    #[test]
    fn categories_mapped_correctly() {
        assert_eq!(PublishError::timeout(Duration::from_secs(1)).category(), ErrorCategory::Transient);
        assert_eq!(PublishError::permanent("reverted").category(), ErrorCategory::Permanent);
        assert_eq!(ErrorCategory::Permanent.to_string(), "permanent");
    }

    #[test]
    fn category_serializes_like_display() {
        for category in
            [ErrorCategory::Transient, ErrorCategory::Permanent, ErrorCategory::Configuration]
        {
            let json = serde_json::to_value(category).unwrap();
            assert_eq!(json, serde_json::Value::String(category.to_string()));
        }
    }

    #[test]
    fn error_display_format() {
        assert_eq!(
            PublishError::timeout(Duration::from_millis(1500)).to_string(),
            "ledger call timed out after 1500ms"
        );

        let exhausted = PublishError::RetriesExhausted {
            attempts: 3,
            last_error: Box::new(PublishError::transient("HTTP 503")),
        };
        assert_eq!(
            exhausted.to_string(),
            "publication failed after 3 attempts: transient ledger failure: HTTP 503"
        );
    }
}
