//! HTTP request handlers for the rootsync API.
//!
//! Handlers are grouped by functionality:
//! - `whitelist` - address mutations, listing, and proofs
//! - `sync` - sync status and manual resync
//! - `health` - health check
//!
//! Every failure is rendered as an `ErrorResponse` with a stable error code
//! and the status from `ApiError::status`.

pub mod health;
pub mod sync;
pub mod whitelist;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rootsync_commitment::CommitmentError;
use rootsync_core::CoreError;
use rootsync_whitelist::WhitelistError;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

pub use health::health_check;
pub use sync::{get_sync_status, resync};
pub use whitelist::{
    add_address, get_proof, list_addresses, remove_address, replace_address, verify_proof,
};

/// Error response with code and message.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error details including code and message
    pub error: ErrorDetail,
}

/// Detailed error information.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Stable machine-readable error code
    pub code: String,
    /// Human-readable error description
    pub message: String,
}

/// Service error rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub WhitelistError);

impl<E: Into<WhitelistError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            WhitelistError::Core(err) => match err {
                CoreError::InvalidAddress { .. } => StatusCode::BAD_REQUEST,
                CoreError::DuplicateAddress { .. } => StatusCode::CONFLICT,
                CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                CoreError::StorageFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            WhitelistError::Commitment(err) => match err {
                CommitmentError::NotFound { .. } => StatusCode::NOT_FOUND,
                CommitmentError::ProofVerificationFailed { .. } => StatusCode::BAD_REQUEST,
                CommitmentError::IndexOutOfRange { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            WhitelistError::Publish(err) if err.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            WhitelistError::Publish(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Stable error code for this error.
    pub fn code(&self) -> &'static str {
        match &self.0 {
            WhitelistError::Core(CoreError::InvalidAddress { .. }) => "invalid_address",
            WhitelistError::Core(CoreError::DuplicateAddress { .. }) => "duplicate_address",
            WhitelistError::Core(CoreError::NotFound { .. })
            | WhitelistError::Commitment(CommitmentError::NotFound { .. }) => "not_found",
            WhitelistError::Core(CoreError::StorageFailure { .. }) => "storage_failure",
            WhitelistError::Commitment(_) => "proof_failure",
            WhitelistError::Publish(err) if err.is_retryable() => "ledger_unavailable",
            WhitelistError::Publish(_) => "ledger_rejected",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, code = self.code(), "request failed");
        } else {
            warn!(error = %self.0, code = self.code(), "request rejected");
        }

        let body = ErrorResponse {
            error: ErrorDetail { code: self.code().to_string(), message: self.0.to_string() },
        };
        (status, Json(body)).into_response()
    }
}
