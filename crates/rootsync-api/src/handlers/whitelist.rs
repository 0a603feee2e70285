//! Whitelist mutation, listing, and proof handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rootsync_commitment::Proof;
use rootsync_core::{Address, Root};
use rootsync_publisher::ErrorCategory;
use rootsync_whitelist::{MutationReceipt, Publication};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::ApiError;
use crate::AppState;

/// Body of `POST /whitelist`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AddRequest {
    /// Address to whitelist.
    pub address: String,
}

/// Body of `PUT /whitelist/{address}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReplaceRequest {
    /// Address that takes the old one's place.
    pub new_address: String,
}

/// Body of `POST /proofs/verify`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyRequest {
    /// Address the proof claims to include.
    pub address: String,
    /// Proof to check.
    pub proof: Proof,
    /// Root to check against; defaults to the current local root.
    #[serde(default)]
    pub root: Option<Root>,
}

/// Result of a proof check.
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    /// Whether the proof holds.
    pub valid: bool,
    /// Root the proof was checked against.
    pub root: Root,
}

/// Current whitelist.
#[derive(Debug, Serialize, Deserialize)]
pub struct WhitelistResponse {
    /// Addresses in leaf order.
    pub addresses: Vec<Address>,
    /// Local root over those addresses.
    pub root: Root,
    /// Number of addresses.
    pub count: usize,
}

/// Inclusion proof for one address.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProofResponse {
    /// Canonical address.
    pub address: Address,
    /// Root the proof verifies against.
    pub root: Root,
    /// The proof.
    pub proof: Proof,
}

/// Ledger outcome as reported to API clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublicationView {
    /// Ledger confirmed the root.
    Confirmed {
        /// Root the ledger holds.
        root: Root,
        /// Ledger-side identifier of the write.
        confirmation_id: String,
        /// Attempts it took.
        attempts: u32,
    },
    /// Ledger already held the root.
    AlreadyPublished,
    /// Publication failed; the ledger lags the local root.
    Diverged {
        /// Failure category.
        category: ErrorCategory,
        /// Failure description.
        error: String,
    },
}

impl From<&Publication> for PublicationView {
    fn from(publication: &Publication) -> Self {
        match publication {
            Publication::Confirmed(receipt) => Self::Confirmed {
                root: receipt.root,
                confirmation_id: receipt.confirmation_id.clone(),
                attempts: receipt.attempts,
            },
            Publication::AlreadyPublished => Self::AlreadyPublished,
            Publication::Diverged { error } => {
                Self::Diverged { category: error.category(), error: error.to_string() }
            },
        }
    }
}

/// Result of a whitelist mutation.
#[derive(Debug, Serialize, Deserialize)]
pub struct MutationResponse {
    /// Addresses after the mutation.
    pub addresses: Vec<Address>,
    /// Local root after the mutation.
    pub root: Root,
    /// What happened on the ledger.
    pub publication: PublicationView,
}

impl From<MutationReceipt> for MutationResponse {
    fn from(receipt: MutationReceipt) -> Self {
        Self {
            addresses: receipt.addresses.to_vec(),
            root: receipt.root,
            publication: PublicationView::from(&receipt.publication),
        }
    }
}

/// Lists the whitelist and its root.
#[instrument(name = "list_addresses", skip(state))]
pub async fn list_addresses(State(state): State<AppState>) -> Json<WhitelistResponse> {
    let tree = state.service.commitment().await;
    Json(WhitelistResponse {
        addresses: tree.addresses().to_vec(),
        root: tree.root(),
        count: tree.len(),
    })
}

/// Adds an address.
///
/// # Errors
///
/// - 400: malformed address
/// - 409: already whitelisted
/// - 500: storage failure
#[instrument(name = "add_address", skip(state, request), fields(address = %request.address))]
pub async fn add_address(
    State(state): State<AppState>,
    Json(request): Json<AddRequest>,
) -> Result<(StatusCode, Json<MutationResponse>), ApiError> {
    let receipt = state.service.add_address(&request.address).await?;
    Ok((StatusCode::CREATED, Json(receipt.into())))
}

/// Replaces an address in place.
///
/// # Errors
///
/// - 400: malformed address
/// - 404: old address not whitelisted
/// - 409: new address already whitelisted
/// - 500: storage failure
#[instrument(name = "replace_address", skip(state, request), fields(new_address = %request.new_address))]
pub async fn replace_address(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(request): Json<ReplaceRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    let receipt = state.service.replace_address(&address, &request.new_address).await?;
    Ok(Json(receipt.into()))
}

/// Removes an address.
///
/// # Errors
///
/// - 400: malformed address
/// - 404: not whitelisted
/// - 500: storage failure
#[instrument(name = "remove_address", skip(state))]
pub async fn remove_address(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<MutationResponse>, ApiError> {
    let receipt = state.service.remove_address(&address).await?;
    Ok(Json(receipt.into()))
}

/// Returns the current root and an inclusion proof.
///
/// # Errors
///
/// - 400: malformed address
/// - 404: not whitelisted
#[instrument(name = "get_proof", skip(state))]
pub async fn get_proof(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ProofResponse>, ApiError> {
    let (root, proof) = state.service.get_proof(&address).await?;
    let address = Address::parse(&address)?;
    Ok(Json(ProofResponse { address, root, proof }))
}

/// Checks a proof against a root.
///
/// # Errors
///
/// - 400: malformed address
#[instrument(name = "verify_proof", skip(state, request), fields(address = %request.address))]
pub async fn verify_proof(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let root = match request.root {
        Some(root) => root,
        None => state.service.local_root().await,
    };
    let valid = state.service.verify_proof(&request.address, &request.proof, &root)?;
    Ok(Json(VerifyResponse { valid, root }))
}
