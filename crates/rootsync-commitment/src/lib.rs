//! Deterministic Merkle commitments over address whitelists.
//!
//! Builds a Keccak-256 Merkle tree from an ordered list of canonical
//! addresses and extracts inclusion proofs that can be checked against the
//! root alone. Leaf and node hashes are domain separated; internal nodes hash
//! sorted pairs; odd levels promote their last node unchanged.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod leaf;
pub mod merkle;
pub mod proof;

pub use error::{CommitmentError, Result};
pub use leaf::{leaf_hash, node_hash, Hash};
pub use merkle::MerkleTree;
pub use proof::{verify_proof, Proof, ProofStep, Side};
