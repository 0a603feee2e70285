//! Domain-separated Keccak-256 hashing for leaves and internal nodes.
//!
//! Leaves and internal nodes carry distinct one-byte prefixes, in the style
//! of RFC 6962, so a leaf hash can never be passed off as an internal node.
//! Internal nodes hash their children in sorted order, which lets a verifier
//! recompute the root from sibling hashes alone without knowing the leaf's
//! position.
//!
//! These rules are protocol constants. Changing any of them changes every
//! root and invalidates every proof already handed out.

use rootsync_core::Address;
use sha3::{Digest, Keccak256};

/// A 32-byte Keccak-256 digest.
pub type Hash = [u8; 32];

/// Prefix byte for leaf hashes.
pub const LEAF_PREFIX: u8 = 0x00;

/// Prefix byte for internal node hashes.
pub const NODE_PREFIX: u8 = 0x01;

/// Computes the leaf hash of an address: `keccak256(0x00 || address_bytes)`.
pub fn leaf_hash(address: &Address) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(address.to_bytes());
    hasher.finalize().into()
}

/// Computes the parent of two nodes: `keccak256(0x01 || min || max)`.
pub fn node_hash(a: &Hash, b: &Hash) -> Hash {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };

    let mut hasher = Keccak256::new();
    hasher.update([NODE_PREFIX]);
    hasher.update(low);
    hasher.update(high);
    hasher.finalize().into()
}
