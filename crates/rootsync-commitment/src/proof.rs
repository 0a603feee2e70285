//! Inclusion proofs.
//!
//! A proof lists sibling hashes from the leaf up to the root. Each step also
//! records which side the sibling sat on, for verifiers that hash
//! positionally; the verifier here hashes sorted pairs and does not need it.

use rootsync_core::{Address, Root, EMPTY_ROOT};
use serde::{Deserialize, Serialize};

use crate::leaf::{leaf_hash, node_hash, Hash};

/// Which side of the path node a sibling occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Sibling is the left child.
    Left,
    /// Sibling is the right child.
    Right,
}

/// One level of an inclusion proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    /// Sibling hash at this level.
    #[serde(with = "hex_hash")]
    pub sibling: Hash,
    /// Side the sibling occupies.
    pub side: Side,
}

/// Merkle inclusion proof for a single address.
///
/// Levels where the path node had no sibling (it was promoted unchanged
/// from an odd-length level) contribute no step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Position of the leaf in the tree.
    pub leaf_index: usize,
    /// Hash of the proven leaf.
    #[serde(with = "hex_hash")]
    pub leaf: Hash,
    /// Sibling path from leaf to root.
    pub steps: Vec<ProofStep>,
}

impl Proof {
    /// Recomputes the root implied by this proof.
    pub fn compute_root(&self) -> Root {
        let folded = self.steps.iter().fold(self.leaf, |node, step| node_hash(&node, &step.sibling));
        Root(folded)
    }

    /// Checks that this proof shows `address` is included under `root`.
    ///
    /// Always false against the empty-whitelist root.
    pub fn verify(&self, address: &Address, root: &Root) -> bool {
        if *root == EMPTY_ROOT {
            return false;
        }
        self.leaf == leaf_hash(address) && self.compute_root() == *root
    }

    /// Sibling hashes only, in leaf-to-root order.
    pub fn siblings(&self) -> Vec<Hash> {
        self.steps.iter().map(|step| step.sibling).collect()
    }
}

/// Verifies `proof` for `address` against `root`.
pub fn verify_proof(proof: &Proof, address: &Address, root: &Root) -> bool {
    proof.verify(address, root)
}

mod hex_hash {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use crate::leaf::Hash;

    pub fn serialize<S: Serializer>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(hash)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(D::Error::custom)?;
        bytes.try_into().map_err(|_| D::Error::custom("hash must be 32 bytes"))
    }
}
