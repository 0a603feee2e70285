//! Merkle tree construction over an ordered address list.
//!
//! The tree is a pure function of the list: leaves are hashed in list order,
//! paired left to right, and a level with an odd node count promotes its
//! last node unchanged. The root of an empty list is `EMPTY_ROOT`.

use std::{collections::HashMap, sync::Arc};

use rootsync_core::{Address, Root, EMPTY_ROOT};
use tracing::debug;

use crate::{
    error::{CommitmentError, Result},
    leaf::{leaf_hash, node_hash, Hash},
    proof::{Proof, ProofStep, Side},
};

/// Immutable Merkle tree over a snapshot of the whitelist.
///
/// Holds every level so that proofs are extracted without rehashing.
/// `levels[0]` are the leaves and the last level holds the root.
#[derive(Clone)]
pub struct MerkleTree {
    addresses: Arc<[Address]>,
    index: HashMap<Address, usize>,
    levels: Vec<Vec<Hash>>,
    root: Root,
}

impl std::fmt::Debug for MerkleTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MerkleTree")
            .field("root", &self.root)
            .field("leaves", &self.addresses.len())
            .field("depth", &self.depth())
            .finish()
    }
}

impl MerkleTree {
    /// Builds the tree for `addresses`, in order.
    ///
    /// If the list contains the same address twice, proofs are issued for
    /// the first occurrence.
    pub fn build(addresses: impl Into<Arc<[Address]>>) -> Self {
        let addresses: Arc<[Address]> = addresses.into();

        let mut index = HashMap::with_capacity(addresses.len());
        for (position, address) in addresses.iter().enumerate() {
            index.entry(address.clone()).or_insert(position);
        }

        let leaves: Vec<Hash> = addresses.iter().map(leaf_hash).collect();
        let mut levels = vec![leaves];

        while levels.last().is_some_and(|level| level.len() > 1) {
            let next = levels
                .last()
                .map(|level| {
                    level
                        .chunks(2)
                        .map(|pair| match pair {
                            [left, right] => node_hash(left, right),
                            _ => pair[0],
                        })
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            levels.push(next);
        }

        let root = levels.last().and_then(|level| level.first()).map_or(EMPTY_ROOT, |h| Root(*h));

        debug!(leaves = addresses.len(), root = %root, "built merkle tree");
        Self { addresses, index, levels, root }
    }

    /// Root committing to the whole list.
    pub fn root(&self) -> Root {
        self.root
    }

    /// Addresses in leaf order.
    pub fn addresses(&self) -> &Arc<[Address]> {
        &self.addresses
    }

    /// Leaf hashes in order.
    pub fn leaves(&self) -> &[Hash] {
        self.levels.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Whether the tree has no leaves.
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Number of hashing levels above the leaves.
    pub fn depth(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    /// Leaf position of `address`, if present.
    pub fn position(&self, address: &Address) -> Option<usize> {
        self.index.get(address).copied()
    }

    /// Builds an inclusion proof for `address`.
    ///
    /// # Errors
    ///
    /// Returns `CommitmentError::NotFound` if the address is not a leaf,
    /// which is always the case for an empty tree.
    pub fn prove_inclusion(&self, address: &Address) -> Result<Proof> {
        let index =
            self.position(address).ok_or_else(|| CommitmentError::not_found(address.as_str()))?;
        self.proof_for_index(index)
    }

    /// Builds an inclusion proof for the leaf at `index`.
    ///
    /// # Errors
    ///
    /// Returns `CommitmentError::IndexOutOfRange` if `index` is not a leaf.
    pub fn proof_for_index(&self, index: usize) -> Result<Proof> {
        let leaf = *self
            .leaves()
            .get(index)
            .ok_or(CommitmentError::IndexOutOfRange { index, len: self.len() })?;

        let mut steps = Vec::with_capacity(self.depth());
        let mut position = index;
        for level in &self.levels[..self.depth()] {
            let sibling_position = position ^ 1;
            if let Some(sibling) = level.get(sibling_position) {
                let side = if position % 2 == 0 { Side::Right } else { Side::Left };
                steps.push(ProofStep { sibling: *sibling, side });
            }
            position /= 2;
        }

        Ok(Proof { leaf_index: index, leaf, steps })
    }
}
