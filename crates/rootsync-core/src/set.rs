//! The ordered, deduplicated, persisted whitelist.
//!
//! Order matters: it fixes each address's leaf position in the Merkle tree.
//! Every mutation builds the new list on the side, persists it, and only
//! then swaps it in, so a failed write leaves both the durable and the
//! in-memory state as they were.

use std::{collections::HashSet, sync::Arc};

use tracing::{debug, warn};

use crate::{
    address::Address,
    error::{CoreError, Result},
    storage::AddressStore,
};

/// Ordered set of unique canonical addresses backed by an `AddressStore`.
///
/// `AddressSet` does no locking of its own; callers that share it across
/// tasks wrap it in a single-writer lock so that read-modify-persist runs as
/// one critical section.
pub struct AddressSet<S> {
    entries: Arc<[Address]>,
    store: S,
}

impl<S> std::fmt::Debug for AddressSet<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressSet").field("len", &self.entries.len()).finish_non_exhaustive()
    }
}

impl<S: AddressStore> AddressSet<S> {
    /// Loads the persisted list from `store`.
    ///
    /// Duplicates in the persisted list (for example from a hand-edited file)
    /// are dropped, keeping the first occurrence.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::StorageFailure` if the list cannot be read or
    /// decoded.
    pub async fn load(store: S) -> Result<Self> {
        let persisted = store.load_addresses().await?;
        let total = persisted.len();

        let mut seen = HashSet::with_capacity(total);
        let entries: Vec<Address> =
            persisted.into_iter().filter(|address| seen.insert(address.clone())).collect();

        if entries.len() != total {
            warn!(
                persisted = total,
                unique = entries.len(),
                "dropped duplicate addresses from persisted whitelist"
            );
        }

        debug!(count = entries.len(), "loaded whitelist");
        Ok(Self { entries: entries.into(), store })
    }

    /// Appends `address` and persists the new list.
    ///
    /// # Errors
    ///
    /// - `CoreError::DuplicateAddress` if the address is already present
    /// - `CoreError::StorageFailure` if persisting fails; nothing changes
    pub async fn add(&mut self, address: Address) -> Result<Arc<[Address]>> {
        if self.contains(&address) {
            return Err(CoreError::duplicate(address.as_str()));
        }

        let mut next = self.entries.to_vec();
        next.push(address);
        self.commit(next).await
    }

    /// Removes `address`, preserving the order of the remaining entries, and
    /// persists the new list.
    ///
    /// # Errors
    ///
    /// - `CoreError::NotFound` if the address is absent
    /// - `CoreError::StorageFailure` if persisting fails; nothing changes
    pub async fn remove(&mut self, address: &Address) -> Result<Arc<[Address]>> {
        let index = self.position(address).ok_or_else(|| CoreError::not_found(address.as_str()))?;

        let mut next = self.entries.to_vec();
        next.remove(index);
        self.commit(next).await
    }

    /// Substitutes `new` for `old` at the same position and persists.
    ///
    /// Replacing an address with itself is a successful no-op.
    ///
    /// # Errors
    ///
    /// - `CoreError::NotFound` if `old` is absent
    /// - `CoreError::DuplicateAddress` if `new` is present and differs from
    ///   `old`
    /// - `CoreError::StorageFailure` if persisting fails; nothing changes
    pub async fn replace(&mut self, old: &Address, new: Address) -> Result<Arc<[Address]>> {
        let index = self.position(old).ok_or_else(|| CoreError::not_found(old.as_str()))?;

        if *old == new {
            return Ok(self.snapshot());
        }
        if self.contains(&new) {
            return Err(CoreError::duplicate(new.as_str()));
        }

        let mut next = self.entries.to_vec();
        next[index] = new;
        self.commit(next).await
    }

    /// Returns an immutable copy of the current ordered list.
    pub fn snapshot(&self) -> Arc<[Address]> {
        Arc::clone(&self.entries)
    }

    /// Whether `address` is whitelisted.
    pub fn contains(&self, address: &Address) -> bool {
        self.position(address).is_some()
    }

    /// Number of whitelisted addresses.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the whitelist is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn position(&self, address: &Address) -> Option<usize> {
        self.entries.iter().position(|entry| entry == address)
    }

    async fn commit(&mut self, next: Vec<Address>) -> Result<Arc<[Address]>> {
        self.store.save_addresses(next.clone()).await?;
        self.entries = next.into();
        Ok(self.snapshot())
    }
}
