//! The whitelist service.
//!
//! Each mutation validates its input, applies the change to the address set
//! and persists it, rebuilds the Merkle tree, and swaps the cached tree in,
//! all under one mutation lock. Publication to the ledger happens after the
//! lock is released, so a slow ledger never blocks other writers or proof
//! readers.
//!
//! The write and its publication run on their own task. Dropping the
//! caller's future (a client disconnect, a request timeout) never stops a
//! mutation between the durable write and the in-memory swap.

use std::{fmt, sync::Arc};

use rootsync_commitment::{MerkleTree, Proof};
use rootsync_core::{Address, AddressSet, AddressStore, CoreError, PublicationRecord, Root};
use rootsync_publisher::{PublishError, RootPublisher};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, instrument, warn, Instrument};

use crate::{
    error::{Result, WhitelistError},
    sync::{Publication, SyncState, SyncStatus},
};

/// Outcome of a successful mutation.
#[derive(Debug, Clone)]
pub struct MutationReceipt {
    /// Whitelist after the mutation, in leaf order.
    pub addresses: Arc<[Address]>,
    /// Root of that whitelist.
    pub root: Root,
    /// What happened on the ledger.
    ///
    /// A confirmed receipt may carry a newer root than `root` when another
    /// mutation landed before this one was published.
    pub publication: Publication,
}

#[derive(Debug)]
enum Mutation {
    Add(Address),
    Remove(Address),
    Replace { old: Address, new: Address },
}

/// Keeps a persisted whitelist, its Merkle tree, and the ledger root in
/// step.
pub struct WhitelistService {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn AddressStore>,
    set: Mutex<AddressSet<Arc<dyn AddressStore>>>,
    commitment: RwLock<Arc<MerkleTree>>,
    publish_lock: Mutex<()>,
    sync: RwLock<SyncState>,
    publisher: RootPublisher,
}

impl fmt::Debug for WhitelistService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhitelistService")
            .field("publisher", &self.inner.publisher)
            .finish_non_exhaustive()
    }
}

impl WhitelistService {
    /// Loads the whitelist and last publication record from `store`.
    ///
    /// Nothing is published here; a root that drifted while the process was
    /// down shows up as divergence until `resync` runs.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::StorageFailure` if persisted state cannot be read.
    pub async fn load(store: Arc<dyn AddressStore>, publisher: RootPublisher) -> Result<Self> {
        let set = AddressSet::load(Arc::clone(&store)).await?;
        let confirmed = store.load_publication().await?;
        let tree = MerkleTree::build(set.snapshot());

        let sync = SyncState::new(confirmed);
        info!(
            addresses = tree.len(),
            local_root = %tree.root(),
            ledger_root = %sync.ledger_root(),
            "whitelist loaded"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                store,
                set: Mutex::new(set),
                commitment: RwLock::new(Arc::new(tree)),
                publish_lock: Mutex::new(()),
                sync: RwLock::new(sync),
                publisher,
            }),
        })
    }

    /// Appends an address.
    ///
    /// # Errors
    ///
    /// `InvalidAddress`, `DuplicateAddress`, or `StorageFailure`. Ledger
    /// failures are reported in the receipt, not here.
    #[instrument(skip(self))]
    pub async fn add_address(&self, input: &str) -> Result<MutationReceipt> {
        let address = Address::parse(input)?;
        self.mutate(Mutation::Add(address)).await
    }

    /// Removes an address.
    ///
    /// # Errors
    ///
    /// `InvalidAddress`, `NotFound`, or `StorageFailure`.
    #[instrument(skip(self))]
    pub async fn remove_address(&self, input: &str) -> Result<MutationReceipt> {
        let address = Address::parse(input)?;
        self.mutate(Mutation::Remove(address)).await
    }

    /// Replaces `old` with `new` at the same position.
    ///
    /// # Errors
    ///
    /// `InvalidAddress` for either input, `NotFound` if `old` is absent,
    /// `DuplicateAddress` if `new` is already present, or `StorageFailure`.
    #[instrument(skip(self))]
    pub async fn replace_address(&self, old: &str, new: &str) -> Result<MutationReceipt> {
        let old = Address::parse(old)?;
        let new = Address::parse(new)?;
        self.mutate(Mutation::Replace { old, new }).await
    }

    /// Returns the current root and an inclusion proof for `input`.
    ///
    /// Both come from the same tree snapshot.
    ///
    /// # Errors
    ///
    /// `InvalidAddress`, or `Commitment(NotFound)` if not whitelisted.
    pub async fn get_proof(&self, input: &str) -> Result<(Root, Proof)> {
        let address = Address::parse(input)?;
        let tree = self.commitment().await;
        let proof = tree.prove_inclusion(&address)?;
        Ok((tree.root(), proof))
    }

    /// Checks `proof` for `input` against `root`.
    ///
    /// # Errors
    ///
    /// `InvalidAddress` if `input` is malformed.
    pub fn verify_proof(&self, input: &str, proof: &Proof, root: &Root) -> Result<bool> {
        let address = Address::parse(input)?;
        Ok(proof.verify(&address, root))
    }

    /// Current whitelist in leaf order.
    pub async fn list_addresses(&self) -> Arc<[Address]> {
        Arc::clone(self.commitment().await.addresses())
    }

    /// Current local root.
    pub async fn local_root(&self) -> Root {
        self.commitment().await.root()
    }

    /// Current tree snapshot.
    pub async fn commitment(&self) -> Arc<MerkleTree> {
        self.inner.commitment().await
    }

    /// Compares the local root with the last confirmed ledger root.
    pub async fn get_sync_status(&self) -> SyncStatus {
        let tree = self.commitment().await;
        self.inner.sync.read().await.status(tree.root(), tree.len())
    }

    /// Whether the ledger is behind the local root.
    pub async fn is_diverged(&self) -> bool {
        !self.get_sync_status().await.in_sync
    }

    /// Error from the most recent failed publication, if it still stands.
    pub async fn last_publish_error(&self) -> Option<PublishError> {
        self.inner.sync.read().await.last_error.clone()
    }

    /// Whether the ledger confirmed a root whose record could not be saved.
    pub async fn has_unsaved_record(&self) -> bool {
        self.inner.sync.read().await.record_error.is_some()
    }

    /// Publishes the current local root if the ledger does not hold it.
    ///
    /// Never touches the whitelist. Also retries saving a confirmed
    /// publication record that failed to persist earlier.
    ///
    /// # Errors
    ///
    /// Returns `WhitelistError::Publish` if publication failed; the service
    /// stays diverged.
    #[instrument(skip(self))]
    pub async fn resync(&self) -> Result<Publication> {
        let inner = Arc::clone(&self.inner);
        let publication =
            run_detached(async move { Ok(inner.publish_current().await) }.in_current_span())
                .await?;

        match publication {
            Publication::Diverged { error } => Err(WhitelistError::Publish(error)),
            publication => Ok(publication),
        }
    }

    async fn mutate(&self, mutation: Mutation) -> Result<MutationReceipt> {
        let inner = Arc::clone(&self.inner);
        run_detached(
            async move {
                let (addresses, root) = inner.apply(mutation).await?;
                info!(addresses = addresses.len(), root = %root, "whitelist updated");

                let publication = inner.publish_current().await;
                Ok(MutationReceipt { addresses, root, publication })
            }
            .in_current_span(),
        )
        .await
    }
}

/// Runs `work` on its own task so it completes even if the caller is
/// dropped.
async fn run_detached<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: std::future::Future<Output = Result<T>> + Send + 'static,
{
    match tokio::spawn(work).await {
        Ok(result) => result,
        Err(join_error) => {
            error!(error = %join_error, "whitelist task failed");
            Err(CoreError::storage(format!("whitelist task failed: {join_error}")).into())
        },
    }
}

impl Inner {
    async fn commitment(&self) -> Arc<MerkleTree> {
        Arc::clone(&*self.commitment.read().await)
    }

    /// Applies one mutation, persists it, and swaps in the rebuilt tree.
    async fn apply(&self, mutation: Mutation) -> Result<(Arc<[Address]>, Root)> {
        let mut set = self.set.lock().await;
        let addresses = match mutation {
            Mutation::Add(address) => set.add(address).await?,
            Mutation::Remove(address) => set.remove(&address).await?,
            Mutation::Replace { old, new } => set.replace(&old, new).await?,
        };

        let tree = Arc::new(MerkleTree::build(Arc::clone(&addresses)));
        let root = tree.root();
        *self.commitment.write().await = tree;
        Ok((addresses, root))
    }

    /// Publishes whatever root is current once the publish lock is held.
    ///
    /// Re-reading the root under the lock means a publication that queued
    /// behind another carries the newest root, never an older one.
    async fn publish_current(&self) -> Publication {
        let _publishing = self.publish_lock.lock().await;

        let root = self.commitment().await.root();
        if self.sync.read().await.ledger_root() == root {
            self.sync.write().await.last_error = None;
            self.save_pending_record().await;
            return Publication::AlreadyPublished;
        }

        match self.publisher.publish(root).await {
            Ok(receipt) => {
                {
                    let mut sync = self.sync.write().await;
                    sync.confirmed = Some(receipt.to_record());
                    sync.last_error = None;
                }
                self.save_record(receipt.to_record()).await;
                Publication::Confirmed(receipt)
            },
            Err(error) => {
                warn!(
                    error = %error,
                    category = %error.category(),
                    local_root = %root,
                    "ledger diverged from local whitelist"
                );
                self.sync.write().await.last_error = Some(error.clone());
                Publication::Diverged { error }
            },
        }
    }

    /// Persists the confirmed record if an earlier save failed.
    async fn save_pending_record(&self) {
        let pending = {
            let sync = self.sync.read().await;
            sync.record_error.as_ref().and(sync.confirmed.clone())
        };
        if let Some(record) = pending {
            self.save_record(record).await;
        }
    }

    /// Saves a confirmed record. A failure is kept in the sync state until a
    /// later save succeeds.
    async fn save_record(&self, record: PublicationRecord) {
        let root = record.root;
        let outcome = self.store.save_publication(record).await;

        let mut sync = self.sync.write().await;
        match outcome {
            Ok(()) => sync.record_error = None,
            Err(error) => {
                warn!(error = %error, root = %root, "failed to persist publication record");
                sync.record_error = Some(error.to_string());
            },
        }
    }
}
