//! Storage abstraction for the persisted whitelist.
//!
//! The address list is always read and written whole. Implementations must
//! make `save_addresses` atomic: after a crash the durable state is either
//! the previous list or the new one, never a partial write. The production
//! implementation is the JSON file store; tests use the in-memory mock with
//! failure injection.

use std::{future::Future, pin::Pin, sync::Arc};

use crate::{address::Address, error::Result, models::PublicationRecord};

mod file;

pub use file::FileAddressStore;

/// Boxed future returned by storage operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Durable store for the ordered address list and the publication record.
pub trait AddressStore: Send + Sync + 'static {
    /// Reads the whole persisted address list, in order.
    ///
    /// A store with no persisted list returns an empty vector.
    fn load_addresses(&self) -> StoreFuture<'_, Vec<Address>>;

    /// Atomically replaces the persisted address list.
    fn save_addresses(&self, addresses: Vec<Address>) -> StoreFuture<'_, ()>;

    /// Reads the last persisted publication record, if any.
    fn load_publication(&self) -> StoreFuture<'_, Option<PublicationRecord>>;

    /// Atomically replaces the persisted publication record.
    fn save_publication(&self, record: PublicationRecord) -> StoreFuture<'_, ()>;
}

impl<S: AddressStore + ?Sized> AddressStore for Arc<S> {
    fn load_addresses(&self) -> StoreFuture<'_, Vec<Address>> {
        (**self).load_addresses()
    }

    fn save_addresses(&self, addresses: Vec<Address>) -> StoreFuture<'_, ()> {
        (**self).save_addresses(addresses)
    }

    fn load_publication(&self) -> StoreFuture<'_, Option<PublicationRecord>> {
        (**self).load_publication()
    }

    fn save_publication(&self, record: PublicationRecord) -> StoreFuture<'_, ()> {
        (**self).save_publication(record)
    }
}

pub mod mock {
    //! In-memory store for tests.
    //!
    //! Behaves like a durable store that always writes atomically, and can be
    //! told to fail the next address or publication write to exercise
    //! storage-failure paths.

    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use tokio::sync::RwLock;

    use super::{Address, AddressStore, PublicationRecord, StoreFuture};
    use crate::error::CoreError;

    /// In-memory address store with failure injection.
    ///
    /// Cloning shares the underlying state, so a test can hand one clone to
    /// the service and inspect the other.
    #[derive(Debug, Clone, Default)]
    pub struct MemoryAddressStore {
        addresses: Arc<RwLock<Vec<Address>>>,
        publication: Arc<RwLock<Option<PublicationRecord>>>,
        save_error: Arc<RwLock<Option<String>>>,
        publication_error: Arc<RwLock<Option<String>>>,
        saves: Arc<AtomicUsize>,
    }

    impl MemoryAddressStore {
        /// Creates an empty store.
        pub fn new() -> Self {
            Self::default()
        }

        /// Creates a store pre-populated with addresses.
        pub fn with_addresses(addresses: Vec<Address>) -> Self {
            Self { addresses: Arc::new(RwLock::new(addresses)), ..Self::default() }
        }

        /// Makes the next `save_addresses` call fail.
        pub async fn inject_save_error(&self, message: impl Into<String>) {
            *self.save_error.write().await = Some(message.into());
        }

        /// Makes the next `save_publication` call fail.
        pub async fn inject_publication_save_error(&self, message: impl Into<String>) {
            *self.publication_error.write().await = Some(message.into());
        }

        /// Returns the persisted address list.
        pub async fn persisted(&self) -> Vec<Address> {
            self.addresses.read().await.clone()
        }

        /// Returns the persisted publication record.
        pub async fn persisted_publication(&self) -> Option<PublicationRecord> {
            self.publication.read().await.clone()
        }

        /// Number of successful address list writes.
        pub fn save_count(&self) -> usize {
            self.saves.load(Ordering::Acquire)
        }
    }

    impl AddressStore for MemoryAddressStore {
        fn load_addresses(&self) -> StoreFuture<'_, Vec<Address>> {
            Box::pin(async move { Ok(self.addresses.read().await.clone()) })
        }

        fn save_addresses(&self, addresses: Vec<Address>) -> StoreFuture<'_, ()> {
            Box::pin(async move {
                if let Some(message) = self.save_error.write().await.take() {
                    return Err(CoreError::storage(message));
                }
                *self.addresses.write().await = addresses;
                self.saves.fetch_add(1, Ordering::AcqRel);
                Ok(())
            })
        }

        fn load_publication(&self) -> StoreFuture<'_, Option<PublicationRecord>> {
            Box::pin(async move { Ok(self.publication.read().await.clone()) })
        }

        fn save_publication(&self, record: PublicationRecord) -> StoreFuture<'_, ()> {
            Box::pin(async move {
                if let Some(message) = self.publication_error.write().await.take() {
                    return Err(CoreError::storage(message));
                }
                *self.publication.write().await = Some(record);
                Ok(())
            })
        }
    }
}
