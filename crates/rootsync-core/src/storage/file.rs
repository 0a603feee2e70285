//! JSON file store.
//!
//! Keeps `whitelist.json` (pretty-printed array of canonical addresses) and
//! `publication.json` in a data directory. Writes go to a temporary sibling
//! file which is flushed and then renamed over the target, so readers never
//! observe a partially written list.

use std::path::{Path, PathBuf};

use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info};

use super::{AddressStore, StoreFuture};
use crate::{
    address::Address,
    error::{CoreError, Result},
    models::PublicationRecord,
};

const WHITELIST_FILE: &str = "whitelist.json";
const PUBLICATION_FILE: &str = "publication.json";

/// File-backed address store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct FileAddressStore {
    dir: PathBuf,
}

impl FileAddressStore {
    /// Opens a store in `dir`, creating the directory and an empty whitelist
    /// file if they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::StorageFailure` if the directory or initial file
    /// cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|e| {
            CoreError::storage(format!("failed to create data directory {}: {e}", dir.display()))
        })?;

        let store = Self { dir };
        if !fs::try_exists(store.whitelist_path()).await? {
            info!(path = %store.whitelist_path().display(), "initializing empty whitelist file");
            write_atomic(&store.whitelist_path(), b"[]").await?;
        }
        Ok(store)
    }

    /// Path of the persisted address list.
    pub fn whitelist_path(&self) -> PathBuf {
        self.dir.join(WHITELIST_FILE)
    }

    /// Path of the persisted publication record.
    pub fn publication_path(&self) -> PathBuf {
        self.dir.join(PUBLICATION_FILE)
    }
}

impl AddressStore for FileAddressStore {
    fn load_addresses(&self) -> StoreFuture<'_, Vec<Address>> {
        Box::pin(async move {
            match read_optional(&self.whitelist_path()).await? {
                Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
                None => Ok(Vec::new()),
            }
        })
    }

    fn save_addresses(&self, addresses: Vec<Address>) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let bytes = serde_json::to_vec_pretty(&addresses)?;
            write_atomic(&self.whitelist_path(), &bytes).await?;
            debug!(count = addresses.len(), "persisted whitelist");
            Ok(())
        })
    }

    fn load_publication(&self) -> StoreFuture<'_, Option<PublicationRecord>> {
        Box::pin(async move {
            match read_optional(&self.publication_path()).await? {
                Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
                None => Ok(None),
            }
        })
    }

    fn save_publication(&self, record: PublicationRecord) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let bytes = serde_json::to_vec_pretty(&record)?;
            write_atomic(&self.publication_path(), &bytes).await
        })
    }
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CoreError::storage(format!("failed to read {}: {e}", path.display()))),
    }
}

/// Writes `bytes` to a temporary sibling of `path`, syncs it, then renames it
/// over `path`.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| CoreError::storage(format!("invalid store path {}", path.display())))?;
    let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

    let write = async {
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp_path, path).await
    };

    if let Err(e) = write.await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(CoreError::storage(format!("failed to write {}: {e}", path.display())));
    }

    #[cfg(unix)]
    if let Some(parent) = path.parent() {
        if let Ok(dir) = fs::File::open(parent).await {
            let _ = dir.sync_all().await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::Root;

    fn addresses(inputs: &[&str]) -> Vec<Address> {
        inputs.iter().map(|s| Address::parse(s).unwrap()).collect()
    }

    #[tokio::test]
    async fn open_creates_empty_whitelist() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileAddressStore::open(dir.path().join("data")).await.unwrap();

        assert!(store.whitelist_path().exists());
        assert!(store.load_addresses().await.unwrap().is_empty());
        assert!(store.load_publication().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn saved_addresses_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileAddressStore::open(dir.path()).await.unwrap();
        store.save_addresses(addresses(&["0xAA", "0xbb"])).await.unwrap();

        let reopened = FileAddressStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.load_addresses().await.unwrap(), addresses(&["0xaa", "0xbb"]));
    }

    #[tokio::test]
    async fn persisted_file_is_pretty_canonical_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileAddressStore::open(dir.path()).await.unwrap();
        store.save_addresses(addresses(&["0xAA"])).await.unwrap();

        let raw = std::fs::read_to_string(store.whitelist_path()).unwrap();
        assert_eq!(raw, "[\n  \"0xaa\"\n]");
    }

    #[tokio::test]
    async fn temporary_file_removed_after_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileAddressStore::open(dir.path()).await.unwrap();
        store.save_addresses(addresses(&["0x01"])).await.unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn publication_record_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileAddressStore::open(dir.path()).await.unwrap();
        let record = PublicationRecord {
            root: Root([7; 32]),
            confirmation_id: "0xabc".to_string(),
            confirmed_at: Utc::now(),
        };

        store.save_publication(record.clone()).await.unwrap();
        assert_eq!(store.load_publication().await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn corrupt_file_reports_storage_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileAddressStore::open(dir.path()).await.unwrap();
        std::fs::write(store.whitelist_path(), "{not json").unwrap();

        let err = store.load_addresses().await.unwrap_err();
        assert!(matches!(err, CoreError::StorageFailure { .. }));
    }
}
