// # File Record Store
//
// File-based implementation of RecordStore with crash recovery.
//
// ## Purpose
//
// Persists product records across daemon restarts without a database.
//
// ## Crash Recovery
//
// - Atomic commits: the next state is written to a temp file, then renamed
// - Automatic backup: keeps `.backup` of the last committed file
// - Corruption detection: JSON is validated on load
// - Recovery: falls back to the backup if the main file is corrupted
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "products": [
//     {
//       "id": "11111111-1111-1111-1111-111111111111",
//       "name": "Laptop Pro 15",
//       "description": "High-performance laptop",
//       "price": "1299.99",
//       "created_at": "2025-01-09T12:00:00Z",
//       "updated_at": null
//     }
//   ]
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, OnceCell, RwLock};

use super::{StagedChange, apply_staged, stale_records};
use crate::Error;
use crate::model::{Product, ProductId};
use crate::traits::{RecordStore, RecordStoreFactory};

/// Record file format version
const STORE_FILE_VERSION: &str = "1.0";

/// Serializable record file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct StoreFileFormat {
    version: String,
    products: Vec<Product>,
}

/// File-based record store with atomic commits
///
/// # Example
///
/// ```rust,no_run
/// use prodsync_core::store::FileRecordStore;
/// use prodsync_core::traits::RecordStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileRecordStore::open("/var/lib/prodsync/products.json").await?;
///     let products = store.list_records().await?;
///     println!("{} products", products.len());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileRecordStore {
    path: PathBuf,
    committed: Arc<RwLock<HashMap<ProductId, Product>>>,
    staged: Mutex<Vec<StagedChange>>,
}

impl FileRecordStore {
    /// Create or load a file record store
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Try to load the existing file
    /// 3. If corruption is detected, try to load from backup
    /// 4. If both fail, start empty
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::store_unavailable(format!(
                    "Failed to create store directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let records = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            committed: Arc::new(RwLock::new(records)),
            staged: Mutex::new(Vec::new()),
        })
    }

    /// Open another session over the same committed records and file
    pub fn session(&self) -> Self {
        Self {
            path: self.path.clone(),
            committed: Arc::clone(&self.committed),
            staged: Mutex::new(Vec::new()),
        }
    }

    /// Path of the record file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load records with automatic recovery from backup
    async fn load_with_recovery(path: &Path) -> Result<HashMap<ProductId, Product>, Error> {
        let err = match Self::load(path).await {
            Ok(records) => {
                tracing::debug!("Loaded record file: {} products", records.len());
                return Ok(records);
            }
            Err(err) => err,
        };

        // Only parse failures count as corruption; I/O errors propagate
        if !matches!(err, Error::Json(_)) {
            return Err(err);
        }

        tracing::warn!("Record file appears corrupted: {}. Attempting recovery from backup.", err);

        let backup_path = Self::backup_path(path);
        if !backup_path.exists() {
            tracing::warn!("No backup file found. Starting with empty store.");
            return Ok(HashMap::new());
        }

        match Self::load(&backup_path).await {
            Ok(records) => {
                tracing::info!("Recovered record file from backup: {} products", records.len());
                if let Err(restore_err) = fs::copy(&backup_path, path).await {
                    tracing::error!("Failed to restore record file from backup: {}", restore_err);
                }
                Ok(records)
            }
            Err(backup_err) => {
                tracing::error!("Backup also corrupted: {}. Starting with empty store.", backup_err);
                Ok(HashMap::new())
            }
        }
    }

    /// Load records from one file
    async fn load(path: &Path) -> Result<HashMap<ProductId, Product>, Error> {
        if !path.exists() {
            tracing::debug!("Record file does not exist: {}", path.display());
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::store_unavailable(format!("Failed to read record file {}: {}", path.display(), e))
        })?;

        let file: StoreFileFormat = serde_json::from_str(&content)?;

        if file.version != STORE_FILE_VERSION {
            tracing::warn!(
                "Record file version mismatch: expected {}, got {}. Attempting to load anyway.",
                STORE_FILE_VERSION,
                file.version
            );
        }

        Ok(file.products.into_iter().map(|p| (p.id, p)).collect())
    }

    /// Write `records` to the file atomically
    async fn write(&self, records: &HashMap<ProductId, Product>) -> Result<(), Error> {
        let mut products: Vec<Product> = records.values().cloned().collect();
        products.sort_by_key(|p| p.id);

        let file = StoreFileFormat {
            version: STORE_FILE_VERSION.to_string(),
            products,
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| Error::store(format!("Failed to serialize records: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut out = fs::File::create(&temp_path).await.map_err(|e| {
                Error::store(format!("Failed to create temp file {}: {}", temp_path.display(), e))
            })?;
            out.write_all(json.as_bytes()).await.map_err(|e| {
                Error::store(format!("Failed to write temp file {}: {}", temp_path.display(), e))
            })?;
            out.flush().await.map_err(|e| {
                Error::store(format!("Failed to flush temp file {}: {}", temp_path.display(), e))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Record file written: {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn fetch_stale_records(&self, older_than: DateTime<Utc>) -> Result<Vec<Product>, Error> {
        let guard = self.committed.read().await;
        Ok(stale_records(&guard, older_than))
    }

    async fn get_record(&self, id: ProductId) -> Result<Option<Product>, Error> {
        let guard = self.committed.read().await;
        Ok(guard.get(&id).cloned())
    }

    async fn list_records(&self) -> Result<Vec<Product>, Error> {
        let guard = self.committed.read().await;
        Ok(guard.values().cloned().collect())
    }

    async fn add_record(&self, product: Product) -> Result<(), Error> {
        self.staged.lock().await.push(StagedChange::Insert(product));
        Ok(())
    }

    async fn update_record(&self, product: Product) -> Result<(), Error> {
        self.staged.lock().await.push(StagedChange::Update(product));
        Ok(())
    }

    async fn commit(&self) -> Result<usize, Error> {
        let staged = std::mem::take(&mut *self.staged.lock().await);
        if staged.is_empty() {
            return Ok(0);
        }

        let mut guard = self.committed.write().await;
        let next = apply_staged(&guard, &staged)?;

        // In-memory state only moves once the file is in place
        self.write(&next).await?;
        *guard = next;

        Ok(staged.len())
    }

    async fn rollback(&self) -> Result<(), Error> {
        self.staged.lock().await.clear();
        Ok(())
    }
}

/// Opens sessions over a record file, loading it on first use
///
/// A failed load is not cached: the next `open()` tries again.
#[derive(Debug)]
pub struct FileRecordStoreFactory {
    path: PathBuf,
    store: OnceCell<FileRecordStore>,
}

impl FileRecordStoreFactory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            store: OnceCell::new(),
        }
    }
}

#[async_trait]
impl RecordStoreFactory for FileRecordStoreFactory {
    async fn open(&self) -> Result<Box<dyn RecordStore>, Error> {
        let store = self
            .store
            .get_or_try_init(|| FileRecordStore::open(&self.path))
            .await?;
        Ok(Box::new(store.session()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewProduct, Price};
    use tempfile::tempdir;

    fn product(name: &str, cents: i64) -> Product {
        Product::create(NewProduct::new(name, Price::from_cents(cents))).unwrap()
    }

    #[tokio::test]
    async fn test_file_store_persists_commit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("products.json");

        let store = FileRecordStore::open(&path).await.unwrap();
        assert!(store.list_records().await.unwrap().is_empty());

        let p = product("Laptop Pro 15", 129999);
        store.add_record(p.clone()).await.unwrap();
        assert_eq!(store.commit().await.unwrap(), 1);
        assert!(path.exists());

        let reloaded = FileRecordStore::open(&path).await.unwrap();
        assert_eq!(reloaded.get_record(p.id).await.unwrap(), Some(p));
    }

    #[tokio::test]
    async fn test_file_store_failed_commit_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("products.json");

        let store = FileRecordStore::open(&path).await.unwrap();
        let p = product("Mouse", 4999);
        store.add_record(p.clone()).await.unwrap();
        store.commit().await.unwrap();

        // Duplicate insert violates the id constraint
        let mut renamed = p.clone();
        renamed.name = "Mouse v2".to_string();
        store.update_record(renamed).await.unwrap();
        store.add_record(p.clone()).await.unwrap();
        assert!(matches!(store.commit().await, Err(Error::Constraint(_))));

        let reloaded = FileRecordStore::open(&path).await.unwrap();
        assert_eq!(reloaded.get_record(p.id).await.unwrap().unwrap().name, "Mouse");
    }

    #[tokio::test]
    async fn test_file_store_rollback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("products.json");

        let store = FileRecordStore::open(&path).await.unwrap();
        store.add_record(product("Draft", 100)).await.unwrap();
        store.rollback().await.unwrap();
        assert_eq!(store.commit().await.unwrap(), 0);
        assert!(store.list_records().await.unwrap().is_empty());
        assert!(!path.exists(), "rolled back insert never reaches disk");

        let p = product("Monitor", 24999);
        store.add_record(p.clone()).await.unwrap();
        store.commit().await.unwrap();

        let mut repriced = p.clone();
        repriced.price = Price::from_cents(1);
        store.update_record(repriced).await.unwrap();
        store.rollback().await.unwrap();
        assert_eq!(store.commit().await.unwrap(), 0);

        assert_eq!(store.get_record(p.id).await.unwrap(), Some(p.clone()));
        let reloaded = FileRecordStore::open(&path).await.unwrap();
        assert_eq!(reloaded.get_record(p.id).await.unwrap(), Some(p));
    }

    #[tokio::test]
    async fn test_file_store_corruption_recovery() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("products.json");

        let store = FileRecordStore::open(&path).await.unwrap();
        let first = product("First", 100);
        store.add_record(first.clone()).await.unwrap();
        store.commit().await.unwrap();

        // Second commit creates the backup of the first
        store.add_record(product("Second", 200)).await.unwrap();
        store.commit().await.unwrap();
        assert!(FileRecordStore::backup_path(&path).exists());

        fs::write(&path, b"corrupted json data").await.unwrap();

        let recovered = FileRecordStore::open(&path).await.unwrap();
        let records = recovered.list_records().await.unwrap();
        assert_eq!(records, vec![first]);
    }

    #[tokio::test]
    async fn test_file_factory_shares_committed_state() {
        let dir = tempdir().unwrap();
        let factory = FileRecordStoreFactory::new(dir.path().join("nested/products.json"));

        let writer = factory.open().await.unwrap();
        writer.add_record(product("Hub", 7999)).await.unwrap();
        writer.commit().await.unwrap();

        let reader = factory.open().await.unwrap();
        assert_eq!(reader.list_records().await.unwrap().len(), 1);
    }
}
