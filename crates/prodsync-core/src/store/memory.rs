// # Memory Record Store
//
// In-memory implementation of RecordStore.
//
// ## Purpose
//
// Provides a simple, fast record store that doesn't persist across restarts.
// Useful for testing and for running the daemon against seeded demo data.
//
// ## Sessions
//
// Committed records live behind a shared `Arc<RwLock<..>>`. Each session
// (see `MemoryRecordStore::session`) has its own staging area, so two
// sessions never see each other's uncommitted changes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::{StagedChange, apply_staged, stale_records};
use crate::Error;
use crate::model::{Product, ProductId};
use crate::traits::{RecordStore, RecordStoreFactory};

/// In-memory record store implementation
///
/// # Example
///
/// ```rust,no_run
/// use prodsync_core::model::{NewProduct, Price, Product};
/// use prodsync_core::store::MemoryRecordStore;
/// use prodsync_core::traits::RecordStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryRecordStore::new();
///
///     let product = Product::create(NewProduct::new("USB-C Hub", Price::new(79, 99)))?;
///     store.add_record(product).await?;
///     assert_eq!(store.commit().await?, 1);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MemoryRecordStore {
    committed: Arc<RwLock<HashMap<ProductId, Product>>>,
    staged: Mutex<Vec<StagedChange>>,
}

impl MemoryRecordStore {
    /// Create a new empty memory record store
    pub fn new() -> Self {
        Self {
            committed: Arc::new(RwLock::new(HashMap::new())),
            staged: Mutex::new(Vec::new()),
        }
    }

    /// Create a store pre-populated with committed records
    pub fn with_records(records: impl IntoIterator<Item = Product>) -> Self {
        let map = records.into_iter().map(|p| (p.id, p)).collect();
        Self {
            committed: Arc::new(RwLock::new(map)),
            staged: Mutex::new(Vec::new()),
        }
    }

    /// Open another session over the same committed records
    pub fn session(&self) -> Self {
        Self {
            committed: Arc::clone(&self.committed),
            staged: Mutex::new(Vec::new()),
        }
    }

    /// Get the number of committed records
    pub async fn len(&self) -> usize {
        self.committed.read().await.len()
    }

    /// Check if the store has no committed records
    pub async fn is_empty(&self) -> bool {
        self.committed.read().await.is_empty()
    }

    /// Number of changes waiting for commit in this session
    pub async fn staged_len(&self) -> usize {
        self.staged.lock().await.len()
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
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
        *guard = next;

        Ok(staged.len())
    }

    async fn rollback(&self) -> Result<(), Error> {
        self.staged.lock().await.clear();
        Ok(())
    }
}

/// Opens sessions over one shared [`MemoryRecordStore`]
#[derive(Debug, Default)]
pub struct MemoryRecordStoreFactory {
    store: MemoryRecordStore,
}

impl MemoryRecordStoreFactory {
    pub fn new(store: MemoryRecordStore) -> Self {
        Self { store }
    }

    /// The backing store (e.g. for seeding or inspection)
    pub fn store(&self) -> &MemoryRecordStore {
        &self.store
    }
}

#[async_trait]
impl RecordStoreFactory for MemoryRecordStoreFactory {
    async fn open(&self) -> Result<Box<dyn RecordStore>, Error> {
        Ok(Box::new(self.store.session()))
    }
}
