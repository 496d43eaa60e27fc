// # Record Store Trait
//
// Defines the interface for product persistence used by the sync workflow.
//
// ## Purpose
//
// The record store owns product rows. The sync orchestrator reads the
// records that are due for a sync pass, stages its modifications and then
// commits them in one operation.
//
// ## Unit of work
//
// Writes are staged, not applied. `commit()` applies every staged change
// or none of them; `rollback()` discards the staged set. Reads always see
// committed state only.
//
// ## Implementations
//
// - Memory: `MemoryRecordStore`
// - File: `FileRecordStore` (JSON, atomic rename)
//
// ## Usage
//
// ```rust,ignore
// use prodsync_core::RecordStore;
//
// let stale = store.fetch_stale_records(cutoff).await?;
// for mut product in stale {
//     product.updated_at = Some(chrono::Utc::now());
//     store.update_record(product).await?;
// }
// let written = store.commit().await?;
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{Product, ProductId};

/// Trait for record store implementations
///
/// One instance is a session: the sync job opens a fresh one per
/// invocation through a [`RecordStoreFactory`] and drops it afterwards, so
/// the staged set is never shared between two runs.
///
/// # Thread Safety
///
/// Methods take `&self`; implementations guard their staged set internally.
///
/// ## Implementation Guidelines
///
/// - **Async I/O only**: never block the runtime
/// - **All-or-nothing commit**: a failed commit leaves committed state untouched
/// - **No business logic**: price and text rules live in `SyncPolicy`
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch records whose `updated_at` is `None` or strictly older than `older_than`
    ///
    /// Order of the returned records is unspecified.
    async fn fetch_stale_records(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<Product>, crate::Error>;

    /// Get one committed record
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Product))`: The record
    /// - `Ok(None)`: No record with this id
    /// - `Err(Error)`: Storage error
    async fn get_record(&self, id: ProductId) -> Result<Option<Product>, crate::Error>;

    /// List all committed records
    async fn list_records(&self) -> Result<Vec<Product>, crate::Error>;

    /// Stage an insert of a new record
    ///
    /// Fails with `Error::Constraint` at commit time if the id already exists.
    async fn add_record(&self, product: Product) -> Result<(), crate::Error>;

    /// Stage an update of an existing record
    ///
    /// Fails with `Error::Constraint` at commit time if the id does not exist.
    async fn update_record(&self, product: Product) -> Result<(), crate::Error>;

    /// Apply all staged changes atomically
    ///
    /// # Returns
    ///
    /// - `Ok(usize)`: Number of records written
    /// - `Err(Error)`: Nothing was written; staged changes are discarded
    async fn commit(&self) -> Result<usize, crate::Error>;

    /// Discard all staged changes
    async fn rollback(&self) -> Result<(), crate::Error>;
}

/// Opens record store sessions
///
/// Opening may fail transiently (e.g. the backing file or database is
/// briefly unavailable). Those failures happen before the orchestrator
/// runs and are retried by the job's `RetryPolicy`.
#[async_trait]
pub trait RecordStoreFactory: Send + Sync {
    /// Open a session for one sync invocation
    async fn open(&self) -> Result<Box<dyn RecordStore>, crate::Error>;
}
