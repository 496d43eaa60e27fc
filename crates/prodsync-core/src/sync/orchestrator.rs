//! Sync orchestrator
//!
//! Runs one synchronization pass against a record store session:
//!
//! ```text
//! fetch_stale_records(now - 1h)
//!         │
//!         ├── empty ──────────────► SyncResult { success, 0 }
//!         ▼
//! SyncPolicy::apply + update_record (staged), per record
//!         │
//!         ▼
//! commit() ───────────────────────► SyncResult { success, n }
//!
//! any store error / cancellation ─► rollback() + SyncResult { failed }
//! ```
//!
//! Cancellation is honored up to the commit. A commit that has started
//! runs to completion, so a file store never stops between its temp file
//! write and the rename.
//!
//! Store failures never escape `run_sync`; they are reported through the
//! returned [`SyncResult`]. The job's retry policy therefore does not re-run
//! a pass that failed inside the store.

use chrono::{DateTime, Duration, Utc};
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{SyncPolicy, SyncResult};
use crate::error::{Error, Result};
use crate::events::{EventSink, SyncEvent};
use crate::traits::RecordStore;

/// Records not updated within this many minutes are due for a sync pass
pub const STALENESS_THRESHOLD_MINUTES: i64 = 60;

/// Oldest `updated_at` that still counts as fresh at `now`
pub fn stale_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::minutes(STALENESS_THRESHOLD_MINUTES)
}

/// Coordinates one fetch → transform → commit pass
#[derive(Debug, Clone)]
pub struct SyncOrchestrator {
    policy: SyncPolicy,
    events: EventSink,
}

impl SyncOrchestrator {
    pub fn new(events: EventSink) -> Self {
        Self {
            policy: SyncPolicy::new(),
            events,
        }
    }

    /// Run one sync pass
    ///
    /// The store session is used exclusively by this call. On failure the
    /// session's staged changes are rolled back.
    pub async fn run_sync(&self, store: &dyn RecordStore, cancel: &CancellationToken) -> SyncResult {
        let cutoff = stale_cutoff(Utc::now());
        info!("Starting data synchronization (cutoff {})", cutoff);
        self.events.emit(SyncEvent::SyncStarted { cutoff });

        match self.sync_stale(store, cutoff, cancel).await {
            Ok(records_synced) => {
                info!("Successfully synchronized {} records", records_synced);
                self.events.emit(SyncEvent::SyncCompleted { records_synced });
                SyncResult::synced(records_synced)
            }
            Err(e) => {
                if let Err(rollback_err) = store.rollback().await {
                    warn!("Failed to discard staged changes: {}", rollback_err);
                }
                error!("Data synchronization failed: {}", e);
                let message = e.to_string();
                self.events.emit(SyncEvent::SyncFailed {
                    error: message.clone(),
                });
                SyncResult::failed(message)
            }
        }
    }

    async fn sync_stale(
        &self,
        store: &dyn RecordStore,
        cutoff: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let products = cancellable(cancel, store.fetch_stale_records(cutoff)).await?;
        info!("Retrieved {} products for sync", products.len());

        if products.is_empty() {
            return Ok(0);
        }

        let count = products.len();
        for mut product in products {
            if cancel.is_cancelled() {
                return Err(Error::cancelled("sync cancelled"));
            }

            let outcome = self.policy.apply(&mut product, Utc::now());
            if let Some((old_price, new_price)) = outcome.price_change {
                debug!(
                    "Price adjusted for '{}': {} -> {}",
                    product.name, old_price, new_price
                );
                self.events.emit(SyncEvent::PriceAdjusted {
                    id: product.id,
                    old_price,
                    new_price,
                });
            }
            if outcome.description_trimmed {
                debug!("Description normalized for '{}'", product.name);
            }

            store.update_record(product).await?;
        }

        if cancel.is_cancelled() {
            return Err(Error::cancelled("sync cancelled"));
        }
        let written = store.commit().await?;
        if written != count {
            debug!("Commit wrote {} rows for {} processed records", written, count);
        }

        Ok(count)
    }
}

/// Race `fut` against cancellation
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::cancelled("sync cancelled")),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewProduct, Price, Product, ProductId};
    use crate::store::MemoryRecordStore;
    use async_trait::async_trait;

    /// Cancels the pass from inside `commit`, then finishes the commit
    struct CancelDuringCommit {
        inner: MemoryRecordStore,
        cancel: CancellationToken,
    }

    #[async_trait]
    impl RecordStore for CancelDuringCommit {
        async fn fetch_stale_records(&self, older_than: DateTime<Utc>) -> Result<Vec<Product>> {
            self.inner.fetch_stale_records(older_than).await
        }

        async fn get_record(&self, id: ProductId) -> Result<Option<Product>> {
            self.inner.get_record(id).await
        }

        async fn list_records(&self) -> Result<Vec<Product>> {
            self.inner.list_records().await
        }

        async fn add_record(&self, product: Product) -> Result<()> {
            self.inner.add_record(product).await
        }

        async fn update_record(&self, product: Product) -> Result<()> {
            self.inner.update_record(product).await
        }

        async fn commit(&self) -> Result<usize> {
            self.cancel.cancel();
            tokio::task::yield_now().await;
            self.inner.commit().await
        }

        async fn rollback(&self) -> Result<()> {
            self.inner.rollback().await
        }
    }

    #[tokio::test]
    async fn cancellation_during_commit_keeps_the_commit() {
        let product = Product::create(NewProduct::new("Cable", Price::new(5, 0))).unwrap();
        let cancel = CancellationToken::new();
        let store = CancelDuringCommit {
            inner: MemoryRecordStore::with_records([product.clone()]),
            cancel: cancel.clone(),
        };

        let result = SyncOrchestrator::new(EventSink::disabled())
            .run_sync(&store, &cancel)
            .await;

        assert!(cancel.is_cancelled());
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.records_synced, 1);
        let stored = store.get_record(product.id).await.unwrap().unwrap();
        assert_eq!(stored.price, Price::new(5, 25));
        assert!(stored.updated_at.is_some());
    }

    #[tokio::test]
    async fn cancelled_before_start_commits_nothing() {
        let product = Product::create(NewProduct::new("Cable", Price::new(5, 0))).unwrap();
        let store = MemoryRecordStore::with_records([product.clone()]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = SyncOrchestrator::new(EventSink::disabled())
            .run_sync(&store, &cancel)
            .await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Cancelled: sync cancelled"));
        let stored = store.get_record(product.id).await.unwrap().unwrap();
        assert_eq!(stored, product);
        assert_eq!(store.staged_len().await, 0);
    }
}
