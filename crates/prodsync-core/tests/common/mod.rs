//! Test doubles and common utilities for contract tests
//!
//! The doubles wrap a real `MemoryRecordStore` and add call counters,
//! scripted failures and a gate that holds `fetch_stale_records` open so a
//! run can be observed while it is in flight.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use prodsync_core::error::{Error, Result};
use prodsync_core::events::SyncEvent;
use prodsync_core::model::{NewProduct, Price, Product, ProductId};
use prodsync_core::store::MemoryRecordStore;
use prodsync_core::traits::{RecordStore, RecordStoreFactory};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Notify, mpsc};

/// Shared call counters for every session opened by a factory
#[derive(Debug, Clone, Default)]
pub struct StoreCalls {
    pub open_calls: Arc<AtomicUsize>,
    pub fetch_calls: Arc<AtomicUsize>,
    pub update_calls: Arc<AtomicUsize>,
    pub commit_calls: Arc<AtomicUsize>,
    pub rollback_calls: Arc<AtomicUsize>,
}

impl StoreCalls {
    pub fn opens(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollback_calls.load(Ordering::SeqCst)
    }
}

/// Failure script shared by a factory and its sessions
#[derive(Debug, Default)]
pub struct Script {
    /// Remaining `open()` calls that fail
    pub open_failures: AtomicUsize,
    /// Fail `open()` with a permanent error instead of a transient one
    pub open_failure_permanent: AtomicBool,
    pub fail_fetch: AtomicBool,
    pub fail_commit: AtomicBool,
    /// When set, `fetch_stale_records` waits for `release_fetch`
    pub gate_fetch: AtomicBool,
    pub fetch_gate: Notify,
}

/// A record store session that counts calls and follows a [`Script`]
pub struct ScriptedStore {
    inner: MemoryRecordStore,
    calls: StoreCalls,
    script: Arc<Script>,
}

#[async_trait]
impl RecordStore for ScriptedStore {
    async fn fetch_stale_records(&self, older_than: DateTime<Utc>) -> Result<Vec<Product>> {
        self.calls.fetch_calls.fetch_add(1, Ordering::SeqCst);

        if self.script.gate_fetch.load(Ordering::SeqCst) {
            self.script.fetch_gate.notified().await;
        }
        if self.script.fail_fetch.load(Ordering::SeqCst) {
            return Err(Error::store("connection reset while reading products"));
        }

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
        self.calls.update_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.update_record(product).await
    }

    async fn commit(&self) -> Result<usize> {
        self.calls.commit_calls.fetch_add(1, Ordering::SeqCst);

        if self.script.fail_commit.load(Ordering::SeqCst) {
            self.inner.rollback().await?;
            return Err(Error::store("write conflict"));
        }
        self.inner.commit().await
    }

    async fn rollback(&self) -> Result<()> {
        self.calls.rollback_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.rollback().await
    }
}

/// Opens [`ScriptedStore`] sessions over one shared memory store
pub struct ScriptedStoreFactory {
    store: MemoryRecordStore,
    pub calls: StoreCalls,
    pub script: Arc<Script>,
}

impl ScriptedStoreFactory {
    pub fn new(records: impl IntoIterator<Item = Product>) -> Self {
        Self {
            store: MemoryRecordStore::with_records(records),
            calls: StoreCalls::default(),
            script: Arc::new(Script::default()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::<Product>::new())
    }

    /// Fail the next `n` opens with a transient error
    pub fn failing_opens(self, n: usize) -> Self {
        self.script.open_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Fail every open with a permanent error
    pub fn permanently_failing_opens(self) -> Self {
        self.script.open_failures.store(usize::MAX, Ordering::SeqCst);
        self.script
            .open_failure_permanent
            .store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_fetch(self) -> Self {
        self.script.fail_fetch.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_commit(self) -> Self {
        self.script.fail_commit.store(true, Ordering::SeqCst);
        self
    }

    /// Hold every fetch until [`release_fetch`](Self::release_fetch)
    pub fn gated_fetch(self) -> Self {
        self.script.gate_fetch.store(true, Ordering::SeqCst);
        self
    }

    pub fn release_fetch(&self) {
        self.script.gate_fetch.store(false, Ordering::SeqCst);
        self.script.fetch_gate.notify_waiters();
        self.script.fetch_gate.notify_one();
    }

    /// Committed state, bypassing the call counters
    pub fn store(&self) -> &MemoryRecordStore {
        &self.store
    }

    /// A session over the shared store, for calling the orchestrator directly
    pub fn session(&self) -> ScriptedStore {
        ScriptedStore {
            inner: self.store.session(),
            calls: self.calls.clone(),
            script: Arc::clone(&self.script),
        }
    }
}

#[async_trait]
impl RecordStoreFactory for ScriptedStoreFactory {
    async fn open(&self) -> Result<Box<dyn RecordStore>> {
        self.calls.open_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.script.open_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != usize::MAX {
                self.script.open_failures.store(remaining - 1, Ordering::SeqCst);
            }
            if self.script.open_failure_permanent.load(Ordering::SeqCst) {
                return Err(Error::config("store credentials rejected"));
            }
            return Err(Error::store_unavailable("database is starting up"));
        }

        Ok(Box::new(self.session()))
    }
}

/// A valid product with the given price and last update
pub fn product(name: &str, cents: i64, updated_at: Option<DateTime<Utc>>) -> Product {
    let mut product = Product::create(NewProduct::new(name, Price::from_cents(cents)))
        .expect("valid test product");
    product.updated_at = updated_at;
    product
}

/// A product that was last updated two hours ago
pub fn stale_product(name: &str, cents: i64) -> Product {
    product(name, cents, Some(Utc::now() - Duration::hours(2)))
}

/// A product updated ten minutes ago
pub fn fresh_product(name: &str, cents: i64) -> Product {
    product(name, cents, Some(Utc::now() - Duration::minutes(10)))
}

/// Drain every event currently buffered in `rx`
pub fn drain_events(rx: &mut mpsc::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Wait until `condition` holds, yielding to other tasks in between
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition met within 5 seconds");
}
