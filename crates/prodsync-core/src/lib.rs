// # prodsync-core
//
// Core library for periodic product-record synchronization.
//
// ## Architecture Overview
//
// - **RecordStore**: Trait for the product store (stale fetch, staged writes, atomic commit)
// - **SyncPolicy**: Pure per-record business rules
// - **SyncOrchestrator**: One fetch → transform → commit pass, reported as a `SyncResult`
// - **RetryPolicy**: Bounded retry with jittered exponential backoff
// - **Scheduler**: Fixed-interval ticks with named job locks so runs never overlap
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Business rules are separate from storage
// 2. **Library-First**: All core functionality can be used as a library
// 3. **Failures Are Values**: A failed pass is reported, not thrown at the scheduler
// 4. **All-or-Nothing**: A pass either commits every staged record or none

pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod resilience;
pub mod scheduler;
pub mod seed;
pub mod store;
pub mod sync;
pub mod traits;
pub mod validation;

// Re-export core types for convenience
pub use config::{JobConfig, StoreConfig, SyncConfig};
pub use error::{Error, Result};
pub use events::{EventSink, SyncEvent};
pub use model::{NewProduct, Price, Product, ProductId};
pub use resilience::{RetryPolicy, RetryState};
pub use scheduler::{DATA_SYNC_JOB, JobLocks, Scheduler, SyncJob};
pub use store::{FileRecordStore, FileRecordStoreFactory, MemoryRecordStore, MemoryRecordStoreFactory};
pub use sync::{SyncOrchestrator, SyncPolicy, SyncResult};
pub use traits::{RecordStore, RecordStoreFactory};
pub use validation::{FieldError, ValidationErrors};
