//! Core traits for the product sync system
//!
//! - [`RecordStore`]: Product persistence with staged, atomic commits
//! - [`RecordStoreFactory`]: Opens one store session per sync run

pub mod record_store;

pub use record_store::{RecordStore, RecordStoreFactory};
