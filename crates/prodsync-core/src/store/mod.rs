// # Record Store Implementations
//
// This module provides implementations of the RecordStore trait for
// different persistence strategies, plus the staging logic they share.

pub mod file;
pub mod memory;

pub use file::{FileRecordStore, FileRecordStoreFactory};
pub use memory::{MemoryRecordStore, MemoryRecordStoreFactory};

use std::collections::HashMap;

use crate::Error;
use crate::model::{Product, ProductId};

/// A change waiting for `commit()`
#[derive(Debug, Clone)]
pub(crate) enum StagedChange {
    Insert(Product),
    Update(Product),
}

/// Apply `staged` on top of `committed`, producing the next committed state
///
/// Every change is checked before anything is applied, so the caller
/// either gets a complete new state or an error and no partial result.
pub(crate) fn apply_staged(
    committed: &HashMap<ProductId, Product>,
    staged: &[StagedChange],
) -> Result<HashMap<ProductId, Product>, Error> {
    let mut next = committed.clone();

    for change in staged {
        match change {
            StagedChange::Insert(product) => {
                if next.contains_key(&product.id) {
                    return Err(Error::constraint(format!(
                        "product {} already exists",
                        product.id
                    )));
                }
                next.insert(product.id, product.clone());
            }
            StagedChange::Update(product) => {
                match next.get_mut(&product.id) {
                    Some(slot) => *slot = product.clone(),
                    None => {
                        return Err(Error::constraint(format!(
                            "product {} does not exist",
                            product.id
                        )));
                    }
                }
            }
        }
    }

    Ok(next)
}

/// Committed records matching the staleness predicate
pub(crate) fn stale_records(
    committed: &HashMap<ProductId, Product>,
    older_than: chrono::DateTime<chrono::Utc>,
) -> Vec<Product> {
    committed
        .values()
        .filter(|p| p.is_stale(older_than))
        .cloned()
        .collect()
}
