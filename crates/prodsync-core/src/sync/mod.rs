//! Data synchronization workflow
//!
//! - [`SyncPolicy`]: per-record business rules
//! - [`SyncOrchestrator`]: one fetch → transform → commit pass
//! - [`SyncResult`]: the outcome value of a pass

pub mod orchestrator;
pub mod policy;

pub use orchestrator::{STALENESS_THRESHOLD_MINUTES, SyncOrchestrator, stale_cutoff};
pub use policy::{PolicyOutcome, SyncPolicy};

use serde::{Deserialize, Serialize};

/// Outcome of one orchestrator invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub success: bool,
    pub records_synced: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncResult {
    /// A successful pass over `records_synced` records
    pub fn synced(records_synced: usize) -> Self {
        Self {
            success: true,
            records_synced,
            error: None,
        }
    }

    /// A failed pass; nothing was committed by it
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            records_synced: 0,
            error: Some(error.into()),
        }
    }
}
