//! Structured events emitted by the sync workflow
//!
//! Components receive an [`EventSink`] at construction instead of reaching
//! for shared global state. The sink is a bounded channel; when the
//! consumer falls behind, events are dropped with a warning rather than
//! blocking a sync run.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

use crate::model::{Price, ProductId};

/// Events emitted by the orchestrator, retry policy, job and scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A sync pass started
    SyncStarted {
        cutoff: DateTime<Utc>,
    },

    /// A record's price was adjusted by the policy
    PriceAdjusted {
        id: ProductId,
        old_price: Price,
        new_price: Price,
    },

    /// A sync pass committed successfully
    SyncCompleted {
        records_synced: usize,
    },

    /// A sync pass failed and was converted into a failed result
    SyncFailed {
        error: String,
    },

    /// A transient failure will be retried after `delay`
    RetryScheduled {
        attempt: u32,
        delay: Duration,
        error: String,
    },

    /// Retries are used up
    RetryExhausted {
        attempts: u32,
        error: String,
    },

    /// A job invocation started
    JobStarted {
        job: String,
    },

    /// A job invocation finished with a successful sync result
    JobSucceeded {
        job: String,
        records_synced: usize,
    },

    /// A job invocation finished but the sync reported a failure
    JobCompletedWithErrors {
        job: String,
        error: String,
    },

    /// A job invocation failed after all retry attempts
    JobFailed {
        job: String,
        error: String,
    },

    /// A scheduler tick found the job still running and did nothing
    TickSkipped {
        job: String,
    },
}

/// Sending half of the event channel
///
/// A disabled sink (the default) discards everything.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::Sender<SyncEvent>>,
}

impl EventSink {
    /// Create a sink and the receiver that yields its events
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SyncEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that discards events
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Emit an event without waiting
    pub fn emit(&self, event: SyncEvent) {
        let Some(tx) = &self.tx else {
            return;
        };

        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Receiver gone: nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}
