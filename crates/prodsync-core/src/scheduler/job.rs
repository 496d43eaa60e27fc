//! The data sync job invoked by the scheduler
//!
//! One invocation: open a store session and run the orchestrator, both
//! inside the retry policy. Opening the session is the part that can fail
//! transiently and be retried; a pass that fails inside the store comes
//! back as a failed `SyncResult` and is reported, not retried.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::JobConfig;
use crate::error::{Error, Result};
use crate::events::{EventSink, SyncEvent};
use crate::resilience::RetryPolicy;
use crate::sync::{SyncOrchestrator, SyncResult};
use crate::traits::RecordStoreFactory;

/// Lock name of the data sync job
pub const DATA_SYNC_JOB: &str = "data-sync";

pub struct SyncJob {
    factory: Arc<dyn RecordStoreFactory>,
    orchestrator: SyncOrchestrator,
    retry: RetryPolicy,
    events: EventSink,
}

impl SyncJob {
    pub fn new(factory: Arc<dyn RecordStoreFactory>, config: &JobConfig, events: EventSink) -> Self {
        Self {
            factory,
            orchestrator: SyncOrchestrator::new(events.clone()),
            retry: config.retry_policy(),
            events,
        }
    }

    /// Replace the retry policy built from configuration
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn name(&self) -> &'static str {
        DATA_SYNC_JOB
    }

    /// Run one invocation
    ///
    /// # Returns
    ///
    /// - `Ok(SyncResult)`: the orchestrator ran; check `success`
    /// - `Err(Error)`: retries exhausted or a permanent failure before the orchestrator ran
    pub async fn run_sync_job(&self, cancel: &CancellationToken) -> Result<SyncResult> {
        info!("DataSyncJob started");
        self.events.emit(SyncEvent::JobStarted {
            job: DATA_SYNC_JOB.to_string(),
        });

        let outcome = self
            .retry
            .execute(&self.events, cancel, move |_attempt| async move {
                let store = self.factory.open().await?;
                Ok::<_, Error>(self.orchestrator.run_sync(store.as_ref(), cancel).await)
            })
            .await;

        match outcome {
            Ok(result) if result.success => {
                info!(
                    "DataSyncJob completed successfully. Records synced: {}",
                    result.records_synced
                );
                self.events.emit(SyncEvent::JobSucceeded {
                    job: DATA_SYNC_JOB.to_string(),
                    records_synced: result.records_synced,
                });
                Ok(result)
            }
            Ok(result) => {
                let message = result.error.clone().unwrap_or_default();
                warn!("DataSyncJob completed with errors: {}", message);
                self.events.emit(SyncEvent::JobCompletedWithErrors {
                    job: DATA_SYNC_JOB.to_string(),
                    error: message,
                });
                Ok(result)
            }
            Err(e) => {
                error!("DataSyncJob failed after all retry attempts: {}", e);
                self.events.emit(SyncEvent::JobFailed {
                    job: DATA_SYNC_JOB.to_string(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for SyncJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncJob")
            .field("orchestrator", &self.orchestrator)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
