//! Fixed-interval scheduler with overlap prevention
//!
//! The scheduler fires a tick every `interval_minutes`. The first tick
//! fires immediately; ticks missed while the runtime was busy are skipped,
//! not replayed.
//!
//! Each tick tries to take the job's named lock. If the previous
//! invocation still holds it, the tick is skipped. Otherwise the job runs
//! on its own task, holding the lock guard until it returns. A failed job
//! is logged and the next tick proceeds normally.
//!
//! ## Shutdown
//!
//! On shutdown the scheduler stops ticking, cancels the in-flight
//! invocation and waits for it to finish before returning.

pub mod job;
pub mod lock;

pub use job::{DATA_SYNC_JOB, SyncJob};
pub use lock::{JobLockGuard, JobLocks};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::events::{EventSink, SyncEvent};

/// Drives a [`SyncJob`] on a fixed interval
#[derive(Debug)]
pub struct Scheduler {
    job: Arc<SyncJob>,
    interval: Duration,
    locks: JobLocks,
    events: EventSink,
}

impl Scheduler {
    pub fn new(job: Arc<SyncJob>, interval: Duration, events: EventSink) -> Self {
        Self {
            job,
            interval,
            locks: JobLocks::new(),
            events,
        }
    }

    /// Share an existing lock set (e.g. with other schedulers in the process)
    pub fn with_locks(mut self, locks: JobLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn locks(&self) -> &JobLocks {
        &self.locks
    }

    /// Handle one tick
    ///
    /// # Returns
    ///
    /// - `Some(handle)`: the job was started on a new task
    /// - `None`: the previous invocation is still running; tick skipped
    pub fn tick(&self, cancel: &CancellationToken) -> Option<JoinHandle<()>> {
        let job_name = self.job.name();

        let Some(guard) = self.locks.try_acquire(job_name) else {
            info!("Skipping {} tick: previous run still in progress", job_name);
            self.events.emit(SyncEvent::TickSkipped {
                job: job_name.to_string(),
            });
            return None;
        };

        let job = Arc::clone(&self.job);
        let cancel = cancel.clone();

        Some(tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = job.run_sync_job(&cancel).await {
                // Fatal for this run only
                error!("{} run failed: {}", job.name(), e);
            }
        }))
    }

    /// Run until Ctrl-C
    pub async fn run(&self) -> Result<()> {
        self.run_internal(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
            }
        })
        .await
    }

    /// Run until `shutdown_rx` fires or its sender is dropped
    pub async fn run_with_shutdown(&self, shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
        self.run_internal(async move {
            let _ = shutdown_rx.await;
        })
        .await
    }

    async fn run_internal<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks = IntervalStream::new(interval);

        let cancel = CancellationToken::new();
        let mut in_flight: Vec<JoinHandle<()>> = Vec::new();

        info!(
            "Scheduler started: {} every {}s",
            self.job.name(),
            self.interval.as_secs()
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                Some(_) = ticks.next() => {
                    in_flight.retain(|h| !h.is_finished());
                    if let Some(handle) = self.tick(&cancel) {
                        in_flight.push(handle);
                    }
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        cancel.cancel();
        for handle in in_flight {
            if let Err(e) = handle.await {
                error!("Job task ended abnormally: {}", e);
            }
        }
        debug!("Scheduler stopped");

        Ok(())
    }
}
