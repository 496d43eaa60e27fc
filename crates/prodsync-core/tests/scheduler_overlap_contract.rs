//! Contract Test: Scheduler Overlap Prevention and Shutdown
//!
//! This test verifies how scheduler ticks interact with in-flight runs.
//!
//! Constraints verified:
//! - A tick while the previous run is in flight is skipped
//! - Exactly one run executes for overlapping ticks
//! - The job lock is released when a run finishes, including failed runs
//! - The first tick fires immediately on start
//! - Shutdown cancels the in-flight run, commits nothing and returns promptly
//!
//! If this test fails, someone has added concurrent runs of the same job,
//! leaked the job lock, or detached the job from scheduler shutdown.

mod common;

use common::*;
use prodsync_core::config::JobConfig;
use prodsync_core::events::{EventSink, SyncEvent};
use prodsync_core::resilience::RetryPolicy;
use prodsync_core::scheduler::{DATA_SYNC_JOB, Scheduler, SyncJob};
use prodsync_core::traits::RecordStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_ok;
use tokio_util::sync::CancellationToken;

fn scheduler(factory: &Arc<ScriptedStoreFactory>, interval: Duration, events: EventSink) -> Scheduler {
    let job = SyncJob::new(factory.clone(), &JobConfig::default(), events.clone())
        .with_retry_policy(RetryPolicy::new(0, Duration::ZERO));
    Scheduler::new(Arc::new(job), interval, events)
}

#[tokio::test]
async fn tick_during_run_is_skipped() {
    let factory = Arc::new(
        ScriptedStoreFactory::new([stale_product("Keyboard", 14999)]).gated_fetch(),
    );
    let (events, mut rx) = EventSink::channel(64);
    let scheduler = scheduler(&factory, Duration::from_secs(3600), events);
    let cancel = CancellationToken::new();

    let first = scheduler.tick(&cancel).expect("first tick starts the job");
    wait_until(|| factory.calls.fetches() == 1).await;
    assert!(scheduler.locks().is_held(DATA_SYNC_JOB));

    assert!(scheduler.tick(&cancel).is_none(), "overlapping tick skipped");

    factory.release_fetch();
    assert_ok!(first.await);

    assert_eq!(factory.calls.opens(), 1, "exactly one execution");
    assert_eq!(factory.calls.commits(), 1);
    assert!(!scheduler.locks().is_held(DATA_SYNC_JOB));

    let events = drain_events(&mut rx);
    assert!(events.contains(&SyncEvent::TickSkipped {
        job: DATA_SYNC_JOB.to_string(),
    }));
}

#[tokio::test]
async fn lock_released_after_failed_run() {
    let factory = Arc::new(ScriptedStoreFactory::empty().failing_opens(1));
    let scheduler = scheduler(&factory, Duration::from_secs(3600), EventSink::disabled());
    let cancel = CancellationToken::new();

    let failed = scheduler.tick(&cancel).expect("tick starts the job");
    assert_ok!(failed.await, "job errors do not panic the task");
    assert!(!scheduler.locks().is_held(DATA_SYNC_JOB));

    let next = scheduler.tick(&cancel).expect("lock was released");
    assert_ok!(next.await);
    assert_eq!(factory.calls.opens(), 2);
    assert_eq!(factory.calls.fetches(), 1);
}

#[tokio::test]
async fn first_tick_fires_immediately() {
    let factory = Arc::new(ScriptedStoreFactory::new([product("Cable", 500, None)]));
    let scheduler = Arc::new(scheduler(&factory, Duration::from_secs(3600), EventSink::disabled()));
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let handle = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move { scheduler.run_with_shutdown(shutdown_rx).await })
    };

    wait_until(|| factory.calls.commits() == 1).await;
    assert!(shutdown_tx.send(()).is_ok());

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler stops within 5 seconds")
        .expect("scheduler task completes");
    assert_ok!(result);
    assert_eq!(factory.calls.opens(), 1, "hour-long interval fired once");
}

#[tokio::test]
async fn shutdown_cancels_in_flight_run() {
    let original = stale_product("Lamp", 399);
    let factory = Arc::new(ScriptedStoreFactory::new([original.clone()]).gated_fetch());
    let scheduler = Arc::new(scheduler(&factory, Duration::from_secs(3600), EventSink::disabled()));
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let handle = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move { scheduler.run_with_shutdown(shutdown_rx).await })
    };

    wait_until(|| factory.calls.fetches() == 1).await;
    assert!(shutdown_tx.send(()).is_ok());

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler stops within 5 seconds")
        .expect("scheduler task completes");
    assert_ok!(result);

    assert_eq!(factory.calls.commits(), 0);
    assert_eq!(factory.calls.rollbacks(), 1);
    assert!(!scheduler.locks().is_held(DATA_SYNC_JOB));

    let stored = assert_ok!(factory.store().get_record(original.id).await).expect("record exists");
    assert_eq!(stored, original);
}
