//! Named job locks for overlap prevention

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Set of job names that currently have an invocation in flight
///
/// Cloning shares the underlying set.
#[derive(Debug, Clone, Default)]
pub struct JobLocks {
    held: Arc<Mutex<HashSet<String>>>,
}

impl JobLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `job`, or `None` if it is already held
    ///
    /// The lock is released when the returned guard is dropped, whether the
    /// job finished, failed, panicked or was cancelled.
    pub fn try_acquire(&self, job: &str) -> Option<JobLockGuard> {
        if !lock(&self.held).insert(job.to_string()) {
            return None;
        }

        Some(JobLockGuard {
            held: Arc::clone(&self.held),
            job: job.to_string(),
        })
    }

    pub fn is_held(&self, job: &str) -> bool {
        lock(&self.held).contains(job)
    }
}

/// Releases its job lock on drop
#[derive(Debug)]
pub struct JobLockGuard {
    held: Arc<Mutex<HashSet<String>>>,
    job: String,
}

impl JobLockGuard {
    pub fn job(&self) -> &str {
        &self.job
    }
}

impl Drop for JobLockGuard {
    fn drop(&mut self) {
        lock(&self.held).remove(&self.job);
    }
}

// A panic while holding the set cannot leave it logically inconsistent,
// so poisoning is ignored.
fn lock(held: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    held.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
