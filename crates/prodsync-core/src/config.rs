//! Configuration types for the sync service
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::resilience::RetryPolicy;
use crate::store::{FileRecordStoreFactory, MemoryRecordStoreFactory};
use crate::traits::RecordStoreFactory;

/// Longest accepted scheduler interval (one day)
pub const MAX_INTERVAL_MINUTES: u64 = 1440;

/// Longest accepted base retry delay
pub const MAX_RETRY_DELAY_SECS: u64 = 300;

/// Most retries accepted after the first attempt
pub const MAX_RETRY_ATTEMPTS: u32 = 10;

/// Main sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Job scheduling and retry settings
    #[serde(default)]
    pub job: JobConfig,

    /// Record store selection
    #[serde(default)]
    pub store: StoreConfig,

    /// Capacity of the sync event channel
    ///
    /// When full, new events are dropped (with a warning log).
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl SyncConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            job: JobConfig::default(),
            store: StoreConfig::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.job.validate()?;
        self.store.validate()?;

        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }

        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Data sync job configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Minutes between scheduler ticks
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,

    /// Retries after the first attempt
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,

    /// Base backoff delay (in seconds), doubled per retry
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Randomize each backoff delay into [0.5, 1.5) of nominal
    #[serde(default = "default_use_jitter")]
    pub use_jitter: bool,
}

impl JobConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interval_minutes == 0 {
            return Err(crate::Error::config("Sync interval must be > 0 minutes"));
        }
        if self.interval_minutes > MAX_INTERVAL_MINUTES {
            return Err(crate::Error::config(format!(
                "Sync interval must be at most {MAX_INTERVAL_MINUTES} minutes"
            )));
        }
        if !(1..=MAX_RETRY_DELAY_SECS).contains(&self.retry_delay_secs) {
            return Err(crate::Error::config(format!(
                "Retry delay must be between 1 and {MAX_RETRY_DELAY_SECS} seconds"
            )));
        }
        if self.max_retry_attempts > MAX_RETRY_ATTEMPTS {
            return Err(crate::Error::config(format!(
                "Max retry attempts must be at most {MAX_RETRY_ATTEMPTS}"
            )));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retry_attempts,
            Duration::from_secs(self.retry_delay_secs),
        )
        .with_jitter(self.use_jitter)
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            max_retry_attempts: default_max_retry_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            use_jitter: default_use_jitter(),
        }
    }
}

/// Record store configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// In-memory store (not persistent)
    #[default]
    Memory,

    /// JSON file store
    File {
        /// Path to the data file
        path: PathBuf,
    },
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::File { path } if path.as_os_str().is_empty() => {
                Err(crate::Error::config("File store path cannot be empty"))
            }
            _ => Ok(()),
        }
    }

    /// Get the store type name
    pub fn type_name(&self) -> &'static str {
        match self {
            StoreConfig::Memory => "memory",
            StoreConfig::File { .. } => "file",
        }
    }

    /// Build the session factory for this store
    pub fn factory(&self) -> Arc<dyn RecordStoreFactory> {
        match self {
            StoreConfig::Memory => Arc::new(MemoryRecordStoreFactory::default()),
            StoreConfig::File { path } => Arc::new(FileRecordStoreFactory::new(path.clone())),
        }
    }
}

fn default_interval_minutes() -> u64 {
    10
}

fn default_max_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    2
}

fn default_use_jitter() -> bool {
    true
}

fn default_event_channel_capacity() -> usize {
    1000
}
