// # prodsyncd - Product Sync Daemon
//
// Thin integration layer: all sync, retry and scheduling logic lives in
// prodsync-core. The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing tracing and the runtime
// 3. Building the record store and optionally seeding demo data
// 4. Running the scheduler until SIGTERM/SIGINT
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Job
// - `PRODSYNC_SYNC_INTERVAL_MINUTES`: Minutes between sync runs (default 10)
// - `PRODSYNC_MAX_RETRY_ATTEMPTS`: Retries after the first attempt (default 3)
// - `PRODSYNC_RETRY_DELAY_SECS`: Base backoff delay, doubled per retry (default 2)
// - `PRODSYNC_USE_JITTER`: Randomize backoff delays (default true)
//
// ### Record Store
// - `PRODSYNC_STORE_TYPE`: Type of record store (memory, file)
// - `PRODSYNC_STORE_PATH`: Path to the data file (for file store)
// - `PRODSYNC_SEED_DEMO_DATA`: Insert the demo catalogue into an empty store
//
// ### Runtime
// - `PRODSYNC_EVENT_CHANNEL_CAPACITY`: Sync event buffer size (default 1000)
// - `PRODSYNC_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export PRODSYNC_STORE_TYPE=file
// export PRODSYNC_STORE_PATH=/var/lib/prodsync/products.json
// export PRODSYNC_SEED_DEMO_DATA=true
// export PRODSYNC_SYNC_INTERVAL_MINUTES=10
//
// prodsyncd
// ```

use anyhow::{Context, Result};
use prodsync_core::events::{EventSink, SyncEvent};
use prodsync_core::scheduler::{Scheduler, SyncJob};
use prodsync_core::config::{MAX_INTERVAL_MINUTES, MAX_RETRY_ATTEMPTS, MAX_RETRY_DELAY_SECS};
use prodsync_core::{JobConfig, StoreConfig, SyncConfig};
use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Grace period for the in-flight run after a shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum ProdsyncExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<ProdsyncExitCode> for ExitCode {
    fn from(code: ProdsyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    interval_minutes: Option<u64>,
    max_retry_attempts: Option<u32>,
    retry_delay_secs: Option<u64>,
    use_jitter: Option<bool>,
    store_type: String,
    store_path: Option<String>,
    seed_demo_data: bool,
    event_channel_capacity: Option<usize>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            interval_minutes: parse_var("PRODSYNC_SYNC_INTERVAL_MINUTES")?,
            max_retry_attempts: parse_var("PRODSYNC_MAX_RETRY_ATTEMPTS")?,
            retry_delay_secs: parse_var("PRODSYNC_RETRY_DELAY_SECS")?,
            use_jitter: bool_var("PRODSYNC_USE_JITTER")?,
            store_type: env::var("PRODSYNC_STORE_TYPE").unwrap_or_else(|_| "memory".to_string()),
            store_path: env::var("PRODSYNC_STORE_PATH").ok(),
            seed_demo_data: bool_var("PRODSYNC_SEED_DEMO_DATA")?.unwrap_or(false),
            event_channel_capacity: parse_var("PRODSYNC_EVENT_CHANNEL_CAPACITY")?,
            log_level: env::var("PRODSYNC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Checks value ranges and store settings; the assembled `SyncConfig`
    /// is validated again by prodsync-core.
    fn validate(&self) -> Result<()> {
        if let Some(interval) = self.interval_minutes
            && !(1..=MAX_INTERVAL_MINUTES).contains(&interval)
        {
            anyhow::bail!(
                "PRODSYNC_SYNC_INTERVAL_MINUTES must be between 1 and {}. Got: {}",
                MAX_INTERVAL_MINUTES,
                interval
            );
        }

        if let Some(max_retries) = self.max_retry_attempts
            && max_retries > MAX_RETRY_ATTEMPTS
        {
            anyhow::bail!(
                "PRODSYNC_MAX_RETRY_ATTEMPTS must be between 0 and {}. Got: {}",
                MAX_RETRY_ATTEMPTS,
                max_retries
            );
        }

        if let Some(retry_delay) = self.retry_delay_secs
            && !(1..=MAX_RETRY_DELAY_SECS).contains(&retry_delay)
        {
            anyhow::bail!(
                "PRODSYNC_RETRY_DELAY_SECS must be between 1 and {} seconds. Got: {}",
                MAX_RETRY_DELAY_SECS,
                retry_delay
            );
        }

        if self.event_channel_capacity == Some(0) {
            anyhow::bail!("PRODSYNC_EVENT_CHANNEL_CAPACITY must be greater than 0");
        }

        match self.store_type.as_str() {
            "memory" => {}
            "file" => self.validate_store_path()?,
            _ => anyhow::bail!(
                "PRODSYNC_STORE_TYPE '{}' is not supported. \
                Supported types: memory, file",
                self.store_type
            ),
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "PRODSYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    fn validate_store_path(&self) -> Result<()> {
        let Some(path) = self.store_path.as_deref() else {
            anyhow::bail!(
                "PRODSYNC_STORE_PATH is required when PRODSYNC_STORE_TYPE=file. \
                Set it via: export PRODSYNC_STORE_PATH=/var/lib/prodsync/products.json"
            );
        };

        if path.is_empty() {
            anyhow::bail!("PRODSYNC_STORE_PATH cannot be empty when PRODSYNC_STORE_TYPE=file");
        }

        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            anyhow::bail!(
                "PRODSYNC_STORE_PATH parent directory does not exist: {}. \
                    Create it first: sudo mkdir -p {}",
                parent.display(),
                parent.display()
            );
        }

        Ok(())
    }

    /// Assemble the core configuration, filling unset values with defaults
    fn sync_config(&self) -> SyncConfig {
        let defaults = JobConfig::default();
        let job = JobConfig {
            interval_minutes: self.interval_minutes.unwrap_or(defaults.interval_minutes),
            max_retry_attempts: self.max_retry_attempts.unwrap_or(defaults.max_retry_attempts),
            retry_delay_secs: self.retry_delay_secs.unwrap_or(defaults.retry_delay_secs),
            use_jitter: self.use_jitter.unwrap_or(defaults.use_jitter),
        };

        let store = match (self.store_type.as_str(), &self.store_path) {
            ("file", Some(path)) => StoreConfig::File {
                path: PathBuf::from(path),
            },
            _ => StoreConfig::Memory,
        };

        let mut config = SyncConfig {
            job,
            store,
            ..SyncConfig::default()
        };
        if let Some(capacity) = self.event_channel_capacity {
            config.event_channel_capacity = capacity;
        }
        config
    }

    fn tracing_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

/// Parse an optional environment variable, rejecting malformed values
fn parse_var<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e)),
        Err(_) => Ok(None),
    }
}

fn bool_var(key: &str) -> Result<Option<bool>> {
    let Ok(raw) = env::var(key) else {
        return Ok(None);
    };

    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => anyhow::bail!("{} must be a boolean (true/false). Got: {}", key, raw),
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ProdsyncExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ProdsyncExitCode::ConfigError.into();
    }

    let sync_config = config.sync_config();
    if let Err(e) = sync_config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ProdsyncExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.tracing_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ProdsyncExitCode::ConfigError.into();
    }

    info!("Starting prodsyncd daemon");
    info!(
        "Configuration loaded: {} store, sync every {} min, {} retries",
        sync_config.store.type_name(),
        sync_config.job.interval_minutes,
        sync_config.job.max_retry_attempts
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ProdsyncExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(sync_config, config.seed_demo_data).await {
            error!("Daemon error: {:#}", e);
            ProdsyncExitCode::RuntimeError
        } else {
            ProdsyncExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: SyncConfig, seed_demo_data: bool) -> Result<()> {
    let factory = config.store.factory();

    if seed_demo_data {
        prodsync_core::seed::seed_if_empty(factory.as_ref())
            .await
            .context("Failed to seed demo data")?;
    }

    let (events, event_rx) = EventSink::channel(config.event_channel_capacity);
    let event_logger = tokio::spawn(log_events(event_rx));

    let job = Arc::new(SyncJob::new(factory, &config.job, events.clone()));
    let scheduler = Scheduler::new(job, config.job.interval(), events);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let mut scheduler_task =
        tokio::spawn(async move { scheduler.run_with_shutdown(shutdown_rx).await });

    info!("Daemon initialized successfully");

    tokio::select! {
        signal = wait_for_shutdown() => {
            let signal = signal?;
            info!("Received shutdown signal: {}", signal);
            info!("Shutting down daemon");
            let _ = shutdown_tx.send(());
        }

        result = &mut scheduler_task => {
            result.context("Scheduler task panicked")??;
            anyhow::bail!("Scheduler stopped unexpectedly");
        }
    }

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, scheduler_task).await {
        Ok(joined) => joined.context("Scheduler task panicked")??,
        Err(_) => anyhow::bail!("Shutdown timeout after {:?}", SHUTDOWN_TIMEOUT),
    }

    // Every sender is gone once the scheduler is dropped
    if let Err(e) = event_logger.await {
        warn!("Event logger ended abnormally: {}", e);
    }

    Ok(())
}

/// Log sync events until the channel closes
async fn log_events(mut rx: mpsc::Receiver<SyncEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            SyncEvent::JobSucceeded { job, records_synced } => {
                info!(job = %job, records_synced, "job succeeded");
            }
            SyncEvent::JobCompletedWithErrors { job, error } => {
                warn!(job = %job, error = %error, "job completed with errors");
            }
            SyncEvent::JobFailed { job, error } => {
                error!(job = %job, error = %error, "job failed");
            }
            SyncEvent::TickSkipped { job } => {
                info!(job = %job, "tick skipped, previous run still in progress");
            }
            other => debug!(event = ?other, "sync event"),
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
