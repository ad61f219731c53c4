//! The caller-facing handle: reads, defaults, watches.

use crate::core::handler::{ChangeHandler, SharedHandler};
use crate::core::watcher::{PollReport, PollState, WatchCore};
use crate::error::{ConfigError, Result};
use crate::sources::ConfigSource;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

enum PollTask {
    NotStarted,
    Running(JoinHandle<()>),
    Stopped,
}

/// Owns the background poll task of one handle family.
struct Poller {
    period: Duration,
    shutdown_tx: watch::Sender<()>,
    task: Mutex<PollTask>,
}

/// Handle to a polled remote configuration.
///
/// Reads go straight to the source's local cache. Watched keys are compared on every poll
/// cycle and their callbacks fire when the value differs from the last one observed.
///
/// Cloning is cheap and every clone shares the same source, registry and poll loop. The loop
/// stops on [`shutdown`](Self::shutdown), or once the last clone is dropped.
///
/// # Examples
///
/// ```rust
/// use remote_config_watch::prelude::*;
/// use remote_config_watch::sources::MemorySource;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let source = Arc::new(MemorySource::new("local").with_value("limit", 10));
/// let config = RemoteConfig::builder(Arc::clone(&source))
///     .with_watch_frequency(Duration::from_secs(30))
///     .build()
///     .await
///     .unwrap();
///
/// config.watch("limit", || println!("limit changed"));
///
/// source.stage("limit", 20);
/// let report = config.poll_now().await;
/// assert_eq!(report.changed, vec!["limit".to_string()]);
/// assert_eq!(config.get("limit"), Some(20));
///
/// config.shutdown().await.unwrap();
/// # });
/// ```
pub struct RemoteConfig<S: ConfigSource> {
    core: Arc<WatchCore<S>>,
    poller: Arc<Poller>,
}

impl<S> RemoteConfig<S>
where
    S: ConfigSource + 'static,
{
    /// Assemble a handle around `core`. The poll loop is not started.
    pub(crate) fn from_core(core: WatchCore<S>, period: Duration) -> Self {
        let (shutdown_tx, _) = watch::channel(());
        Self {
            core: Arc::new(core),
            poller: Arc::new(Poller {
                period,
                shutdown_tx,
                task: Mutex::new(PollTask::NotStarted),
            }),
        }
    }

    /// Start the background poll loop.
    ///
    /// Only the first call spawns the loop; later calls on this handle or any of its clones
    /// are no-ops, so callbacks are never double-fired by competing loops.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AlreadyShutdown`] after [`shutdown`](Self::shutdown).
    pub fn start_polling(&self) -> Result<()> {
        let mut task = self.poller.task.lock();
        match *task {
            PollTask::Running(_) => Ok(()),
            PollTask::Stopped => Err(ConfigError::AlreadyShutdown),
            PollTask::NotStarted => {
                let shutdown_rx = self.poller.shutdown_tx.subscribe();
                let handle = tokio::spawn(Arc::clone(&self.core).run(self.poller.period, shutdown_rx));
                *task = PollTask::Running(handle);
                Ok(())
            }
        }
    }

    /// Stop the poll loop and wait for it to exit.
    ///
    /// A cycle in progress finishes first, so no value update is left half-applied. Calling
    /// it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the poll task panicked.
    pub async fn shutdown(&self) -> Result<()> {
        let previous = std::mem::replace(&mut *self.poller.task.lock(), PollTask::Stopped);
        let handle = match previous {
            PollTask::Running(handle) => handle,
            PollTask::NotStarted => {
                self.core.mark_stopped();
                return Ok(());
            }
            PollTask::Stopped => return Ok(()),
        };

        let _ = self.poller.shutdown_tx.send(());
        handle
            .await
            .map_err(|e| ConfigError::Other(format!("Poll task failed: {}", e)))?;
        info!(source = %self.core.source.name(), "remote configuration shut down");
        Ok(())
    }
}

impl<S: ConfigSource> RemoteConfig<S> {
    /// Current cached value of `key`, or `None` if it has no value and no default.
    ///
    /// Does not touch the watch registry.
    pub fn get(&self, key: &str) -> Option<S::Value> {
        self.core.source.get(key)
    }

    /// Value of `key`, installing `default` as its fallback.
    ///
    /// The default is published to the source, so later [`get`](Self::get) calls see it too.
    /// An explicit value in the source still takes precedence.
    pub fn get_or_default(&self, key: &str, default: S::Value) -> S::Value {
        self.core.source.set_default(key, default.clone());
        self.core.source.get(key).unwrap_or(default)
    }

    /// Watch `key`, firing `handler` whenever its value changes.
    ///
    /// The current value becomes the baseline, so a change landing before the next poll is
    /// still reported exactly once. Watching a key again replaces its handler and baseline.
    pub fn watch<H>(&self, key: impl Into<String>, handler: H)
    where
        H: ChangeHandler + 'static,
    {
        self.watch_shared(key, Arc::new(handler));
    }

    /// Like [`watch`](Self::watch) but takes an already shared handler.
    pub fn watch_shared(&self, key: impl Into<String>, handler: SharedHandler) {
        let key = key.into();
        let baseline = self.core.source.get(&key);
        self.core.registry.insert(key.clone(), baseline, handler);
        debug!(key = %key, "watching key");
    }

    /// Stop watching `key`. Returns whether it was watched.
    pub fn unwatch(&self, key: &str) -> bool {
        let removed = self.core.registry.remove(key);
        if removed {
            debug!(key = %key, "unwatched key");
        }
        removed
    }

    /// Whether `key` is currently watched.
    pub fn is_watching(&self, key: &str) -> bool {
        self.core.registry.contains(key)
    }

    /// Watched keys, sorted.
    pub fn watched_keys(&self) -> Vec<String> {
        self.core.registry.keys()
    }

    /// Run one poll cycle right now, outside the timer.
    ///
    /// Cycles never overlap: this waits for an in-flight timer cycle to finish first.
    pub async fn poll_now(&self) -> PollReport {
        self.core.poll_once().await
    }

    /// Current state of the poll loop.
    pub fn poll_state(&self) -> PollState {
        self.core.state()
    }

    /// Number of poll cycles completed so far (timer and manual).
    pub fn cycles(&self) -> u64 {
        self.core.cycles()
    }

    /// Configured poll interval.
    pub fn watch_frequency(&self) -> Duration {
        self.poller.period
    }

    /// The underlying source.
    pub fn source(&self) -> &S {
        &self.core.source
    }
}

impl<S> RemoteConfig<S>
where
    S: ConfigSource<Value = JsonValue>,
{
    /// Deserialize the value of `key` into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DeserializationError`] if the value does not fit `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)
            .map(|value| {
                serde_json::from_value(value).map_err(|e| {
                    ConfigError::DeserializationError(format!("Key '{}': {}", key, e))
                })
            })
            .transpose()
    }
}

impl<S: ConfigSource> Clone for RemoteConfig<S> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            poller: Arc::clone(&self.poller),
        }
    }
}
