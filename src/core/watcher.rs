//! Poll loop: refresh the source, compare watched keys, fire callbacks.

use crate::core::registry::SubscriptionRegistry;
use crate::sources::ConfigSource;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};

#[cfg(feature = "metrics")]
use crate::metrics::WatchMetrics;

/// Where the poll loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Waiting for the next tick.
    Idle,
    /// A cycle is in progress.
    Polling,
    /// The loop has exited after a shutdown.
    Stopped,
}

impl PollState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Idle,
            1 => Self::Polling,
            _ => Self::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Polling => 1,
            Self::Stopped => 2,
        }
    }
}

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Whether the source refresh succeeded.
    pub refreshed: bool,
    /// Refresh error message, if the refresh failed.
    pub refresh_error: Option<String>,
    /// Number of watched keys compared.
    pub checked: usize,
    /// Keys whose callback was fired, in firing order.
    pub changed: Vec<String>,
    /// Number of callbacks that panicked.
    pub callback_panics: usize,
}

/// State shared between the caller-facing handle and the poll task.
pub(crate) struct WatchCore<S: ConfigSource> {
    pub(crate) source: S,
    pub(crate) registry: SubscriptionRegistry<S::Value>,
    state: AtomicU8,
    cycles: AtomicU64,
    /// Serializes cycles so a manual poll never overlaps a timer poll.
    cycle_guard: Mutex<()>,
    #[cfg(feature = "metrics")]
    pub(crate) metrics: Option<WatchMetrics>,
}

impl<S: ConfigSource> WatchCore<S> {
    pub(crate) fn new(source: S) -> Self {
        Self {
            source,
            registry: SubscriptionRegistry::new(),
            state: AtomicU8::new(PollState::Idle.as_u8()),
            cycles: AtomicU64::new(0),
            cycle_guard: Mutex::new(()),
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    pub(crate) fn state(&self) -> PollState {
        PollState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub(crate) fn mark_stopped(&self) {
        self.state.store(PollState::Stopped.as_u8(), Ordering::SeqCst);
    }

    pub(crate) fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    /// Run one full cycle: refresh, snapshot, compare, dispatch.
    pub(crate) async fn poll_once(&self) -> PollReport {
        let _cycle = self.cycle_guard.lock().await;
        let _ = self.state.compare_exchange(
            PollState::Idle.as_u8(),
            PollState::Polling.as_u8(),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        let started = Instant::now();
        let mut report = PollReport::default();

        match self.source.refresh().await {
            Ok(()) => report.refreshed = true,
            Err(e) => {
                warn!(
                    source = %self.source.name(),
                    error = %e,
                    "refresh failed, comparing against cached configuration"
                );
                report.refresh_error = Some(e.to_string());
            }
        }

        for entry in self.registry.snapshot() {
            report.checked += 1;

            let current = self.source.get(&entry.key);
            if current == entry.last_value {
                continue;
            }

            if !self
                .registry
                .update_value(&entry.key, entry.generation, current)
            {
                trace!(key = %entry.key, "entry removed or replaced during cycle");
                continue;
            }

            debug!(key = %entry.key, "watched key changed");
            report.changed.push(entry.key.clone());

            let handler = entry.handler;
            if panic::catch_unwind(AssertUnwindSafe(|| handler.on_change())).is_err() {
                report.callback_panics += 1;
                error!(key = %entry.key, "watch callback panicked");
            }
        }

        self.cycles.fetch_add(1, Ordering::SeqCst);

        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_cycle(started, &report);
            metrics.update_watched_keys(self.registry.len());
        }

        debug!(
            checked = report.checked,
            changed = report.changed.len(),
            refreshed = report.refreshed,
            elapsed_us = started.elapsed().as_micros() as u64,
            "poll cycle finished"
        );

        let _ = self.state.compare_exchange(
            PollState::Polling.as_u8(),
            PollState::Idle.as_u8(),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        report
    }

    /// Poll every `period` until `shutdown` fires or its sender is dropped.
    ///
    /// The first cycle runs one period after start. A cycle in progress always completes
    /// before the loop exits.
    pub(crate) async fn run(self: Arc<Self>, period: Duration, mut shutdown: watch::Receiver<()>) {
        let start = tokio::time::Instant::now() + period;
        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            source = %self.source.name(),
            period_ms = period.as_millis() as u64,
            "poll loop started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    info!(source = %self.source.name(), "poll loop stopping");
                    break;
                }
                _ = interval.tick() => {
                    self.poll_once().await;
                }
            }
        }

        self.mark_stopped();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MemorySource;
    use std::sync::atomic::AtomicUsize;

    fn counter_handler(counter: &Arc<AtomicUsize>) -> crate::core::SharedHandler {
        let counter = Arc::clone(counter);
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn exploding_handler() {
        panic!("boom");
    }

    #[tokio::test]
    async fn test_cycle_detects_change_once() {
        let core = WatchCore::new(MemorySource::new("test").with_value("limit", 10));
        let fired = Arc::new(AtomicUsize::new(0));
        core.registry
            .insert("limit", core.source.get("limit"), counter_handler(&fired));

        core.source.stage("limit", 20);
        let report = core.poll_once().await;
        assert!(report.refreshed);
        assert_eq!(report.checked, 1);
        assert_eq!(report.changed, vec!["limit".to_string()]);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        let report = core.poll_once().await;
        assert!(report.changed.is_empty());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(core.cycles(), 2);
        assert_eq!(core.state(), PollState::Idle);
    }

    #[tokio::test]
    async fn test_panicking_callback_is_isolated() {
        let core = WatchCore::new(MemorySource::new("test").with_value("a", 1).with_value("b", 1));
        let fired = Arc::new(AtomicUsize::new(0));
        core.registry.insert("a", Some(1), Arc::new(exploding_handler));
        core.registry.insert("b", Some(1), counter_handler(&fired));

        core.source.set("a", 2);
        core.source.set("b", 2);
        let report = core.poll_once().await;

        assert_eq!(report.callback_panics, 1);
        assert_eq!(report.changed, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(core.registry.last_value("a"), Some(Some(2)));

        let report = core.poll_once().await;
        assert!(report.changed.is_empty());
    }

    #[tokio::test]
    async fn test_key_disappearing_counts_as_change() {
        let core = WatchCore::new(MemorySource::new("test").with_value("flag", true));
        let fired = Arc::new(AtomicUsize::new(0));
        core.registry.insert("flag", Some(true), counter_handler(&fired));

        core.source.stage_remove("flag");
        core.poll_once().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(core.registry.last_value("flag"), Some(None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let core = Arc::new(WatchCore::new(MemorySource::<i32>::new("test")));
        let (tx, rx) = watch::channel(());

        let task = tokio::spawn(Arc::clone(&core).run(Duration::from_secs(1), rx));
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(core.cycles(), 3);

        tx.send(()).unwrap();
        task.await.unwrap();
        assert_eq!(core.state(), PollState::Stopped);
    }
}
