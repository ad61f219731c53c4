//! Builder for constructing RemoteConfig instances.

use crate::core::settings::DEFAULT_WATCH_FREQUENCY;
use crate::core::watcher::WatchCore;
use crate::core::{RemoteConfig, WatchSettings};
use crate::error::{ConfigError, Result};
use crate::sources::ConfigSource;
use std::time::Duration;
use tracing::info;

#[cfg(feature = "metrics")]
use crate::metrics::WatchMetrics;

/// Builder for constructing a [`RemoteConfig`] around a source.
///
/// # Examples
///
/// ```rust,no_run
/// use remote_config_watch::prelude::*;
/// use remote_config_watch::sources::FileSource;
/// use std::time::Duration;
///
/// # async fn example() -> Result<()> {
/// let config = RemoteConfig::builder(FileSource::new("config/limits.yaml"))
///     .with_watch_frequency(Duration::from_secs(2))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct RemoteConfigBuilder<S> {
    source: S,
    watch_frequency: Duration,
    start_polling: bool,
    #[cfg(feature = "metrics")]
    metrics: Option<WatchMetrics>,
}

impl<S> RemoteConfigBuilder<S>
where
    S: ConfigSource + 'static,
{
    /// Create a new builder for `source` with the default poll interval.
    pub fn new(source: S) -> Self {
        Self {
            source,
            watch_frequency: DEFAULT_WATCH_FREQUENCY,
            start_polling: true,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Set the poll interval. Must be greater than zero.
    pub fn with_watch_frequency(mut self, watch_frequency: Duration) -> Self {
        self.watch_frequency = watch_frequency;
        self
    }

    /// Take the poll interval from `settings`.
    pub fn with_settings(self, settings: &WatchSettings) -> Self {
        self.with_watch_frequency(settings.watch_frequency)
    }

    /// Whether [`build`](Self::build) starts the background loop (default `true`).
    ///
    /// With `false`, cycles only run through [`RemoteConfig::poll_now`] until
    /// [`RemoteConfig::start_polling`] is called.
    pub fn with_polling(mut self, enabled: bool) -> Self {
        self.start_polling = enabled;
        self
    }

    /// Record poll loop metrics with the given meter.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, meter: opentelemetry::metrics::Meter) -> Self {
        self.metrics = Some(WatchMetrics::new(meter));
        self
    }

    /// Build the configuration handle.
    ///
    /// Performs the first refresh of the source and, unless disabled, starts the poll loop.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The poll interval is zero ([`ConfigError::InvalidSettings`])
    /// - The first refresh fails ([`ConfigError::Initialization`])
    pub async fn build(self) -> Result<RemoteConfig<S>> {
        if self.watch_frequency.is_zero() {
            return Err(ConfigError::InvalidSettings(
                "watch_frequency must be greater than zero".to_string(),
            ));
        }

        self.source.refresh().await.map_err(|e| {
            ConfigError::Initialization(format!(
                "initial refresh of '{}' failed: {}",
                self.source.name(),
                e
            ))
        })?;

        #[allow(unused_mut)]
        let mut core = WatchCore::new(self.source);
        #[cfg(feature = "metrics")]
        {
            core.metrics = self.metrics;
        }

        info!(
            source = %core.source.name(),
            watch_frequency_ms = self.watch_frequency.as_millis() as u64,
            "remote configuration initialized"
        );

        let config = RemoteConfig::from_core(core, self.watch_frequency);
        if self.start_polling {
            config.start_polling()?;
        }
        Ok(config)
    }
}

impl<S> RemoteConfig<S>
where
    S: ConfigSource + 'static,
{
    /// Create a new builder for constructing a handle around `source`.
    pub fn builder(source: S) -> RemoteConfigBuilder<S> {
        RemoteConfigBuilder::new(source)
    }
}

#[cfg(feature = "remote")]
impl RemoteConfig<crate::sources::RemoteSource> {
    /// Connect to the remote store described by `settings` and start polling it.
    ///
    /// With the `validation` feature the settings are checked first and every problem is
    /// reported at once.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid or the store cannot be read.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use remote_config_watch::prelude::*;
    /// use std::time::Duration;
    ///
    /// # async fn example() -> Result<()> {
    /// let settings = WatchSettings::new("127.0.0.1:8500", Duration::from_secs(10))
    ///     .with_path("services/api/config");
    /// let config = RemoteConfig::connect(&settings).await?;
    /// let limit = config.get_or_default("limit", serde_json::json!(100));
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(settings: &WatchSettings) -> Result<Self> {
        #[cfg(feature = "validation")]
        crate::core::Validate::validate(settings)?;
        let source = crate::sources::RemoteSourceBuilder::from_settings(settings).build()?;
        RemoteConfig::builder(source)
            .with_settings(settings)
            .build()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MemorySource;
    use std::sync::Arc;

    #[test]
    fn test_builder_defaults() {
        let builder = RemoteConfigBuilder::new(MemorySource::<i32>::new("test"));
        assert_eq!(builder.watch_frequency, DEFAULT_WATCH_FREQUENCY);
        assert!(builder.start_polling);
    }

    #[test]
    fn test_builder_takes_settings() {
        let settings = WatchSettings::new("localhost:8500", Duration::from_millis(250));
        let builder =
            RemoteConfigBuilder::new(MemorySource::<i32>::new("test")).with_settings(&settings);
        assert_eq!(builder.watch_frequency, Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_zero_frequency_rejected() {
        let result = RemoteConfig::builder(MemorySource::<i32>::new("test"))
            .with_watch_frequency(Duration::ZERO)
            .build()
            .await;
        assert!(matches!(result, Err(ConfigError::InvalidSettings(_))));
    }

    #[tokio::test]
    async fn test_initial_refresh_failure_is_fatal() {
        let source = Arc::new(MemorySource::<i32>::new("test"));
        source.fail_next_refreshes(1);

        let result = RemoteConfig::builder(Arc::clone(&source)).build().await;
        assert!(matches!(result, Err(ConfigError::Initialization(_))));
        assert_eq!(source.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_build_applies_initial_snapshot() {
        let source = MemorySource::<i32>::new("test");
        source.stage("limit", 10);

        let config = RemoteConfig::builder(source)
            .with_polling(false)
            .build()
            .await
            .unwrap();
        assert_eq!(config.get("limit"), Some(10));
        assert_eq!(config.cycles(), 0);
    }
}
