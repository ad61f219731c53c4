//! Settings for connecting and polling a remote store.

use crate::error::{ConfigError, Result};
use crate::sources::Format;
use config::Environment;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

#[cfg(feature = "validation")]
use crate::{core::Validate, error::ValidationError};

/// Default poll interval when none is configured.
pub const DEFAULT_WATCH_FREQUENCY: Duration = Duration::from_secs(5);

/// Which kind of remote store a [`RemoteSource`](crate::sources::RemoteSource) talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Consul KV store: the whole document lives under one key.
    #[default]
    Consul,
    /// Plain HTTP endpoint returning the document body.
    Http,
}

/// Recognized options for initializing the watch subsystem.
///
/// `address` and `watch_frequency` drive the subsystem itself. `provider`, `path`, `format` and
/// `token` are handed to the remote source untouched.
///
/// # Examples
///
/// ```rust
/// use remote_config_watch::core::{Validate, WatchSettings};
/// use std::time::Duration;
///
/// let settings = WatchSettings::new("127.0.0.1:8500", Duration::from_secs(10))
///     .with_path("services/api/config");
/// assert!(settings.validate().is_ok());
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSettings {
    /// Connection locator for the remote store.
    pub address: String,
    /// Poll interval. Read as `watch_frequency_ms` when deserialized.
    #[serde(
        rename = "watch_frequency_ms",
        deserialize_with = "duration_from_millis",
        default = "default_watch_frequency"
    )]
    pub watch_frequency: Duration,
    /// Remote store kind.
    #[serde(default)]
    pub provider: Provider,
    /// Key (Consul) or URL path (HTTP) of the configuration document.
    #[serde(default)]
    pub path: String,
    /// Document encoding.
    #[serde(default)]
    pub format: Format,
    /// Optional access token.
    #[serde(default)]
    pub token: Option<String>,
}

impl WatchSettings {
    /// Create settings for `address` polled every `watch_frequency`.
    pub fn new(address: impl Into<String>, watch_frequency: Duration) -> Self {
        Self {
            address: address.into(),
            watch_frequency,
            provider: Provider::default(),
            path: String::new(),
            format: Format::default(),
            token: None,
        }
    }

    /// Set the remote store kind.
    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = provider;
        self
    }

    /// Set the document key or path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the document encoding.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Set the access token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Load settings from environment variables.
    ///
    /// With prefix `APP`, reads `APP_ADDRESS`, `APP_WATCH_FREQUENCY_MS`, `APP_PROVIDER`,
    /// `APP_PATH`, `APP_FORMAT` and `APP_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value cannot be parsed.
    pub fn from_env(prefix: &str) -> Result<Self> {
        let env_source = Environment::with_prefix(prefix).try_parsing(true);

        let loaded = config::Config::builder()
            .add_source(env_source)
            .build()
            .map_err(|e| {
                ConfigError::LoadError(format!("Failed to load environment variables: {}", e))
            })?;

        loaded.try_deserialize::<WatchSettings>().map_err(|e| {
            ConfigError::DeserializationError(format!("Failed to parse watch settings: {}", e))
        })
    }
}

#[cfg(feature = "validation")]
impl Validate for WatchSettings {
    /// Check the settings for values the subsystem cannot start with.
    ///
    /// Returns every problem found, wrapped in [`ValidationError::Multiple`] when there is
    /// more than one.
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        let mut problems = Vec::new();

        if self.address.trim().is_empty() {
            problems.push(ValidationError::invalid_field("address", "must not be empty"));
        }
        if self.watch_frequency.is_zero() {
            problems.push(ValidationError::invalid_field(
                "watch_frequency",
                "must be greater than zero",
            ));
        }
        if self.provider == Provider::Consul && self.path.trim_matches('/').is_empty() {
            problems.push(ValidationError::invalid_field(
                "path",
                "is required for the consul provider",
            ));
        }

        match problems.len() {
            0 => Ok(()),
            1 => Err(problems.remove(0)),
            _ => Err(ValidationError::Multiple(problems)),
        }
    }
}

fn default_watch_frequency() -> Duration {
    DEFAULT_WATCH_FREQUENCY
}

fn duration_from_millis<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}
