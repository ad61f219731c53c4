//! File-based configuration source.

use super::cache::DocumentCache;
use super::{ConfigSource, Format};
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::path::PathBuf;

/// File-based configuration source.
///
/// Re-reads a local YAML, TOML, or JSON file on every refresh. Useful as a stand-in for a
/// remote store during development, or for configuration mounted into a container and
/// rewritten in place.
///
/// # Examples
///
/// ```rust,no_run
/// use remote_config_watch::sources::FileSource;
///
/// let source = FileSource::new("config/limits.yaml");
/// ```
pub struct FileSource {
    path: PathBuf,
    format: Option<Format>,
    cache: DocumentCache,
}

impl FileSource {
    /// Create a new file source with automatic format detection.
    ///
    /// The format is detected from the file extension:
    /// - `.yaml`, `.yml` -> YAML
    /// - `.toml` -> TOML
    /// - `.json` -> JSON
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: None,
            cache: DocumentCache::new(),
        }
    }

    /// Force a format instead of detecting it from the extension.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    fn resolve_format(&self) -> Result<Format> {
        if let Some(format) = self.format {
            return Ok(format);
        }

        let extension = self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| {
                ConfigError::LoadError(format!(
                    "Unable to determine file format for: {}",
                    self.path.display()
                ))
            })?;

        Format::from_extension(extension).ok_or_else(|| {
            ConfigError::LoadError(format!(
                "Unsupported file extension: {}. Supported: .yaml, .yml, .toml, .json",
                extension
            ))
        })
    }
}

#[async_trait]
impl ConfigSource for FileSource {
    type Value = JsonValue;

    fn get(&self, key: &str) -> Option<JsonValue> {
        self.cache.get(key)
    }

    fn set_default(&self, key: &str, value: JsonValue) {
        self.cache.set_default(key, value);
    }

    async fn refresh(&self) -> Result<()> {
        let format = self.resolve_format()?;
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ConfigError::refresh(self.name(), e))?;

        let document = format.decode(&text)?;
        self.cache.replace(document);
        Ok(())
    }

    fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
