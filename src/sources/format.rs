//! Payload formats understood by the document-backed sources.

use crate::error::{ConfigError, Result};
use config::FileFormat;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// Encoding of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// JSON document (default).
    #[default]
    Json,
    /// YAML document.
    Yaml,
    /// TOML document.
    Toml,
}

impl Format {
    /// Detect the format from a file extension (`json`, `yaml`/`yml`, `toml`).
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }

    /// Decode `text` into a JSON document.
    ///
    /// JSON is parsed as-is, so key case and integer precision are preserved. YAML and TOML go
    /// through the `config` crate, which lowercases keys; lookups in
    /// [`DocumentCache`](super::DocumentCache) are case-insensitive to match.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DeserializationError`] if the text is not a valid document of
    /// this format or its root is not a table.
    pub fn decode(self, text: &str) -> Result<JsonValue> {
        let document = match self {
            Self::Json => serde_json::from_str::<JsonValue>(text).map_err(|e| {
                ConfigError::DeserializationError(format!("Failed to parse json document: {}", e))
            })?,
            Self::Yaml => self.decode_with_config(text, FileFormat::Yaml)?,
            Self::Toml => self.decode_with_config(text, FileFormat::Toml)?,
        };

        if !document.is_object() {
            return Err(ConfigError::DeserializationError(format!(
                "{} document root must be a table",
                self
            )));
        }
        Ok(document)
    }

    fn decode_with_config(self, text: &str, file_format: FileFormat) -> Result<JsonValue> {
        let parsed = config::Config::builder()
            .add_source(config::File::from_str(text, file_format))
            .build()
            .map_err(|e| {
                ConfigError::DeserializationError(format!("Failed to parse {} document: {}", self, e))
            })?;

        parsed.try_deserialize::<JsonValue>().map_err(|e| {
            ConfigError::DeserializationError(format!("Failed to convert {} document: {}", self, e))
        })
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
        };
        f.write_str(name)
    }
}

impl FromStr for Format {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_extension(s).ok_or_else(|| {
            ConfigError::InvalidSettings(format!(
                "Unsupported format: {}. Supported: json, yaml, toml",
                s
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_json() {
        let doc = Format::Json
            .decode(r#"{"limit": 10, "db": {"host": "localhost"}}"#)
            .unwrap();
        assert_eq!(doc["limit"], json!(10));
        assert_eq!(doc["db"]["host"], json!("localhost"));
    }

    #[test]
    fn test_decode_yaml() {
        let doc = Format::Yaml.decode("limit: 10\nnames:\n  - a\n  - b\n").unwrap();
        assert_eq!(doc["limit"], json!(10));
        assert_eq!(doc["names"], json!(["a", "b"]));
    }

    #[test]
    fn test_decode_toml() {
        let doc = Format::Toml.decode("limit = 10\n[db]\nhost = \"localhost\"\n").unwrap();
        assert_eq!(doc["limit"], json!(10));
        assert_eq!(doc["db"]["host"], json!("localhost"));
    }

    #[test]
    fn test_decode_invalid() {
        assert!(Format::Json.decode("{ not json").is_err());
        assert!(Format::Json.decode("[1, 2]").is_err());
    }

    #[test]
    fn test_json_keeps_key_case() {
        let doc = Format::Json
            .decode(r#"{"maxConn": 5, "DB": {"Host": "x"}}"#)
            .unwrap();
        assert_eq!(doc, json!({ "maxConn": 5, "DB": { "Host": "x" } }));
    }

    #[test]
    fn test_json_keeps_large_integers() {
        let doc = Format::Json
            .decode(r#"{"big": 18446744073709551615, "other": 18446744073709551614}"#)
            .unwrap();
        assert_eq!(doc["big"].as_u64(), Some(u64::MAX));
        assert_ne!(doc["big"], doc["other"]);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("YML".parse::<Format>().unwrap(), Format::Yaml);
        assert_eq!("toml".parse::<Format>().unwrap(), Format::Toml);
        assert!("ini".parse::<Format>().is_err());
        assert_eq!(Format::default().to_string(), "json");
    }
}
