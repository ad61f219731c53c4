//! Error types for remote-config-watch.

use std::fmt;

/// Result type alias for remote-config-watch operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or watching configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The subsystem could not reach a useful starting state (first refresh failed).
    #[error("Failed to initialize remote configuration: {0}")]
    Initialization(String),

    /// A single refresh of the configuration source failed.
    #[error("Failed to refresh configuration from '{source_name}': {reason}")]
    RefreshError {
        /// Name of the source that failed
        source_name: String,
        /// What went wrong
        reason: String,
    },

    /// Failed to load configuration from a source.
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    /// Failed to deserialize configuration.
    #[error("Failed to deserialize configuration: {0}")]
    DeserializationError(String),

    /// Settings for the watch subsystem are unusable.
    #[error("Invalid watch settings: {0}")]
    InvalidSettings(String),

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// The poll loop has already been shut down.
    #[error("Poll loop has already been shut down")]
    AlreadyShutdown,

    /// IO error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error for other cases.
    #[error("Configuration error: {0}")]
    Other(String),
}

impl ConfigError {
    /// Build a [`ConfigError::RefreshError`] for the named source.
    pub fn refresh(source_name: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::RefreshError {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

/// Validation error for settings validation.
#[derive(Debug)]
pub enum ValidationError {
    /// Custom validation error with a message.
    Custom(String),

    /// A specific field has an invalid value.
    InvalidField {
        /// The field name/path
        field: String,
        /// The reason why it's invalid
        reason: String,
    },

    /// Multiple validation errors occurred.
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Create a custom validation error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Create an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(msg) => write!(f, "{}", msg),
            Self::InvalidField { field, reason } => {
                write!(f, "Field '{}' is invalid: {}", field, reason)
            }
            Self::Multiple(errors) => {
                writeln!(f, "Multiple validation errors:")?;
                for (i, err) in errors.iter().enumerate() {
                    writeln!(f, "  {}. {}", i + 1, err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for ConfigError {
    fn from(err: ValidationError) -> Self {
        ConfigError::ValidationError(err.to_string())
    }
}
