//! Settings validation support.

use crate::error::ValidationError;

/// Trait for validating settings before the subsystem starts.
///
/// [`WatchSettings`](crate::core::WatchSettings) implements it; implement it on your own
/// settings types to reject unusable values with the same error model.
///
/// # Examples
///
/// ```rust
/// use remote_config_watch::core::Validate;
/// use remote_config_watch::error::ValidationError;
///
/// struct LimitSettings {
///     max_limit: u32,
/// }
///
/// impl Validate for LimitSettings {
///     fn validate(&self) -> Result<(), ValidationError> {
///         if self.max_limit == 0 {
///             return Err(ValidationError::invalid_field(
///                 "max_limit",
///                 "must be greater than 0"
///             ));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Validate {
    /// Validate the settings.
    ///
    /// # Errors
    ///
    /// Should return a `ValidationError` describing what validation failed.
    fn validate(&self) -> Result<(), ValidationError>;
}
