//! Core watch machinery: registry, poll loop and the caller-facing handle.

mod builder;
mod config_handle;
mod handler;
mod registry;
mod settings;
mod watcher;

#[cfg(feature = "validation")]
mod validation;

pub use builder::RemoteConfigBuilder;
pub use config_handle::RemoteConfig;
pub use handler::{ChangeHandler, SharedHandler};
pub use registry::{SubscriptionRegistry, WatchedEntry};
pub use settings::{DEFAULT_WATCH_FREQUENCY, Provider, WatchSettings};
pub use watcher::{PollReport, PollState};

#[cfg(feature = "validation")]
pub use validation::Validate;
