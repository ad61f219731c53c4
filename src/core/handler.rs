//! Change callbacks.

use std::sync::Arc;

/// Callback invoked when a watched key changes.
///
/// Implemented for every `Fn() + Send + Sync` closure, so plain closures can be passed to
/// [`RemoteConfig::watch`](crate::core::RemoteConfig::watch). Implement it on a type when the
/// handler carries its own state.
///
/// Handlers run on the poll task, one after another. A slow handler delays the rest of the
/// cycle but never blocks `watch`/`unwatch`.
pub trait ChangeHandler: Send + Sync {
    /// React to a change of the watched key.
    fn on_change(&self);
}

impl<F> ChangeHandler for F
where
    F: Fn() + Send + Sync,
{
    fn on_change(&self) {
        self()
    }
}

/// Shared handler as stored in the registry.
pub type SharedHandler = Arc<dyn ChangeHandler>;
