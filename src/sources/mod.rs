//! Configuration source implementations.

pub mod cache;
mod config_source;
mod file;
mod format;
mod memory;

#[cfg(feature = "remote")]
mod remote;

pub use cache::DocumentCache;
pub use config_source::ConfigSource;
pub use file::FileSource;
pub use format::Format;
pub use memory::MemorySource;

#[cfg(feature = "remote")]
pub use remote::{HttpAuth, RemoteSource, RemoteSourceBuilder};
