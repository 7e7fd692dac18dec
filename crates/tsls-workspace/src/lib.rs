//! Lazy workspace materialization: the virtual file store, the fetcher that
//! fills it, and the shared completion signals the ensure-pipelines are
//! built from.
//!
//! # Key components
//!
//! - [`Vfs`] - in-memory URI to content store with editor overlays and
//!   first-population notifications
//! - [`Fetcher`] / [`LocalFetcher`] - pull file content into the VFS,
//!   deduplicated per URI
//! - [`Signal`] / [`MemoSlot`] / [`MemoMap`] - multicast completion signals
//!   with retract-on-error memoization
//! - [`VersionMap`] - shared per-URI version counters

mod fetch;
mod fs;
mod signal;
mod version;
mod vfs;

pub use fetch::Fetcher;
pub use fetch::LocalFetcher;
pub use fs::FileSystem;
pub use fs::OsFileSystem;
pub use signal::MemoMap;
pub use signal::MemoSlot;
pub use signal::Signal;
pub use signal::SignalError;
pub use version::VersionMap;
pub use vfs::SubscriptionId;
pub use vfs::Vfs;
