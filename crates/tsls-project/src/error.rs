//! Error types for project routing and materialization.

use camino::Utf8PathBuf;
use tsls_analyzer::ConfigError;
use tsls_workspace::SignalError;
use url::Url;

/// Errors surfaced by the project manager and its sessions.
///
/// All variants are `Clone`; pipeline failures fan out through shared
/// signals to every subscriber.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProjectError {
    /// A project config file could not be parsed or expanded. The owning
    /// session stays uninitialized and retries on the next call.
    #[error("failed to parse {path}: {message}")]
    ConfigParse { path: Utf8PathBuf, message: String },

    /// The throwing configuration lookup found no session.
    #[error("no configuration found for {path}")]
    ConfigNotFound { path: Utf8PathBuf },

    /// A materialization pipeline failed; the memoized signal has already
    /// been evicted, so the next call starts fresh.
    #[error(transparent)]
    Fetch(#[from] SignalError),

    /// Reference resolution failed for one URI.
    #[error("failed to resolve references of {uri}: {message}")]
    ReferenceResolution { uri: Url, message: String },
}

impl From<ConfigError> for ProjectError {
    fn from(err: ConfigError) -> Self {
        ProjectError::ConfigParse {
            path: err.path,
            message: err.message,
        }
    }
}
