//! Remote store error types.

use thiserror::Error;

/// Errors a remote document store can report.
///
/// Every remote call can fail; callers decide per operation whether a
/// failure aborts (writes) or leaves the cache stale (refreshes).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    /// No network, timeout, or the server could not be reached or understood.
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    /// The server refused the request (permissions, rules, validation).
    #[error("Remote store rejected the request: {0}")]
    PermissionDenied(String),

    /// The target document does not exist.
    #[error("Remote document not found: {0}")]
    NotFound(String),
}

impl RemoteError {
    /// True for failures that may succeed if retried later.
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Unavailable(_))
    }
}
