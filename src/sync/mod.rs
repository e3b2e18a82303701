//! Sync coordinators.
//!
//! One coordinator per entity family keeps the local [`Cache`](crate::db::Cache)
//! consistent with the remote document store:
//!
//! - [`AccountSync`]: upsert-only refresh keyed by email; writes go remote
//!   first, then local.
//! - [`AnnouncementSync`]: destructive full refresh; creates go remote first,
//!   edits and deletes stay local.
//! - [`FarmSync`]: destructive refresh scoped to one owner; every synced row
//!   carries the remote document id.
//!
//! Refreshes never fail because of the remote store. An unreachable or
//! rejecting remote leaves the cache as it was and is reported as
//! [`RefreshOutcome::Stale`]. Writes surface remote failures to the caller.

pub mod account_sync;
pub mod announcement_sync;
pub mod farm_sync;

pub use account_sync::{AccountError, AccountSync};
pub use announcement_sync::AnnouncementSync;
pub use farm_sync::FarmSync;

use technanas_core::RemoteError;

/// Remote collection holding one document per account, keyed by email.
pub const USERS: &str = "users";
pub const ANNOUNCEMENTS: &str = "announcements";
pub const FARMS: &str = "farms";

/// Error type for announcement and farm writes.
#[derive(Debug)]
pub enum SyncError {
    /// The remote store failed or rejected the write.
    Remote(RemoteError),
    /// Local cache failure.
    Cache(sqlx::Error),
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::Remote(e) => write!(f, "{}", e),
            SyncError::Cache(e) => write!(f, "Local cache error: {}", e),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Remote(e) => Some(e),
            SyncError::Cache(e) => Some(e),
        }
    }
}

impl From<RemoteError> for SyncError {
    fn from(e: RemoteError) -> Self {
        SyncError::Remote(e)
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(e: sqlx::Error) -> Self {
        SyncError::Cache(e)
    }
}

/// Result of a refresh that did not hit a local cache error.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The remote set was read and applied to the cache.
    Refreshed {
        /// Rows written to the cache.
        stored: usize,
        /// Remote documents skipped because a required field was missing.
        dropped: usize,
    },
    /// The remote store could not be read; the cache was left untouched.
    Stale(RemoteError),
}

impl RefreshOutcome {
    pub fn is_stale(&self) -> bool {
        matches!(self, RefreshOutcome::Stale(_))
    }
}

impl std::fmt::Display for RefreshOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshOutcome::Refreshed { stored, dropped: 0 } => {
                write!(f, "Refreshed {} record(s)", stored)
            }
            RefreshOutcome::Refreshed { stored, dropped } => {
                write!(
                    f,
                    "Refreshed {} record(s), skipped {} malformed",
                    stored, dropped
                )
            }
            RefreshOutcome::Stale(e) => write!(f, "Showing cached data ({})", e),
        }
    }
}
