//! TechNanas sync layer.
//!
//! Keeps a local SQLite cache consistent with the remote document store for
//! accounts, announcements and farms. UI layers observe the cache through
//! live queries and mutate it only through the coordinators in [`sync`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use technanas::db::Cache;
//! use technanas::sync::AnnouncementSync;
//! use technanas_core::MemoryRemoteStore;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Cache::open("technanas.db".as_ref()).await?;
//! let announcements = AnnouncementSync::new(&cache, Arc::new(MemoryRemoteStore::new()));
//! let outcome = announcements.refresh_all().await?;
//! println!("{}", outcome);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod seed;
pub mod session;
pub mod sync;
