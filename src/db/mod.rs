//! Local cache store.
//!
//! SQLite tables mirroring the subset of remote state the app shows, one
//! repository per entity family. All repositories share a pool and a
//! [`ChangeHub`] so that every mutation re-emits the affected live queries.

mod account_repo;
mod announcement_repo;
mod changes;
mod farm_repo;
mod faq_repo;

pub use account_repo::AccountRepository;
pub use announcement_repo::AnnouncementRepository;
pub use changes::{live_query, Change, ChangeHub, Table};
pub use farm_repo::FarmRepository;
pub use faq_repo::FaqRepository;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// What an insert does when it collides with an existing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Fail the insert (e.g. a second account with the same email).
    Abort,
    /// Overwrite the existing row.
    Replace,
}

impl ConflictPolicy {
    fn insert_verb(&self) -> &'static str {
        match self {
            ConflictPolicy::Abort => "INSERT OR ABORT",
            ConflictPolicy::Replace => "INSERT OR REPLACE",
        }
    }
}

/// Initialize the database connection pool and run migrations
pub async fn init_db(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .journal_mode(SqliteJournalMode::Wal)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Process-wide cache handle. Cheap to clone; every clone shares the same
/// pool and change hub.
#[derive(Clone)]
pub struct Cache {
    pool: SqlitePool,
    changes: Arc<ChangeHub>,
}

impl Cache {
    pub async fn open(db_path: &Path) -> Result<Self, sqlx::Error> {
        let pool = init_db(db_path).await?;
        tracing::debug!("Opened cache at {}", db_path.display());
        Ok(Self::new(pool))
    }

    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            changes: Arc::new(ChangeHub::new()),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn changes(&self) -> &ChangeHub {
        &self.changes
    }

    pub fn accounts(&self) -> AccountRepository {
        AccountRepository::new(self.clone())
    }

    pub fn announcements(&self) -> AnnouncementRepository {
        AnnouncementRepository::new(self.clone())
    }

    pub fn farms(&self) -> FarmRepository {
        FarmRepository::new(self.clone())
    }

    pub fn faqs(&self) -> FaqRepository {
        FaqRepository::new(self.clone())
    }

    pub(crate) fn publish(&self, table: Table, change: Change) {
        self.changes.publish(table, change);
    }
}
