use futures::Stream;
use technanas_core::{Announcement, AnnouncementType};

use super::{live_query, Cache, Change, ConflictPolicy, Table};

pub struct AnnouncementRepository {
    cache: Cache,
}

#[derive(sqlx::FromRow)]
struct AnnouncementRow {
    id: i64,
    title: String,
    short_description: String,
    full_description: String,
    kind: String,
    published_at: i64,
    external_url: Option<String>,
}

impl From<AnnouncementRow> for Announcement {
    fn from(row: AnnouncementRow) -> Self {
        Announcement {
            id: row.id,
            title: row.title,
            short_description: row.short_description,
            full_description: row.full_description,
            kind: AnnouncementType::parse_or_general(&row.kind),
            published_at: row.published_at,
            external_url: row.external_url,
        }
    }
}

const INSERT_COLUMNS: &str = "INTO announcements (title, short_description, full_description, kind, published_at, external_url) VALUES (?, ?, ?, ?, ?, ?)";

impl AnnouncementRepository {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    /// Inserts an announcement under a freshly generated id.
    pub async fn insert(
        &self,
        announcement: &Announcement,
        policy: ConflictPolicy,
    ) -> Result<i64, sqlx::Error> {
        let sql = format!("{} {}", policy.insert_verb(), INSERT_COLUMNS);
        let id = bind_announcement(sqlx::query(&sql), announcement)
            .execute(self.cache.pool())
            .await?
            .last_insert_rowid();

        self.cache.publish(Table::Announcements, Change::Inserted);
        Ok(id)
    }

    pub async fn insert_all(&self, announcements: &[Announcement]) -> Result<(), sqlx::Error> {
        let sql = format!("{} {}", ConflictPolicy::Replace.insert_verb(), INSERT_COLUMNS);
        let mut tx = self.cache.pool().begin().await?;
        for announcement in announcements {
            bind_announcement(sqlx::query(&sql), announcement)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        self.cache.publish(Table::Announcements, Change::Inserted);
        Ok(())
    }

    pub async fn update(&self, announcement: &Announcement) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE announcements
            SET title = ?, short_description = ?, full_description = ?, kind = ?,
                published_at = ?, external_url = ?
            WHERE id = ?
            "#,
        )
        .bind(&announcement.title)
        .bind(&announcement.short_description)
        .bind(&announcement.full_description)
        .bind(announcement.kind.as_str())
        .bind(announcement.published_at)
        .bind(&announcement.external_url)
        .bind(announcement.id)
        .execute(self.cache.pool())
        .await?;

        self.cache.publish(Table::Announcements, Change::Updated);
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = ?")
            .bind(id)
            .execute(self.cache.pool())
            .await?;

        self.cache.publish(Table::Announcements, Change::Deleted);
        Ok(result.rows_affected() > 0)
    }

    pub async fn clear(&self) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM announcements")
            .execute(self.cache.pool())
            .await?;

        self.cache.publish(Table::Announcements, Change::Cleared);
        Ok(())
    }

    /// Clears the table and stores `announcements` in one transaction.
    /// Observers see the old list until the new one is committed.
    pub async fn replace_all(&self, announcements: &[Announcement]) -> Result<(), sqlx::Error> {
        let sql = format!("{} {}", ConflictPolicy::Replace.insert_verb(), INSERT_COLUMNS);
        let mut tx = self.cache.pool().begin().await?;

        sqlx::query("DELETE FROM announcements")
            .execute(&mut *tx)
            .await?;
        for announcement in announcements {
            bind_announcement(sqlx::query(&sql), announcement)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.cache.publish(Table::Announcements, Change::Replaced);
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Announcement>, sqlx::Error> {
        let row: Option<AnnouncementRow> =
            sqlx::query_as("SELECT * FROM announcements WHERE id = ?")
                .bind(id)
                .fetch_optional(self.cache.pool())
                .await?;
        Ok(row.map(Announcement::from))
    }

    /// All announcements, newest first.
    pub async fn list(&self) -> Result<Vec<Announcement>, sqlx::Error> {
        let rows: Vec<AnnouncementRow> =
            sqlx::query_as("SELECT * FROM announcements ORDER BY published_at DESC, id ASC")
                .fetch_all(self.cache.pool())
                .await?;
        Ok(rows.into_iter().map(Announcement::from).collect())
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM announcements")
            .fetch_one(self.cache.pool())
            .await?;
        Ok(count)
    }

    pub fn watch_all(&self) -> impl Stream<Item = Result<Vec<Announcement>, sqlx::Error>> {
        let cache = self.cache.clone();
        live_query(
            self.cache.changes().subscribe(Table::Announcements),
            move || {
                let repo = AnnouncementRepository::new(cache.clone());
                async move { repo.list().await }
            },
        )
    }
}

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

fn bind_announcement<'q>(query: SqliteQuery<'q>, announcement: &'q Announcement) -> SqliteQuery<'q> {
    query
        .bind(&announcement.title)
        .bind(&announcement.short_description)
        .bind(&announcement.full_description)
        .bind(announcement.kind.as_str())
        .bind(announcement.published_at)
        .bind(&announcement.external_url)
}
