//! Announcement coordinator.
//!
//! The cache mirrors the whole remote collection and is rebuilt on every
//! refresh, so local ids carry no remote correlation. Creates go to the
//! remote store first; edits and deletes only touch the cache and are undone
//! by the next refresh.

use std::sync::Arc;

use futures::Stream;
use technanas_core::{
    Announcement, AnnouncementType, Direction, Document, Fields, Query, RemoteError, RemoteStore,
};
use tracing::{debug, info, warn};

use super::{RefreshOutcome, SyncError, ANNOUNCEMENTS};
use crate::db::{AnnouncementRepository, Cache, ConflictPolicy};

/// Remote field holding `published_at`.
const DATE_FIELD: &str = "dateMillis";
const OWNER_FIELD: &str = "ownerEmail";

/// Parses a remote announcement. `title` is required; everything else has a
/// default, including a publication time of now.
fn parse_document(doc: &Document) -> Option<Announcement> {
    let title = doc.get_str("title")?;
    let kind = doc
        .get_str("type")
        .map(AnnouncementType::parse_or_general)
        .unwrap_or_default();
    let published_at = doc
        .get_i64(DATE_FIELD)
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

    Some(Announcement {
        id: 0,
        title: title.to_string(),
        short_description: doc.get_str("shortDescription").unwrap_or_default().to_string(),
        full_description: doc.get_str("fullDescription").unwrap_or_default().to_string(),
        kind,
        published_at,
        external_url: doc.get_str("externalUrl").map(str::to_string),
    })
}

/// Parses every document, logging and counting the ones that are dropped.
fn parse_documents(docs: &[Document]) -> (Vec<Announcement>, usize) {
    let mut parsed = Vec::with_capacity(docs.len());
    let mut dropped = 0;
    for doc in docs {
        match parse_document(doc) {
            Some(announcement) => parsed.push(announcement),
            None => {
                debug!(id = %doc.id, "Dropping announcement without title");
                dropped += 1;
            }
        }
    }
    (parsed, dropped)
}

fn announcement_fields(announcement: &Announcement, owner_email: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert("title".into(), announcement.title.as_str().into());
    fields.insert(
        "shortDescription".into(),
        announcement.short_description.as_str().into(),
    );
    fields.insert(
        "fullDescription".into(),
        announcement.full_description.as_str().into(),
    );
    fields.insert("type".into(), announcement.kind.as_str().into());
    fields.insert(DATE_FIELD.into(), announcement.published_at.into());
    fields.insert(
        "externalUrl".into(),
        announcement.external_url.clone().into(),
    );
    fields.insert(OWNER_FIELD.into(), owner_email.into());
    fields
}

pub struct AnnouncementSync {
    announcements: AnnouncementRepository,
    remote: Arc<dyn RemoteStore>,
}

impl AnnouncementSync {
    pub fn new(cache: &Cache, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            announcements: cache.announcements(),
            remote,
        }
    }

    /// Replaces the cache with the current remote collection, newest first.
    ///
    /// The swap is a single cache transaction, so live queries go straight
    /// from the old list to the new one. If the remote query fails the cache
    /// is not touched.
    pub async fn refresh_all(&self) -> Result<RefreshOutcome, sqlx::Error> {
        let query = Query::collection(ANNOUNCEMENTS).order_by(DATE_FIELD, Direction::Descending);
        let docs = match self.remote.query(&query).await {
            Ok(docs) => docs,
            Err(e) => {
                warn!("Announcement refresh failed, keeping cached list: {}", e);
                return Ok(RefreshOutcome::Stale(e));
            }
        };

        let (parsed, dropped) = parse_documents(&docs);
        self.announcements.replace_all(&parsed).await?;

        info!(stored = parsed.len(), dropped, "Refreshed announcements");
        Ok(RefreshOutcome::Refreshed {
            stored: parsed.len(),
            dropped,
        })
    }

    /// Publishes an announcement remotely, then caches it. Returns the new
    /// local id. A remote failure aborts before anything is cached.
    pub async fn create(
        &self,
        announcement: &Announcement,
        owner_email: &str,
    ) -> Result<i64, SyncError> {
        let remote_id = self
            .remote
            .add_document(ANNOUNCEMENTS, announcement_fields(announcement, owner_email))
            .await?;

        let id = match self
            .announcements
            .insert(announcement, ConflictPolicy::Replace)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(%remote_id, "Announcement published but not cached: {}", e);
                return Err(SyncError::Cache(e));
            }
        };
        info!(id, %remote_id, "Created announcement");
        Ok(id)
    }

    /// Edits the cached copy only.
    pub async fn update(&self, announcement: &Announcement) -> Result<(), SyncError> {
        self.announcements.update(announcement).await?;
        Ok(())
    }

    /// Removes the cached copy only. Returns whether a row was removed.
    pub async fn delete(&self, announcement: &Announcement) -> Result<bool, SyncError> {
        Ok(self.announcements.delete(announcement.id).await?)
    }

    /// Announcements published by `owner_email`, read straight from the
    /// remote store and sorted newest first. The cache is not involved.
    pub async fn list_for_owner(&self, owner_email: &str) -> Result<Vec<Announcement>, RemoteError> {
        let query = Query::collection(ANNOUNCEMENTS).where_eq(OWNER_FIELD, owner_email);
        let docs = self.remote.query(&query).await?;

        let (mut parsed, _) = parse_documents(&docs);
        parsed.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(parsed)
    }

    /// Looks up who published a cached announcement by matching title and
    /// publication time remotely. Any failure yields `None`.
    pub async fn find_owner_email(&self, announcement: &Announcement) -> Option<String> {
        let query = Query::collection(ANNOUNCEMENTS)
            .where_eq("title", announcement.title.as_str())
            .where_eq(DATE_FIELD, announcement.published_at)
            .limit(1);

        match self.remote.query(&query).await {
            Ok(docs) => docs
                .first()
                .and_then(|doc| doc.get_str(OWNER_FIELD))
                .map(str::to_string),
            Err(e) => {
                warn!(title = %announcement.title, "Owner lookup failed: {}", e);
                None
            }
        }
    }

    pub async fn get(&self, id: i64) -> Result<Option<Announcement>, sqlx::Error> {
        self.announcements.get_by_id(id).await
    }

    pub async fn list_cached(&self) -> Result<Vec<Announcement>, sqlx::Error> {
        self.announcements.list().await
    }

    pub fn watch_all(&self) -> impl Stream<Item = Result<Vec<Announcement>, sqlx::Error>> {
        self.announcements.watch_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{setup_cache, TestCache};
    use futures::StreamExt;
    use technanas_core::{FieldValue, MemoryRemoteStore, RemoteOp};

    struct Fixture {
        _ctx: TestCache,
        remote: Arc<MemoryRemoteStore>,
        sync: AnnouncementSync,
    }

    async fn setup() -> Fixture {
        let ctx = setup_cache().await;
        let remote = Arc::new(MemoryRemoteStore::new());
        let sync = AnnouncementSync::new(&ctx.cache, remote.clone());
        Fixture {
            _ctx: ctx,
            remote,
            sync,
        }
    }

    fn doc(pairs: &[(&str, FieldValue)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn titles(list: &[Announcement]) -> Vec<&str> {
        list.iter().map(|a| a.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_create_then_refresh_keeps_one_row() {
        let f = setup().await;

        let announcement = Announcement::new("T", AnnouncementType::General, 100);
        f.sync.create(&announcement, "a@x.com").await.unwrap();
        assert_eq!(f.remote.len(ANNOUNCEMENTS).await, 1);

        let outcome = f.sync.refresh_all().await.unwrap();
        assert_eq!(
            outcome,
            RefreshOutcome::Refreshed {
                stored: 1,
                dropped: 0
            }
        );

        let cached = f.sync.list_cached().await.unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].title, "T");
        assert_eq!(cached[0].published_at, 100);
    }

    #[tokio::test]
    async fn test_create_stores_owner_remotely_only() {
        let f = setup().await;

        let announcement = Announcement::new("Harga nanas", AnnouncementType::Price, 500)
            .with_short_description("RM2/kg");
        let id = f.sync.create(&announcement, "a@x.com").await.unwrap();

        let remote = f.remote.peek(ANNOUNCEMENTS, "doc1").await.unwrap();
        assert_eq!(remote.get_str("ownerEmail"), Some("a@x.com"));
        assert_eq!(remote.get_str("type"), Some("PRICE"));
        assert_eq!(remote.get_i64("dateMillis"), Some(500));

        let cached = f.sync.get(id).await.unwrap().unwrap();
        assert_eq!(cached.short_description, "RM2/kg");
    }

    #[tokio::test]
    async fn test_create_remote_failure_caches_nothing() {
        let f = setup().await;
        f.remote
            .fail_with(RemoteOp::Add, RemoteError::Unavailable("offline".into()))
            .await;

        let result = f
            .sync
            .create(&Announcement::new("T", AnnouncementType::General, 1), "a@x.com")
            .await;
        assert!(matches!(result, Err(SyncError::Remote(_))));
        assert!(f.sync.list_cached().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_is_exact_remote_set_newest_first() {
        let f = setup().await;

        // Local-only edit that the refresh must discard.
        let id = f
            .sync
            .create(&Announcement::new("mine", AnnouncementType::General, 50), "a@x.com")
            .await
            .unwrap();
        let mut local = f.sync.get(id).await.unwrap().unwrap();
        local.title = "edited locally".into();
        f.sync.update(&local).await.unwrap();

        f.remote
            .put(
                ANNOUNCEMENTS,
                "x",
                doc(&[("title", "newest".into()), ("dateMillis", 300i64.into())]),
            )
            .await;
        f.remote
            .put(
                ANNOUNCEMENTS,
                "y",
                doc(&[
                    ("title", "middle".into()),
                    ("dateMillis", 200i64.into()),
                    ("type", "NOT_A_TYPE".into()),
                ]),
            )
            .await;
        f.remote
            .put(
                ANNOUNCEMENTS,
                "z",
                doc(&[("shortDescription", "no title".into()), ("dateMillis", 250i64.into())]),
            )
            .await;

        let outcome = f.sync.refresh_all().await.unwrap();
        assert_eq!(
            outcome,
            RefreshOutcome::Refreshed {
                stored: 3,
                dropped: 1
            }
        );

        let cached = f.sync.list_cached().await.unwrap();
        assert_eq!(titles(&cached), vec!["newest", "middle", "mine"]);
        assert_eq!(cached[1].kind, AnnouncementType::General);
    }

    #[tokio::test]
    async fn test_refresh_failure_leaves_cache_identical() {
        let f = setup().await;
        f.sync
            .create(&Announcement::new("a", AnnouncementType::General, 1), "a@x.com")
            .await
            .unwrap();
        f.sync
            .create(&Announcement::new("b", AnnouncementType::Event, 2), "a@x.com")
            .await
            .unwrap();
        let before = f.sync.list_cached().await.unwrap();

        f.remote
            .fail_with(RemoteOp::Query, RemoteError::Unavailable("offline".into()))
            .await;
        let outcome = f.sync.refresh_all().await.unwrap();
        assert!(outcome.is_stale());

        let after = f.sync.list_cached().await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_update_and_delete_are_local_only() {
        let f = setup().await;
        let id = f
            .sync
            .create(&Announcement::new("T", AnnouncementType::General, 1), "a@x.com")
            .await
            .unwrap();
        let calls_before = f.remote.call_count().await;

        let mut announcement = f.sync.get(id).await.unwrap().unwrap();
        announcement.title = "T2".into();
        f.sync.update(&announcement).await.unwrap();
        assert!(f.sync.delete(&announcement).await.unwrap());

        assert_eq!(f.remote.call_count().await, calls_before);
        let remote = f.remote.peek(ANNOUNCEMENTS, "doc1").await.unwrap();
        assert_eq!(remote.get_str("title"), Some("T"));

        // The next refresh brings the remote copy back.
        f.sync.refresh_all().await.unwrap();
        assert_eq!(titles(&f.sync.list_cached().await.unwrap()), vec!["T"]);
    }

    #[tokio::test]
    async fn test_list_for_owner_reads_remote_sorted() {
        let f = setup().await;
        for (title, date, owner) in [
            ("old", 100i64, "a@x.com"),
            ("other", 150, "b@x.com"),
            ("new", 300, "a@x.com"),
        ] {
            f.sync
                .create(&Announcement::new(title, AnnouncementType::General, date), owner)
                .await
                .unwrap();
        }
        f.remote
            .put(
                ANNOUNCEMENTS,
                "undated",
                doc(&[("title", "undated".into()), ("ownerEmail", "a@x.com".into())]),
            )
            .await;

        let mine = f.sync.list_for_owner("a@x.com").await.unwrap();
        assert_eq!(titles(&mine), vec!["undated", "new", "old"]);

        f.remote.go_offline().await;
        assert!(f.sync.list_for_owner("a@x.com").await.is_err());
    }

    #[tokio::test]
    async fn test_find_owner_email() {
        let f = setup().await;
        let announcement = Announcement::new("Kursus", AnnouncementType::Training, 777);
        f.sync.create(&announcement, "trainer@x.com").await.unwrap();

        assert_eq!(
            f.sync.find_owner_email(&announcement).await.as_deref(),
            Some("trainer@x.com")
        );

        let unknown = Announcement::new("Kursus", AnnouncementType::Training, 778);
        assert!(f.sync.find_owner_email(&unknown).await.is_none());

        f.remote.go_offline().await;
        assert!(f.sync.find_owner_email(&announcement).await.is_none());
    }

    #[tokio::test]
    async fn test_watch_goes_from_old_list_to_new_list() {
        let f = setup().await;
        f.sync
            .create(&Announcement::new("old", AnnouncementType::General, 1), "a@x.com")
            .await
            .unwrap();

        let stream = f.sync.watch_all();
        futures::pin_mut!(stream);
        assert_eq!(stream.next().await.unwrap().unwrap().len(), 1);

        f.remote
            .put(
                ANNOUNCEMENTS,
                "n",
                doc(&[("title", "new".into()), ("dateMillis", 9i64.into())]),
            )
            .await;
        f.sync.refresh_all().await.unwrap();

        let next = stream.next().await.unwrap().unwrap();
        assert_eq!(titles(&next), vec!["new", "old"]);
    }
}
