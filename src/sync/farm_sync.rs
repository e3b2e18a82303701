//! Farm coordinator.
//!
//! Each cached farm remembers the id of its remote document in `remote_id`.
//! Refreshes replace one owner's rows at a time. Deletes favour the cache:
//! the local row goes even when the remote delete fails.

use std::sync::Arc;

use futures::Stream;
use technanas_core::{Document, Farm, Fields, Query, RemoteStore};
use tracing::{debug, info, warn};

use super::{RefreshOutcome, SyncError, FARMS};
use crate::db::{Cache, ConflictPolicy, FarmRepository};

const OWNER_FIELD: &str = "ownerEmail";

/// Parses a remote farm for the cached account `user_id`. `name` is required.
fn parse_document(doc: &Document, user_id: i64) -> Option<Farm> {
    let name = doc.get_str("name")?;
    Some(Farm {
        id: 0,
        user_id,
        name: name.to_string(),
        size: doc.get_str("size").map(str::to_string),
        state: doc.get_str("state").map(str::to_string),
        address: doc.get_str("address").map(str::to_string),
        latitude: doc.get_f64("latitude"),
        longitude: doc.get_f64("longitude"),
        remote_id: Some(doc.id.clone()),
    })
}

fn farm_fields(farm: &Farm, owner_email: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert(OWNER_FIELD.into(), owner_email.into());
    fields.insert("name".into(), farm.name.as_str().into());
    fields.insert("size".into(), farm.size.clone().into());
    fields.insert("state".into(), farm.state.clone().into());
    fields.insert("address".into(), farm.address.clone().into());
    fields.insert("latitude".into(), farm.latitude.into());
    fields.insert("longitude".into(), farm.longitude.into());
    fields
}

pub struct FarmSync {
    farms: FarmRepository,
    remote: Arc<dyn RemoteStore>,
}

impl FarmSync {
    pub fn new(cache: &Cache, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            farms: cache.farms(),
            remote,
        }
    }

    /// Replaces the cached farms of `user_id` with the remote farms owned by
    /// `owner_email`. Other accounts' rows are untouched. A failed remote
    /// query leaves the cache as it was.
    pub async fn refresh_for_owner(
        &self,
        user_id: i64,
        owner_email: &str,
    ) -> Result<RefreshOutcome, sqlx::Error> {
        let query = Query::collection(FARMS).where_eq(OWNER_FIELD, owner_email);
        let docs = match self.remote.query(&query).await {
            Ok(docs) => docs,
            Err(e) => {
                warn!(owner = owner_email, "Farm refresh failed, keeping cached farms: {}", e);
                return Ok(RefreshOutcome::Stale(e));
            }
        };

        let mut parsed = Vec::with_capacity(docs.len());
        let mut dropped = 0;
        for doc in &docs {
            match parse_document(doc, user_id) {
                Some(farm) => parsed.push(farm),
                None => {
                    debug!(id = %doc.id, "Dropping farm without name");
                    dropped += 1;
                }
            }
        }

        self.farms.replace_for_user(user_id, &parsed).await?;

        info!(owner = owner_email, stored = parsed.len(), dropped, "Refreshed farms");
        Ok(RefreshOutcome::Refreshed {
            stored: parsed.len(),
            dropped,
        })
    }

    /// Adds the farm remotely, then caches it with the generated document id.
    /// Returns the cached farm.
    pub async fn create(&self, farm: &Farm, owner_email: &str) -> Result<Farm, SyncError> {
        let remote_id = self
            .remote
            .add_document(FARMS, farm_fields(farm, owner_email))
            .await?;

        let mut stored = farm.clone();
        stored.remote_id = Some(remote_id);
        stored.id = match self.farms.insert(&stored, ConflictPolicy::Abort).await {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    remote_id = stored.remote_id.as_deref().unwrap_or_default(),
                    "Farm added remotely but not cached: {}", e
                );
                return Err(SyncError::Cache(e));
            }
        };

        info!(id = stored.id, remote_id = ?stored.remote_id, "Created farm");
        Ok(stored)
    }

    /// Overwrites the remote document, then the cached row. A farm without a
    /// remote id gets a new remote document: a cached row keeps its local id
    /// and gains the generated remote id, anything else is created.
    pub async fn update(&self, farm: &Farm, owner_email: &str) -> Result<Farm, SyncError> {
        let Some(remote_id) = farm.remote_id.as_deref() else {
            return self.sync_unsynced(farm, owner_email).await;
        };

        self.remote
            .set_document(FARMS, remote_id, farm_fields(farm, owner_email))
            .await?;

        self.update_cached(farm).await?;
        Ok(farm.clone())
    }

    async fn sync_unsynced(&self, farm: &Farm, owner_email: &str) -> Result<Farm, SyncError> {
        if farm.id == 0 || self.farms.get_by_id(farm.id).await?.is_none() {
            debug!(id = farm.id, "Farm has no remote id, creating it");
            return self.create(farm, owner_email).await;
        }

        let remote_id = self
            .remote
            .add_document(FARMS, farm_fields(farm, owner_email))
            .await?;

        let mut synced = farm.clone();
        synced.remote_id = Some(remote_id);
        self.update_cached(&synced).await?;

        info!(id = synced.id, remote_id = ?synced.remote_id, "Synced cached farm");
        Ok(synced)
    }

    /// Writes `farm` over its cached row after a successful remote write.
    async fn update_cached(&self, farm: &Farm) -> Result<(), SyncError> {
        match self.farms.update(farm).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                warn!(
                    id = farm.id,
                    remote_id = ?farm.remote_id,
                    "Farm written remotely but no cached row matched"
                );
                Ok(())
            }
            Err(e) => {
                warn!(remote_id = ?farm.remote_id, "Farm written remotely but not in the cache: {}", e);
                Err(SyncError::Cache(e))
            }
        }
    }

    /// Deletes the remote document if there is one, ignoring remote failures,
    /// then always deletes the cached row.
    pub async fn delete(&self, farm: &Farm) -> Result<(), SyncError> {
        if let Some(remote_id) = farm.remote_id.as_deref() {
            if let Err(e) = self.remote.delete_document(FARMS, remote_id).await {
                warn!(remote_id, "Remote farm delete failed, removing locally anyway: {}", e);
            }
        }

        self.farms.delete(farm.id).await?;
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Farm>, sqlx::Error> {
        self.farms.get_by_id(id).await
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Farm>, sqlx::Error> {
        self.farms.list_for_user(user_id).await
    }

    pub fn watch_for_user(
        &self,
        user_id: i64,
    ) -> impl Stream<Item = Result<Vec<Farm>, sqlx::Error>> {
        self.farms.watch_for_user(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{reject_writes, setup_cache, TestCache};
    use futures::StreamExt;
    use technanas_core::{FieldValue, MemoryRemoteStore, RemoteCall, RemoteError, RemoteOp};

    const OWNER: &str = "a@x.com";

    struct Fixture {
        ctx: TestCache,
        remote: Arc<MemoryRemoteStore>,
        sync: FarmSync,
    }

    async fn setup() -> Fixture {
        let ctx = setup_cache().await;
        let remote = Arc::new(MemoryRemoteStore::new());
        let sync = FarmSync::new(&ctx.cache, remote.clone());
        Fixture { ctx, remote, sync }
    }

    fn doc(pairs: &[(&str, FieldValue)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_create_sets_remote_id() {
        let f = setup().await;

        let farm = Farm::new(1, "F1").with_state("Johor").with_location(1.5, 103.5);
        let created = f.sync.create(&farm, OWNER).await.unwrap();

        assert_eq!(created.remote_id.as_deref(), Some("doc1"));
        assert!(created.id > 0);

        let cached = f.sync.get(created.id).await.unwrap().unwrap();
        assert_eq!(cached.remote_id.as_deref(), Some("doc1"));

        let remote = f.remote.peek(FARMS, "doc1").await.unwrap();
        assert_eq!(remote.get_str("ownerEmail"), Some(OWNER));
        assert_eq!(remote.get_str("name"), Some("F1"));
        assert_eq!(remote.get_f64("latitude"), Some(1.5));
        assert_eq!(remote.get("size"), Some(&FieldValue::Null));
    }

    #[tokio::test]
    async fn test_create_remote_failure_caches_nothing() {
        let f = setup().await;
        f.remote
            .fail_with(RemoteOp::Add, RemoteError::PermissionDenied("rules".into()))
            .await;

        let result = f.sync.create(&Farm::new(1, "F1"), OWNER).await;
        assert!(matches!(result, Err(SyncError::Remote(_))));
        assert!(f.sync.list_for_user(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_overwrites_remote_document() {
        let f = setup().await;
        let created = f.sync.create(&Farm::new(1, "F1"), OWNER).await.unwrap();

        let mut renamed = created.clone();
        renamed.name = "F2".into();
        f.sync.update(&renamed, OWNER).await.unwrap();

        let calls = f.remote.calls().await;
        assert_eq!(
            calls.last(),
            Some(&RemoteCall {
                op: RemoteOp::Set,
                collection: FARMS.to_string(),
                id: Some("doc1".to_string()),
            })
        );
        let remote = f.remote.peek(FARMS, "doc1").await.unwrap();
        assert_eq!(remote.get_str("name"), Some("F2"));

        let cached = f.sync.get(created.id).await.unwrap().unwrap();
        assert_eq!(cached.name, "F2");
        assert_eq!(cached.remote_id.as_deref(), Some("doc1"));
    }

    #[tokio::test]
    async fn test_update_without_remote_id_creates() {
        let f = setup().await;

        let farm = Farm::new(1, "Fresh");
        let updated = f.sync.update(&farm, OWNER).await.unwrap();

        assert_eq!(updated.remote_id.as_deref(), Some("doc1"));
        let ops: Vec<RemoteOp> = f.remote.calls().await.into_iter().map(|c| c.op).collect();
        assert_eq!(ops, vec![RemoteOp::Add]);

        let cached = f.sync.list_for_user(1).await.unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].name, "Fresh");
    }

    #[tokio::test]
    async fn test_update_unsynced_cached_row_gains_remote_id() {
        let f = setup().await;
        let id = f
            .ctx
            .cache
            .farms()
            .insert(&Farm::new(1, "Orphan"), ConflictPolicy::Abort)
            .await
            .unwrap();
        let farm = f.sync.get(id).await.unwrap().unwrap();
        assert!(!farm.is_synced());

        let synced = f.sync.update(&farm, OWNER).await.unwrap();
        assert_eq!(synced.id, id);
        assert_eq!(synced.remote_id.as_deref(), Some("doc1"));

        let cached = f.sync.list_for_user(1).await.unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].id, id);
        assert_eq!(cached[0].remote_id.as_deref(), Some("doc1"));

        let ops: Vec<RemoteOp> = f.remote.calls().await.into_iter().map(|c| c.op).collect();
        assert_eq!(ops, vec![RemoteOp::Add]);
        let remote = f.remote.peek(FARMS, "doc1").await.unwrap();
        assert_eq!(remote.get_str("name"), Some("Orphan"));
    }

    #[tokio::test]
    async fn test_update_after_local_row_removed_keeps_remote_write() {
        let f = setup().await;
        let created = f.sync.create(&Farm::new(1, "F1"), OWNER).await.unwrap();
        f.ctx.cache.farms().delete(created.id).await.unwrap();

        let mut renamed = created.clone();
        renamed.name = "F2".into();
        f.sync.update(&renamed, OWNER).await.unwrap();

        let remote = f.remote.peek(FARMS, "doc1").await.unwrap();
        assert_eq!(remote.get_str("name"), Some("F2"));
        assert!(f.sync.list_for_user(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_local_failure_orphans_remote_document() {
        let f = setup().await;
        reject_writes(&f.ctx.cache, "farms", "INSERT").await;

        let result = f.sync.create(&Farm::new(1, "F1"), OWNER).await;
        assert!(matches!(result, Err(SyncError::Cache(_))));

        // No unsynced row appears; the remote document is left behind.
        assert!(f.sync.list_for_user(1).await.unwrap().is_empty());
        let remote = f.remote.peek(FARMS, "doc1").await.unwrap();
        assert_eq!(remote.get_str("name"), Some("F1"));
    }

    #[tokio::test]
    async fn test_update_local_failure_keeps_remote_write() {
        let f = setup().await;
        let created = f.sync.create(&Farm::new(1, "F1"), OWNER).await.unwrap();
        reject_writes(&f.ctx.cache, "farms", "UPDATE").await;

        let mut renamed = created.clone();
        renamed.name = "F2".into();
        let result = f.sync.update(&renamed, OWNER).await;
        assert!(matches!(result, Err(SyncError::Cache(_))));

        let remote = f.remote.peek(FARMS, "doc1").await.unwrap();
        assert_eq!(remote.get_str("name"), Some("F2"));
        let cached = f.sync.get(created.id).await.unwrap().unwrap();
        assert_eq!(cached.name, "F1");
    }

    #[tokio::test]
    async fn test_update_remote_failure_leaves_cache() {
        let f = setup().await;
        let created = f.sync.create(&Farm::new(1, "F1"), OWNER).await.unwrap();
        f.remote.go_offline().await;

        let mut renamed = created.clone();
        renamed.name = "F2".into();
        assert!(f.sync.update(&renamed, OWNER).await.is_err());

        let cached = f.sync.get(created.id).await.unwrap().unwrap();
        assert_eq!(cached.name, "F1");
    }

    #[tokio::test]
    async fn test_delete_removes_local_row_even_when_remote_fails() {
        let f = setup().await;
        let created = f.sync.create(&Farm::new(1, "F1"), OWNER).await.unwrap();
        f.remote
            .fail_with(RemoteOp::Delete, RemoteError::Unavailable("offline".into()))
            .await;

        f.sync.delete(&created).await.unwrap();

        assert!(f.sync.get(created.id).await.unwrap().is_none());
        // The remote document is orphaned.
        assert!(f.remote.peek(FARMS, "doc1").await.is_some());
    }

    #[tokio::test]
    async fn test_delete_unsynced_farm_skips_remote() {
        let f = setup().await;
        let id = f
            .ctx
            .cache
            .farms()
            .insert(&Farm::new(1, "Orphan"), ConflictPolicy::Abort)
            .await
            .unwrap();
        let farm = f.sync.get(id).await.unwrap().unwrap();

        f.sync.delete(&farm).await.unwrap();

        assert_eq!(f.remote.call_count().await, 0);
        assert!(f.sync.get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_for_owner_replaces_only_that_user() {
        let f = setup().await;
        let farms = f.ctx.cache.farms();
        farms
            .insert(&Farm::new(1, "Stale"), ConflictPolicy::Abort)
            .await
            .unwrap();
        farms
            .insert(&Farm::new(2, "Neighbour"), ConflictPolicy::Abort)
            .await
            .unwrap();

        f.remote
            .put(
                FARMS,
                "r1",
                doc(&[
                    ("ownerEmail", OWNER.into()),
                    ("name", "Remote A".into()),
                    ("latitude", 2i64.into()),
                ]),
            )
            .await;
        f.remote
            .put(FARMS, "r2", doc(&[("ownerEmail", OWNER.into())]))
            .await;
        f.remote
            .put(
                FARMS,
                "r3",
                doc(&[("ownerEmail", "b@x.com".into()), ("name", "Not mine".into())]),
            )
            .await;

        let outcome = f.sync.refresh_for_owner(1, OWNER).await.unwrap();
        assert_eq!(
            outcome,
            RefreshOutcome::Refreshed {
                stored: 1,
                dropped: 1
            }
        );

        let mine = f.sync.list_for_user(1).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "Remote A");
        assert_eq!(mine[0].remote_id.as_deref(), Some("r1"));
        assert_eq!(mine[0].latitude, Some(2.0));

        let theirs = f.sync.list_for_user(2).await.unwrap();
        assert_eq!(theirs.len(), 1);
        assert_eq!(theirs[0].name, "Neighbour");
    }

    #[tokio::test]
    async fn test_refresh_for_owner_offline_keeps_cache() {
        let f = setup().await;
        f.sync.create(&Farm::new(1, "F1"), OWNER).await.unwrap();
        let before = f.sync.list_for_user(1).await.unwrap();

        f.remote.go_offline().await;
        let outcome = f.sync.refresh_for_owner(1, OWNER).await.unwrap();

        assert!(outcome.is_stale());
        assert_eq!(f.sync.list_for_user(1).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_watch_for_user_follows_writes() {
        let f = setup().await;
        let stream = f.sync.watch_for_user(1);
        futures::pin_mut!(stream);
        assert!(stream.next().await.unwrap().unwrap().is_empty());

        let created = f.sync.create(&Farm::new(1, "F1"), OWNER).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap().len(), 1);

        f.sync.delete(&created).await.unwrap();
        assert!(stream.next().await.unwrap().unwrap().is_empty());
    }
}
