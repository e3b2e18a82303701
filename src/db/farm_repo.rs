use futures::Stream;
use technanas_core::Farm;

use super::{live_query, Cache, Change, ConflictPolicy, Table};

pub struct FarmRepository {
    cache: Cache,
}

#[derive(sqlx::FromRow)]
struct FarmRow {
    id: i64,
    user_id: i64,
    name: String,
    size: Option<String>,
    state: Option<String>,
    address: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    remote_id: Option<String>,
}

impl From<FarmRow> for Farm {
    fn from(row: FarmRow) -> Self {
        Farm {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            size: row.size,
            state: row.state,
            address: row.address,
            latitude: row.latitude,
            longitude: row.longitude,
            remote_id: row.remote_id,
        }
    }
}

const INSERT_COLUMNS: &str = "INTO farms (user_id, name, size, state, address, latitude, longitude, remote_id) VALUES (?, ?, ?, ?, ?, ?, ?, ?)";

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

fn bind_farm<'q>(query: SqliteQuery<'q>, farm: &'q Farm) -> SqliteQuery<'q> {
    query
        .bind(farm.user_id)
        .bind(&farm.name)
        .bind(&farm.size)
        .bind(&farm.state)
        .bind(&farm.address)
        .bind(farm.latitude)
        .bind(farm.longitude)
        .bind(&farm.remote_id)
}

impl FarmRepository {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    pub async fn insert(&self, farm: &Farm, policy: ConflictPolicy) -> Result<i64, sqlx::Error> {
        let sql = format!("{} {}", policy.insert_verb(), INSERT_COLUMNS);
        let id = bind_farm(sqlx::query(&sql), farm)
            .execute(self.cache.pool())
            .await?
            .last_insert_rowid();

        self.cache.publish(Table::Farms, Change::Inserted);
        Ok(id)
    }

    pub async fn insert_all(&self, farms: &[Farm]) -> Result<(), sqlx::Error> {
        let sql = format!("{} {}", ConflictPolicy::Replace.insert_verb(), INSERT_COLUMNS);
        let mut tx = self.cache.pool().begin().await?;
        for farm in farms {
            bind_farm(sqlx::query(&sql), farm).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        self.cache.publish(Table::Farms, Change::Inserted);
        Ok(())
    }

    /// Returns false when no row has `farm.id`.
    pub async fn update(&self, farm: &Farm) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE farms
            SET user_id = ?, name = ?, size = ?, state = ?, address = ?,
                latitude = ?, longitude = ?, remote_id = ?
            WHERE id = ?
            "#,
        )
        .bind(farm.user_id)
        .bind(&farm.name)
        .bind(&farm.size)
        .bind(&farm.state)
        .bind(&farm.address)
        .bind(farm.latitude)
        .bind(farm.longitude)
        .bind(&farm.remote_id)
        .bind(farm.id)
        .execute(self.cache.pool())
        .await?;

        self.cache.publish(Table::Farms, Change::Updated);
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM farms WHERE id = ?")
            .bind(id)
            .execute(self.cache.pool())
            .await?;

        self.cache.publish(Table::Farms, Change::Deleted);
        Ok(result.rows_affected() > 0)
    }

    pub async fn clear_for_user(&self, user_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM farms WHERE user_id = ?")
            .bind(user_id)
            .execute(self.cache.pool())
            .await?;

        self.cache.publish(Table::Farms, Change::Cleared);
        Ok(())
    }

    /// Replaces every farm owned by `user_id` with `farms` in one transaction.
    /// Other users' farms are untouched.
    pub async fn replace_for_user(&self, user_id: i64, farms: &[Farm]) -> Result<(), sqlx::Error> {
        let sql = format!("{} {}", ConflictPolicy::Replace.insert_verb(), INSERT_COLUMNS);
        let mut tx = self.cache.pool().begin().await?;

        sqlx::query("DELETE FROM farms WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        for farm in farms {
            bind_farm(sqlx::query(&sql), farm).execute(&mut *tx).await?;
        }

        tx.commit().await?;

        self.cache.publish(Table::Farms, Change::Replaced);
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Farm>, sqlx::Error> {
        let row: Option<FarmRow> = sqlx::query_as("SELECT * FROM farms WHERE id = ?")
            .bind(id)
            .fetch_optional(self.cache.pool())
            .await?;
        Ok(row.map(Farm::from))
    }

    /// Farms owned by `user_id`, by name.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Farm>, sqlx::Error> {
        let rows: Vec<FarmRow> =
            sqlx::query_as("SELECT * FROM farms WHERE user_id = ? ORDER BY name ASC, id ASC")
                .bind(user_id)
                .fetch_all(self.cache.pool())
                .await?;
        Ok(rows.into_iter().map(Farm::from).collect())
    }

    pub fn watch_for_user(
        &self,
        user_id: i64,
    ) -> impl Stream<Item = Result<Vec<Farm>, sqlx::Error>> {
        let cache = self.cache.clone();
        live_query(self.cache.changes().subscribe(Table::Farms), move || {
            let repo = FarmRepository::new(cache.clone());
            async move { repo.list_for_user(user_id).await }
        })
    }
}
