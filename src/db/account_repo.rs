use futures::Stream;
use technanas_core::Account;

use super::{live_query, Cache, Change, ConflictPolicy, Table};

pub struct AccountRepository {
    cache: Cache,
}

// Row types for database queries
#[derive(sqlx::FromRow)]
struct AccountRow {
    id: i64,
    full_name: String,
    phone: String,
    email: String,
    password: String,
    is_admin: bool,
    role: String,
    sub_role: Option<String>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            full_name: row.full_name,
            phone: row.phone,
            email: row.email,
            password: row.password,
            is_admin: row.is_admin,
            role: row.role,
            sub_role: row.sub_role,
        }
    }
}

impl AccountRepository {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }

    /// Inserts an account and returns its generated id. The id on `account`
    /// is ignored.
    pub async fn insert(
        &self,
        account: &Account,
        policy: ConflictPolicy,
    ) -> Result<i64, sqlx::Error> {
        let sql = format!(
            r#"
            {} INTO accounts (full_name, phone, email, password, is_admin, role, sub_role)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            policy.insert_verb()
        );

        let id = sqlx::query(&sql)
            .bind(&account.full_name)
            .bind(&account.phone)
            .bind(&account.email)
            .bind(&account.password)
            .bind(account.is_admin)
            .bind(&account.role)
            .bind(&account.sub_role)
            .execute(self.cache.pool())
            .await?
            .last_insert_rowid();

        self.cache.publish(Table::Accounts, Change::Inserted);
        Ok(id)
    }

    /// Returns false when no row has `account.id`.
    pub async fn update(&self, account: &Account) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET full_name = ?, phone = ?, email = ?, password = ?, is_admin = ?,
                role = ?, sub_role = ?
            WHERE id = ?
            "#,
        )
        .bind(&account.full_name)
        .bind(&account.phone)
        .bind(&account.email)
        .bind(&account.password)
        .bind(account.is_admin)
        .bind(&account.role)
        .bind(&account.sub_role)
        .bind(account.id)
        .execute(self.cache.pool())
        .await?;

        self.cache.publish(Table::Accounts, Change::Updated);
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Account>, sqlx::Error> {
        let row: Option<AccountRow> = sqlx::query_as("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(self.cache.pool())
            .await?;
        Ok(row.map(Account::from))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<Account>, sqlx::Error> {
        let row: Option<AccountRow> =
            sqlx::query_as("SELECT * FROM accounts WHERE email = ? LIMIT 1")
                .bind(email)
                .fetch_optional(self.cache.pool())
                .await?;
        Ok(row.map(Account::from))
    }

    pub async fn count_by_email(&self, email: &str) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts WHERE email = ?")
            .bind(email)
            .fetch_one(self.cache.pool())
            .await?;
        Ok(count)
    }

    pub async fn admin_count(&self) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts WHERE is_admin = 1")
            .fetch_one(self.cache.pool())
            .await?;
        Ok(count)
    }

    /// Non-admin accounts with the given role, by name.
    pub async fn list_by_role(&self, role: &str) -> Result<Vec<Account>, sqlx::Error> {
        let rows: Vec<AccountRow> = sqlx::query_as(
            "SELECT * FROM accounts WHERE role = ? AND is_admin = 0 ORDER BY full_name ASC",
        )
        .bind(role)
        .fetch_all(self.cache.pool())
        .await?;
        Ok(rows.into_iter().map(Account::from).collect())
    }

    /// Live view of one account; emits `None` once it no longer exists.
    pub fn watch_by_id(
        &self,
        id: i64,
    ) -> impl Stream<Item = Result<Option<Account>, sqlx::Error>> {
        let cache = self.cache.clone();
        live_query(self.cache.changes().subscribe(Table::Accounts), move || {
            let repo = AccountRepository::new(cache.clone());
            async move { repo.get_by_id(id).await }
        })
    }

    /// Live view of [`list_by_role`](Self::list_by_role).
    pub fn watch_by_role(
        &self,
        role: &str,
    ) -> impl Stream<Item = Result<Vec<Account>, sqlx::Error>> {
        let cache = self.cache.clone();
        let role = role.to_string();
        live_query(self.cache.changes().subscribe(Table::Accounts), move || {
            let repo = AccountRepository::new(cache.clone());
            let role = role.clone();
            async move { repo.list_by_role(&role).await }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::setup_cache;
    use futures::StreamExt;
    use technanas_core::Role;

    #[tokio::test]
    async fn test_insert_and_get_by_email() {
        let ctx = setup_cache().await;
        let repo = ctx.cache.accounts();

        let account = Account::new("Ann Lee", "a@x.com", "secret1").with_phone("0123456789");
        let id = repo.insert(&account, ConflictPolicy::Abort).await.unwrap();
        assert!(id > 0);

        let fetched = repo.get_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.full_name, "Ann Lee");
        assert_eq!(fetched.password, "secret1");
        assert_eq!(repo.count_by_email("a@x.com").await.unwrap(), 1);
        assert_eq!(repo.count_by_email("b@x.com").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_email_aborts() {
        let ctx = setup_cache().await;
        let repo = ctx.cache.accounts();

        repo.insert(&Account::new("Ann", "a@x.com", "secret1"), ConflictPolicy::Abort)
            .await
            .unwrap();
        let result = repo
            .insert(&Account::new("Ann2", "a@x.com", "secret2"), ConflictPolicy::Abort)
            .await;
        assert!(result.is_err());

        let fetched = repo.get_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(fetched.full_name, "Ann");
    }

    #[tokio::test]
    async fn test_update_account() {
        let ctx = setup_cache().await;
        let repo = ctx.cache.accounts();

        let id = repo
            .insert(&Account::new("Ann", "a@x.com", "secret1"), ConflictPolicy::Abort)
            .await
            .unwrap();
        let mut account = repo.get_by_id(id).await.unwrap().unwrap();
        account.full_name = "Ann Lee".to_string();
        account.phone = "0199999999".to_string();
        assert!(repo.update(&account).await.unwrap());

        let fetched = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(fetched.full_name, "Ann Lee");
        assert_eq!(fetched.phone, "0199999999");
        assert_eq!(fetched.password, "secret1");
    }

    #[tokio::test]
    async fn test_list_by_role_excludes_admins_and_sorts() {
        let ctx = setup_cache().await;
        let repo = ctx.cache.accounts();

        repo.insert(&Account::new("Zed", "z@x.com", "pw1234"), ConflictPolicy::Abort)
            .await
            .unwrap();
        repo.insert(&Account::new("Amy", "amy@x.com", "pw1234"), ConflictPolicy::Abort)
            .await
            .unwrap();
        repo.insert(
            &Account::new("Buyer", "buy@x.com", "pw1234").with_role(Role::Buyer),
            ConflictPolicy::Abort,
        )
        .await
        .unwrap();
        let mut admin = Account::new("Boss", "boss@x.com", "pw1234");
        admin.is_admin = true;
        repo.insert(&admin, ConflictPolicy::Abort).await.unwrap();

        let entrepreneurs = repo.list_by_role("ENTREPRENEUR").await.unwrap();
        let names: Vec<&str> = entrepreneurs.iter().map(|a| a.full_name.as_str()).collect();
        assert_eq!(names, vec!["Amy", "Zed"]);
        assert_eq!(repo.admin_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_watch_by_id_follows_updates() {
        let ctx = setup_cache().await;
        let repo = ctx.cache.accounts();

        let id = repo
            .insert(&Account::new("Ann", "a@x.com", "secret1"), ConflictPolicy::Abort)
            .await
            .unwrap();

        let stream = repo.watch_by_id(id);
        futures::pin_mut!(stream);
        let first = stream.next().await.unwrap().unwrap().unwrap();
        assert_eq!(first.full_name, "Ann");

        let mut account = first.clone();
        account.full_name = "Ann Lee".to_string();
        repo.update(&account).await.unwrap();

        let second = stream.next().await.unwrap().unwrap().unwrap();
        assert_eq!(second.full_name, "Ann Lee");
    }
}
