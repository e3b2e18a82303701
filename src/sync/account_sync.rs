//! Account coordinator.
//!
//! Accounts are correlated by email: the remote document id is the email and
//! the cache holds at most one row per email. Passwords never leave the
//! cache.

use std::sync::Arc;

use futures::Stream;
use technanas_core::{Account, Document, Fields, Query, RemoteError, RemoteStore, Role};
use tracing::{debug, info, warn};

use super::{RefreshOutcome, USERS};
use crate::db::{AccountRepository, Cache, ConflictPolicy};

/// Failures of account operations. Expected outcomes such as a duplicate
/// email or a wrong password are variants here rather than panics or
/// stringly-typed errors.
#[derive(Debug)]
pub enum AccountError {
    /// A cached account already uses this email. No remote call was made.
    DuplicateEmail,
    UserNotFound,
    IncorrectPassword,
    /// The remote write succeeded but the cache has no row for the account
    /// afterwards.
    NotSavedLocally,
    Remote(RemoteError),
    Cache(sqlx::Error),
}

impl std::fmt::Display for AccountError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountError::DuplicateEmail => write!(f, "Email already registered."),
            AccountError::UserNotFound => write!(f, "User not found."),
            AccountError::IncorrectPassword => write!(f, "Incorrect password."),
            AccountError::NotSavedLocally => write!(f, "Failed to save user locally."),
            AccountError::Remote(e) => write!(f, "{}", e),
            AccountError::Cache(e) => write!(f, "Local cache error: {}", e),
        }
    }
}

impl std::error::Error for AccountError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AccountError::Remote(e) => Some(e),
            AccountError::Cache(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RemoteError> for AccountError {
    fn from(e: RemoteError) -> Self {
        AccountError::Remote(e)
    }
}

impl From<sqlx::Error> for AccountError {
    fn from(e: sqlx::Error) -> Self {
        AccountError::Cache(e)
    }
}

/// Profile content read from a remote account document.
#[derive(Debug, Clone, PartialEq)]
struct RemoteProfile {
    full_name: String,
    phone: String,
    email: String,
    is_admin: bool,
    role: String,
    sub_role: Option<String>,
}

impl RemoteProfile {
    /// Parses the document stored under `email`. Requires `fullName`; a
    /// missing role follows the admin flag.
    fn from_owned_document(doc: &Document, email: &str) -> Option<Self> {
        let full_name = doc.get_str("fullName")?.to_string();
        let is_admin = doc.get_bool("isAdmin").unwrap_or(false);
        let role = doc.get_str("role").map(str::to_string).unwrap_or_else(|| {
            if is_admin {
                Role::Admin.to_string()
            } else {
                Role::Entrepreneur.to_string()
            }
        });
        Some(Self {
            full_name,
            phone: doc.get_str("phone").unwrap_or_default().to_string(),
            email: email.to_string(),
            is_admin,
            role,
            sub_role: doc.get_str("subRole").map(str::to_string),
        })
    }

    /// Parses a document returned by a role query. Requires `email` and
    /// `fullName`.
    fn from_listed_document(doc: &Document) -> Option<Self> {
        let email = doc.get_str("email")?.to_string();
        let full_name = doc.get_str("fullName")?.to_string();
        Some(Self {
            full_name,
            phone: doc.get_str("phone").unwrap_or_default().to_string(),
            email,
            is_admin: doc.get_bool("isAdmin").unwrap_or(false),
            role: doc
                .get_str("role")
                .map(str::to_string)
                .unwrap_or_else(|| Role::Entrepreneur.to_string()),
            sub_role: doc.get_str("subRole").map(str::to_string),
        })
    }
}

/// Remote document body for an account. The password is never included.
fn account_fields(account: &Account) -> Fields {
    let mut fields = Fields::new();
    fields.insert("fullName".into(), account.full_name.as_str().into());
    fields.insert("phone".into(), account.phone.as_str().into());
    fields.insert("email".into(), account.email.as_str().into());
    fields.insert("isAdmin".into(), account.is_admin.into());
    fields.insert("role".into(), account.role.as_str().into());
    fields.insert("subRole".into(), account.sub_role.clone().into());
    fields
}

pub struct AccountSync {
    accounts: AccountRepository,
    remote: Arc<dyn RemoteStore>,
}

impl AccountSync {
    pub fn new(cache: &Cache, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            accounts: cache.accounts(),
            remote,
        }
    }

    /// Registers a new account: remote document first, then the cache row.
    ///
    /// If the remote write succeeds and the local insert fails, the remote
    /// document stays in place and the error is returned.
    pub async fn register(&self, account: &Account) -> Result<Account, AccountError> {
        if self.accounts.count_by_email(&account.email).await? > 0 {
            return Err(AccountError::DuplicateEmail);
        }

        self.remote
            .set_document(USERS, &account.email, account_fields(account))
            .await?;

        if let Err(e) = self.accounts.insert(account, ConflictPolicy::Abort).await {
            warn!(
                email = %account.email,
                "Account stored remotely but not in the local cache: {}", e
            );
            return Err(AccountError::Cache(e));
        }

        let stored = self
            .accounts
            .get_by_email(&account.email)
            .await?
            .ok_or(AccountError::NotSavedLocally)?;
        info!(email = %stored.email, id = stored.id, "Registered account");
        Ok(stored)
    }

    /// Checks credentials against the cache only.
    pub async fn login(&self, email: &str, password: &str) -> Result<Account, AccountError> {
        let account = self
            .accounts
            .get_by_email(email)
            .await?
            .ok_or(AccountError::UserNotFound)?;
        if account.password == password {
            Ok(account)
        } else {
            Err(AccountError::IncorrectPassword)
        }
    }

    /// Pulls the remote profile for `email` into the cache. An absent remote
    /// document is a no-op; nothing is ever deleted.
    pub async fn refresh_one(&self, email: &str) -> Result<RefreshOutcome, sqlx::Error> {
        let doc = match self.remote.get_document(USERS, email).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(email, "Account refresh failed, keeping cached profile: {}", e);
                return Ok(RefreshOutcome::Stale(e));
            }
        };

        let Some(doc) = doc else {
            debug!(email, "No remote profile");
            return Ok(RefreshOutcome::Refreshed {
                stored: 0,
                dropped: 0,
            });
        };

        match RemoteProfile::from_owned_document(&doc, email) {
            Some(profile) => {
                self.upsert(profile).await?;
                info!(email, "Refreshed account");
                Ok(RefreshOutcome::Refreshed {
                    stored: 1,
                    dropped: 0,
                })
            }
            None => {
                debug!(email, "Dropping remote profile without fullName");
                Ok(RefreshOutcome::Refreshed {
                    stored: 0,
                    dropped: 1,
                })
            }
        }
    }

    /// Upserts every remote account whose role equals `role`. Cached rows
    /// that no longer match remotely are left alone.
    pub async fn refresh_scoped(&self, role: &str) -> Result<RefreshOutcome, sqlx::Error> {
        let query = Query::collection(USERS).where_eq("role", role);
        let docs = match self.remote.query(&query).await {
            Ok(docs) => docs,
            Err(e) => {
                warn!(role, "Account list refresh failed, keeping cache: {}", e);
                return Ok(RefreshOutcome::Stale(e));
            }
        };

        let mut stored = 0;
        let mut dropped = 0;
        for doc in &docs {
            match RemoteProfile::from_listed_document(doc) {
                Some(profile) => {
                    self.upsert(profile).await?;
                    stored += 1;
                }
                None => {
                    debug!(id = %doc.id, "Dropping account document without email or fullName");
                    dropped += 1;
                }
            }
        }

        info!(role, stored, dropped, "Refreshed accounts");
        Ok(RefreshOutcome::Refreshed { stored, dropped })
    }

    /// Writes the profile remotely (full upsert), then updates the cache row.
    /// The remote write is not undone if the cache row is gone or the local
    /// update fails.
    pub async fn update_profile(&self, account: &Account) -> Result<Account, AccountError> {
        self.remote
            .set_document(USERS, &account.email, account_fields(account))
            .await?;

        match self.accounts.update(account).await {
            Ok(true) => Ok(account.clone()),
            Ok(false) => {
                warn!(
                    email = %account.email,
                    id = account.id,
                    "Profile updated remotely but no cached row matched"
                );
                Err(AccountError::NotSavedLocally)
            }
            Err(e) => {
                warn!(
                    email = %account.email,
                    "Profile updated remotely but not in the local cache: {}", e
                );
                Err(AccountError::Cache(e))
            }
        }
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<Account>, sqlx::Error> {
        self.accounts.get_by_email(email).await
    }

    /// Cached entrepreneurs (non-admin), by name.
    pub async fn list_entrepreneurs(&self) -> Result<Vec<Account>, sqlx::Error> {
        self.accounts.list_by_role(Role::Entrepreneur.as_str()).await
    }

    pub fn watch_account(
        &self,
        id: i64,
    ) -> impl Stream<Item = Result<Option<Account>, sqlx::Error>> {
        self.accounts.watch_by_id(id)
    }

    /// Live list of cached entrepreneurs; call
    /// [`refresh_scoped`](Self::refresh_scoped) to fill it.
    pub fn watch_entrepreneurs(&self) -> impl Stream<Item = Result<Vec<Account>, sqlx::Error>> {
        self.accounts.watch_by_role(Role::Entrepreneur.as_str())
    }

    /// Inserts or merges a remote profile, keeping any cached password.
    async fn upsert(&self, profile: RemoteProfile) -> Result<(), sqlx::Error> {
        match self.accounts.get_by_email(&profile.email).await? {
            Some(mut local) => {
                local.full_name = profile.full_name;
                local.phone = profile.phone;
                local.is_admin = profile.is_admin;
                local.role = profile.role;
                local.sub_role = profile.sub_role;
                self.accounts.update(&local).await.map(|_| ())
            }
            None => {
                let account = Account {
                    id: 0,
                    full_name: profile.full_name,
                    phone: profile.phone,
                    email: profile.email,
                    password: String::new(),
                    is_admin: profile.is_admin,
                    role: profile.role,
                    sub_role: profile.sub_role,
                };
                self.accounts
                    .insert(&account, ConflictPolicy::Abort)
                    .await
                    .map(|_| ())
            }
        }
    }
}
