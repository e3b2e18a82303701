//! Signed-in user session.
//!
//! Persisted as a small JSON file next to the cache so that consecutive CLI
//! invocations share one login. Provides the [`IdentityContext`] the sync
//! coordinators and commands consult for the current email and local id.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use technanas_core::{Account, IdentityContext};

/// Cached details of the signed-in account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: i64,
    pub full_name: String,
    pub email: String,
    pub is_admin: bool,
    pub role: String,
    #[serde(default)]
    pub sub_role: Option<String>,
}

#[derive(Debug)]
pub enum SessionError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, serde_json::Error),
    NotLoggedIn,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Io(path, e) => {
                write!(f, "Failed to access session file '{}': {}", path.display(), e)
            }
            SessionError::Parse(path, e) => {
                write!(f, "Failed to parse session file '{}': {}", path.display(), e)
            }
            SessionError::NotLoggedIn => write!(f, "Not logged in. Run 'nanas account login' first."),
        }
    }
}

impl std::error::Error for SessionError {}

pub struct Session {
    path: PathBuf,
    user: Option<SessionUser>,
}

impl Session {
    /// Loads the session stored at `path`. A missing file is a logged-out
    /// session.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let user = if path.exists() {
            let contents =
                std::fs::read_to_string(&path).map_err(|e| SessionError::Io(path.clone(), e))?;
            Some(serde_json::from_str(&contents).map_err(|e| SessionError::Parse(path.clone(), e))?)
        } else {
            None
        };
        Ok(Self { path, user })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    /// The signed-in user, or [`SessionError::NotLoggedIn`].
    pub fn require_user(&self) -> Result<&SessionUser, SessionError> {
        self.user.as_ref().ok_or(SessionError::NotLoggedIn)
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.is_admin)
    }

    pub fn save_login(&mut self, account: &Account) -> Result<(), SessionError> {
        self.user = Some(SessionUser {
            user_id: account.id,
            full_name: account.full_name.clone(),
            email: account.email.clone(),
            is_admin: account.is_admin,
            role: account.role.clone(),
            sub_role: account.sub_role.clone(),
        });
        self.persist()
    }

    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.user = None;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::Io(self.path.clone(), e)),
        }
    }

    pub fn update_name(&mut self, full_name: &str) -> Result<(), SessionError> {
        let user = self.user.as_mut().ok_or(SessionError::NotLoggedIn)?;
        user.full_name = full_name.to_string();
        self.persist()
    }

    pub fn update_role(&mut self, role: &str, sub_role: Option<&str>) -> Result<(), SessionError> {
        let user = self.user.as_mut().ok_or(SessionError::NotLoggedIn)?;
        user.role = role.to_string();
        user.sub_role = sub_role.map(str::to_string);
        self.persist()
    }

    fn persist(&self) -> Result<(), SessionError> {
        let Some(user) = &self.user else {
            return Ok(());
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SessionError::Io(self.path.clone(), e))?;
        }
        let json = serde_json::to_string_pretty(user)
            .map_err(|e| SessionError::Parse(self.path.clone(), e))?;
        std::fs::write(&self.path, json).map_err(|e| SessionError::Io(self.path.clone(), e))
    }
}

impl IdentityContext for Session {
    fn current_email(&self) -> Option<String> {
        self.user.as_ref().map(|u| u.email.clone())
    }

    fn current_local_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.user_id)
    }
}
