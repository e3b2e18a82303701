//! Identity context consumed by the sync layer.
//!
//! The session that owns the signed-in user lives outside the core; the sync
//! coordinators and commands only need its natural key (email) and the
//! account's local cache id.

pub trait IdentityContext {
    /// Email of the signed-in account, if any.
    fn current_email(&self) -> Option<String>;

    /// Local cache id of the signed-in account, if any.
    fn current_local_id(&self) -> Option<i64>;

    fn is_signed_in(&self) -> bool {
        self.current_email().is_some()
    }
}

/// A fixed identity, handy for background jobs and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticIdentity {
    pub email: Option<String>,
    pub local_id: Option<i64>,
}

impl StaticIdentity {
    pub fn new(email: impl Into<String>, local_id: i64) -> Self {
        Self {
            email: Some(email.into()),
            local_id: Some(local_id),
        }
    }
}

impl IdentityContext for StaticIdentity {
    fn current_email(&self) -> Option<String> {
        self.email.clone()
    }

    fn current_local_id(&self) -> Option<i64> {
        self.local_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_identity() {
        let identity = StaticIdentity::new("a@x.com", 7);
        assert_eq!(identity.current_email().as_deref(), Some("a@x.com"));
        assert_eq!(identity.current_local_id(), Some(7));
        assert!(identity.is_signed_in());
        assert!(!StaticIdentity::default().is_signed_in());
    }
}
