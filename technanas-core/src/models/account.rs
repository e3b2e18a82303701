use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// High-level role of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Entrepreneur,
    Buyer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Entrepreneur => "ENTREPRENEUR",
            Role::Buyer => "BUYER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "ENTREPRENEUR" => Ok(Role::Entrepreneur),
            "BUYER" => Ok(Role::Buyer),
            _ => Err(format!(
                "Invalid role '{}'. Valid options: admin, entrepreneur, buyer",
                s
            )),
        }
    }
}

/// What kind of entrepreneur an account is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubRole {
    Farmer,
    Wholesaler,
    Retailer,
}

impl SubRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubRole::Farmer => "FARMER",
            SubRole::Wholesaler => "WHOLESALER",
            SubRole::Retailer => "RETAILER",
        }
    }
}

impl fmt::Display for SubRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FARMER" => Ok(SubRole::Farmer),
            "WHOLESALER" => Ok(SubRole::Wholesaler),
            "RETAILER" => Ok(SubRole::Retailer),
            _ => Err(format!(
                "Invalid sub-role '{}'. Valid options: farmer, wholesaler, retailer",
                s
            )),
        }
    }
}

/// A registered account.
///
/// `role` and `sub_role` are kept as the raw strings stored remotely so that
/// values written by other clients survive a round trip through the cache.
/// The password only ever lives in the local cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    /// Local cache id; 0 until the row has been stored.
    pub id: i64,
    pub full_name: String,
    pub phone: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub is_admin: bool,
    pub role: String,
    pub sub_role: Option<String>,
}

impl Account {
    pub fn new(
        full_name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            full_name: full_name.into(),
            phone: String::new(),
            email: email.into(),
            password: password.into(),
            is_admin: false,
            role: Role::Entrepreneur.to_string(),
            sub_role: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.is_admin = role == Role::Admin;
        self.role = role.to_string();
        self
    }

    pub fn with_sub_role(mut self, sub_role: SubRole) -> Self {
        self.sub_role = Some(sub_role.to_string());
        self
    }

    pub fn is_entrepreneur(&self) -> bool {
        !self.is_admin && self.role == Role::Entrepreneur.as_str()
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.full_name)?;
        writeln!(f, "{}", "=".repeat(self.full_name.len()))?;
        writeln!(f, "Email: {}", self.email)?;
        if !self.phone.is_empty() {
            writeln!(f, "Phone: {}", self.phone)?;
        }
        match &self.sub_role {
            Some(sub_role) => write!(f, "Role: {} ({})", self.role, sub_role)?,
            None => write!(f, "Role: {}", self.role)?,
        }
        if self.is_admin {
            write!(f, " [admin]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_defaults() {
        let account = Account::new("Ann Lee", "a@x.com", "secret1");
        assert_eq!(account.id, 0);
        assert_eq!(account.role, "ENTREPRENEUR");
        assert!(!account.is_admin);
        assert!(account.is_entrepreneur());
    }

    #[test]
    fn test_with_role_admin_sets_flag() {
        let account = Account::new("Root", "root@x.com", "secret1").with_role(Role::Admin);
        assert!(account.is_admin);
        assert_eq!(account.role, "ADMIN");
        assert!(!account.is_entrepreneur());
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!(Role::from_str("buyer").unwrap(), Role::Buyer);
        assert_eq!(Role::from_str("ENTREPRENEUR").unwrap(), Role::Entrepreneur);
        assert!(Role::from_str("farmer").is_err());
        assert_eq!(SubRole::from_str("Farmer").unwrap(), SubRole::Farmer);
        assert!(SubRole::from_str("").is_err());
    }

    #[test]
    fn test_password_not_serialized() {
        let account = Account::new("Ann Lee", "a@x.com", "secret1");
        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("secret1"));
        assert!(json.contains("a@x.com"));
    }

    #[test]
    fn test_display_includes_sub_role() {
        let account = Account::new("Ann Lee", "a@x.com", "secret1").with_sub_role(SubRole::Farmer);
        let text = account.to_string();
        assert!(text.contains("Role: ENTREPRENEUR (FARMER)"));
    }
}
