use serde::{Deserialize, Serialize};
use std::fmt;

/// A farm or business location owned by an account.
///
/// `remote_id` is the id of the matching remote document. A stored farm
/// without one is left over from a failed write and is eligible for retry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Farm {
    pub id: i64,
    /// Local id of the owning account.
    pub user_id: i64,
    pub name: String,
    pub size: Option<String>,
    pub state: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub remote_id: Option<String>,
}

impl Farm {
    pub fn new(user_id: i64, name: impl Into<String>) -> Self {
        Self {
            id: 0,
            user_id,
            name: name.into(),
            size: None,
            state: None,
            address: None,
            latitude: None,
            longitude: None,
            remote_id: None,
        }
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn is_synced(&self) -> bool {
        self.remote_id.is_some()
    }
}

impl fmt::Display for Farm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.len()))?;
        if let Some(size) = &self.size {
            writeln!(f, "Size: {}", size)?;
        }
        if let Some(state) = &self.state {
            writeln!(f, "State: {}", state)?;
        }
        if let Some(address) = &self.address {
            writeln!(f, "Address: {}", address)?;
        }
        if let (Some(lat), Some(lng)) = (self.latitude, self.longitude) {
            writeln!(f, "Location: {:.5}, {:.5}", lat, lng)?;
        }
        match &self.remote_id {
            Some(id) => write!(f, "Remote: {}", id),
            None => write!(f, "Remote: (not synced)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_farm_is_unsynced() {
        let farm = Farm::new(1, "Ladang Nanas");
        assert!(!farm.is_synced());
        assert_eq!(farm.id, 0);
    }

    #[test]
    fn test_display_shows_location() {
        let farm = Farm::new(1, "F1")
            .with_state("Johor")
            .with_location(1.4927, 103.7414);
        let text = farm.to_string();
        assert!(text.contains("State: Johor"));
        assert!(text.contains("Location: 1.49270, 103.74140"));
        assert!(text.contains("(not synced)"));
    }
}
