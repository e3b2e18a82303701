use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnnouncementType {
    #[default]
    General,
    Price,
    Training,
    Promotion,
    Event,
}

impl AnnouncementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnouncementType::General => "GENERAL",
            AnnouncementType::Price => "PRICE",
            AnnouncementType::Training => "TRAINING",
            AnnouncementType::Promotion => "PROMOTION",
            AnnouncementType::Event => "EVENT",
        }
    }

    /// Lenient parse used for remote and cached values: anything unknown is
    /// treated as a general announcement.
    pub fn parse_or_general(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl fmt::Display for AnnouncementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnnouncementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GENERAL" => Ok(AnnouncementType::General),
            "PRICE" => Ok(AnnouncementType::Price),
            "TRAINING" => Ok(AnnouncementType::Training),
            "PROMOTION" => Ok(AnnouncementType::Promotion),
            "EVENT" => Ok(AnnouncementType::Event),
            _ => Err(format!(
                "Invalid announcement type '{}'. Valid options: general, price, training, promotion, event",
                s
            )),
        }
    }
}

/// A published announcement.
///
/// The owner's email is only stored remotely; the local record never carries
/// it, and the local id is regenerated on every refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Announcement {
    pub id: i64,
    pub title: String,
    pub short_description: String,
    pub full_description: String,
    #[serde(rename = "type")]
    pub kind: AnnouncementType,
    /// Milliseconds since the Unix epoch.
    pub published_at: i64,
    pub external_url: Option<String>,
}

impl Announcement {
    pub fn new(title: impl Into<String>, kind: AnnouncementType, published_at: i64) -> Self {
        Self {
            id: 0,
            title: title.into(),
            short_description: String::new(),
            full_description: String::new(),
            kind,
            published_at,
            external_url: None,
        }
    }

    pub fn with_short_description(mut self, text: impl Into<String>) -> Self {
        self.short_description = text.into();
        self
    }

    pub fn with_full_description(mut self, text: impl Into<String>) -> Self {
        self.full_description = text.into();
        self
    }

    pub fn with_external_url(mut self, url: impl Into<String>) -> Self {
        self.external_url = Some(url.into());
        self
    }
}

/// Formats epoch milliseconds as `dd Mon yyyy` (UTC).
pub fn format_date(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.format("%d %b %Y").to_string())
        .unwrap_or_else(|| "-".to_string())
}

impl fmt::Display for Announcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", "=".repeat(self.title.len()))?;
        writeln!(f, "{} | {}", self.kind, format_date(self.published_at))?;
        if !self.short_description.is_empty() {
            writeln!(f, "\n{}", self.short_description)?;
        }
        if !self.full_description.is_empty() {
            writeln!(f, "\n{}", self.full_description)?;
        }
        if let Some(url) = &self.external_url {
            writeln!(f, "\nMore: {}", url)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_from_str() {
        assert_eq!(
            AnnouncementType::from_str("price").unwrap(),
            AnnouncementType::Price
        );
        assert_eq!(
            AnnouncementType::from_str("EVENT").unwrap(),
            AnnouncementType::Event
        );
        assert!(AnnouncementType::from_str("sale").is_err());
    }

    #[test]
    fn test_parse_or_general_falls_back() {
        assert_eq!(
            AnnouncementType::parse_or_general("TRAINING"),
            AnnouncementType::Training
        );
        assert_eq!(
            AnnouncementType::parse_or_general("bogus"),
            AnnouncementType::General
        );
    }

    #[test]
    fn test_format_date() {
        // 2024-03-05T00:00:00Z
        assert_eq!(format_date(1_709_596_800_000), "05 Mar 2024");
    }

    #[test]
    fn test_type_serializes_uppercase() {
        let json = serde_json::to_string(&AnnouncementType::Promotion).unwrap();
        assert_eq!(json, "\"PROMOTION\"");
    }
}
