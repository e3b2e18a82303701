//! Document and field value model shared by all remote adapters.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A single document field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
}

/// Field map of a document, ordered by field name.
pub type Fields = BTreeMap<String, FieldValue>;

impl FieldValue {
    fn type_rank(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Bool(_) => 1,
            FieldValue::Integer(_) | FieldValue::Double(_) => 2,
            FieldValue::String(_) => 3,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Equality as a document store compares values in filters:
    /// integers and doubles with the same numeric value are equal.
    pub fn matches(&self, other: &FieldValue) -> bool {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    /// Total ordering across types: null < bool < number < string.
    pub fn compare(&self, other: &FieldValue) -> Ordering {
        match self.type_rank().cmp(&other.type_rank()) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
        match (self, other) {
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
            (FieldValue::String(a), FieldValue::String(b)) => a.cmp(b),
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => Ordering::Equal,
            },
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        FieldValue::String(value.clone())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Double(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// A document read from a remote collection.
///
/// Field reads are fallible: a value may be absent or of an unexpected type,
/// and every getter returns `None` in both cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        match self.fields.get(field)? {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Reads an integer; integral doubles are accepted.
    pub fn get_i64(&self, field: &str) -> Option<i64> {
        match self.fields.get(field)? {
            FieldValue::Integer(i) => Some(*i),
            FieldValue::Double(d) if d.fract() == 0.0 && d.is_finite() => Some(*d as i64),
            _ => None,
        }
    }

    /// Reads a double; integers are widened.
    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.fields.get(field)?.as_number()
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        match self.fields.get(field)? {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        let mut fields = Fields::new();
        fields.insert("title".into(), "Harvest".into());
        fields.insert("count".into(), 3i64.into());
        fields.insert("ratio".into(), 2.0f64.into());
        fields.insert("lat".into(), 1.25f64.into());
        fields.insert("flag".into(), true.into());
        fields.insert("missing".into(), FieldValue::Null);
        Document::new("d1", fields)
    }

    #[test]
    fn test_typed_getters() {
        let doc = doc();
        assert_eq!(doc.get_str("title"), Some("Harvest"));
        assert_eq!(doc.get_i64("count"), Some(3));
        assert_eq!(doc.get_bool("flag"), Some(true));
        assert_eq!(doc.get_f64("lat"), Some(1.25));
    }

    #[test]
    fn test_getters_tolerate_wrong_types() {
        let doc = doc();
        assert_eq!(doc.get_str("count"), None);
        assert_eq!(doc.get_bool("title"), None);
        assert_eq!(doc.get_i64("lat"), None);
        assert_eq!(doc.get_str("missing"), None);
        assert_eq!(doc.get_str("absent"), None);
    }

    #[test]
    fn test_numeric_widening() {
        let doc = doc();
        assert_eq!(doc.get_i64("ratio"), Some(2));
        assert_eq!(doc.get_f64("count"), Some(3.0));
    }

    #[test]
    fn test_matches_across_number_types() {
        assert!(FieldValue::Integer(5).matches(&FieldValue::Double(5.0)));
        assert!(!FieldValue::Integer(5).matches(&FieldValue::String("5".into())));
        assert!(FieldValue::from("a").matches(&FieldValue::from("a")));
    }

    #[test]
    fn test_compare_orders_by_type_then_value() {
        assert_eq!(
            FieldValue::Null.compare(&FieldValue::Bool(false)),
            Ordering::Less
        );
        assert_eq!(
            FieldValue::Integer(10).compare(&FieldValue::Double(2.5)),
            Ordering::Greater
        );
        assert_eq!(
            FieldValue::from("b").compare(&FieldValue::from("a")),
            Ordering::Greater
        );
    }

    #[test]
    fn test_option_into_null() {
        let none: Option<String> = None;
        assert_eq!(FieldValue::from(none), FieldValue::Null);
        assert_eq!(
            FieldValue::from(Some(1.5f64)),
            FieldValue::Double(1.5)
        );
    }
}
