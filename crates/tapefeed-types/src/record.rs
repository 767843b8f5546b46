//! Record field values and field mappings.
//!
//! A record is a flat mapping from field name to a string or numeric value.
//! Nothing deeper is allowed: the backing store persists records as Redis
//! hashes, whose fields are scalar. Values read back from the store are
//! textual, so numeric access goes through [`FieldValue::as_f64`], which
//! parses numeric text transparently.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single record field value: an integer, a float, or text.
///
/// Serialized untagged, so JSON `2` round-trips as [`FieldValue::Int`],
/// `2.5` as [`FieldValue::Float`], and `"2.5"` as [`FieldValue::Text`].
/// Integer and float variants are kept separate so that counts serialize
/// as JSON integers (`2`, not `2.0`) on the client wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// An integer value.
    Int(i64),
    /// A floating-point value.
    Float(f64),
    /// A text value.
    Text(String),
}

impl FieldValue {
    /// Interpret this value as an `f64`.
    ///
    /// Numeric text (as read back from a Redis hash) is parsed; text that
    /// does not parse as a number yields `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// Render this value as the string stored in a Redis hash field.
    pub fn to_field_string(&self) -> String {
        match self {
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

/// A flat mapping of field name to value -- the value shape of every record.
///
/// `BTreeMap` keeps field order deterministic across serialization.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// A stored record: its identifier within a category plus its fields.
///
/// Returned by category-wide reads, where the caller needs to know which
/// identifier each field mapping belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// The record's identifier within its category.
    pub identifier: String,
    /// The record's fields.
    pub fields: FieldMap,
}

/// The reserved field name under which a record's identifier travels
/// inside event payloads.
pub const IDENTIFIER_FIELD: &str = "identifier";

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn field_value_untagged_round_trip() {
        let json = r#"{"price":"102.5","qty":3,"pnl":-4.25}"#;
        let map: FieldMap = serde_json::from_str(json).unwrap();
        assert_eq!(map.get("price"), Some(&FieldValue::Text("102.5".into())));
        assert_eq!(map.get("qty"), Some(&FieldValue::Int(3)));
        assert_eq!(map.get("pnl"), Some(&FieldValue::Float(-4.25)));
    }

    #[test]
    fn integers_serialize_without_decimal_point() {
        let value = FieldValue::Int(2);
        assert_eq!(serde_json::to_string(&value).unwrap(), "2");
    }

    #[test]
    fn as_f64_parses_numeric_text() {
        assert_eq!(FieldValue::Text("10.00".into()).as_f64(), Some(10.0));
        assert_eq!(FieldValue::Int(-5).as_f64(), Some(-5.0));
        assert_eq!(FieldValue::Text("n/a".into()).as_f64(), None);
    }

    #[test]
    fn to_field_string_round_trips_through_parse() {
        let original = FieldValue::Float(5.5);
        let stored = original.to_field_string();
        assert_eq!(FieldValue::Text(stored).as_f64(), Some(5.5));
    }
}
