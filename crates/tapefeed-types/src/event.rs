//! Store mutation events and the outbound client envelope.
//!
//! A [`StoreEvent`] is what the keyed store publishes on the bus topic named
//! after the mutated category. An [`Envelope`] is the normalized message the
//! distribution service broadcasts to connected dashboard clients.
//!
//! The envelope's JSON shape is the one bit-exact contract external
//! consumers depend on: `{"type", "action", ["category"], "data"}`, in that
//! field order.

use serde::{Deserialize, Serialize};

use crate::record::FieldMap;

/// The kind of mutation an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    /// A record was written in full.
    Create,
    /// Fields were merged into a record.
    Update,
    /// A record was removed.
    Delete,
}

/// A mutation event emitted by the keyed store.
///
/// Published as JSON on the bus topic matching `category`, immediately after
/// the mutation commits. Events are transient: they are never persisted and
/// exist only between publish and delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreEvent {
    /// The category whose record was mutated.
    pub category: String,
    /// The kind of mutation.
    pub action: EventAction,
    /// The mutated fields, always including the record identifier under
    /// [`crate::record::IDENTIFIER_FIELD`].
    pub data: FieldMap,
}

impl StoreEvent {
    /// Build an event for a mutation in `category`.
    pub fn new(category: impl Into<String>, action: EventAction, data: FieldMap) -> Self {
        Self {
            category: category.into(),
            action,
            data,
        }
    }
}

/// The normalized outbound message broadcast to dashboard clients.
///
/// Field declaration order here is wire order; do not reorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// The source category of the event.
    #[serde(rename = "type")]
    pub kind: String,
    /// The mutation kind that produced this message.
    pub action: EventAction,
    /// Present only for signal pass-through messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// The message payload.
    pub data: FieldMap,
}

impl Envelope {
    /// Build a plain envelope: `{"type", "action", "data"}`.
    pub fn new(kind: impl Into<String>, action: EventAction, data: FieldMap) -> Self {
        Self {
            kind: kind.into(),
            action,
            category: None,
            data,
        }
    }

    /// Build a signals pass-through envelope, which additionally carries the
    /// originating event's own category.
    pub fn with_category(
        kind: impl Into<String>,
        action: EventAction,
        category: impl Into<String>,
        data: FieldMap,
    ) -> Self {
        Self {
            kind: kind.into(),
            action,
            category: Some(category.into()),
            data,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::record::FieldValue;

    #[test]
    fn action_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&EventAction::Create).unwrap(), "\"create\"");
        assert_eq!(serde_json::to_string(&EventAction::Delete).unwrap(), "\"delete\"");
    }

    #[test]
    fn envelope_wire_shape_is_exact() {
        let mut data = FieldMap::new();
        data.insert("total_positions".to_owned(), FieldValue::Int(2));
        data.insert("total_pnl".to_owned(), FieldValue::Float(5.0));
        let envelope = Envelope::new("positions", EventAction::Create, data);
        assert_eq!(
            serde_json::to_string(&envelope).unwrap(),
            r#"{"type":"positions","action":"create","data":{"total_pnl":5.0,"total_positions":2}}"#
        );
    }

    #[test]
    fn envelope_category_present_only_when_set() {
        let envelope = Envelope::with_category(
            "signals",
            EventAction::Update,
            "signals",
            FieldMap::new(),
        );
        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(
            json,
            r#"{"type":"signals","action":"update","category":"signals","data":{}}"#
        );
    }

    #[test]
    fn store_event_round_trip() {
        let mut data = FieldMap::new();
        data.insert("identifier".to_owned(), FieldValue::Text("P1".into()));
        data.insert("unrealized_pnl".to_owned(), FieldValue::Text("10.00".into()));
        let event = StoreEvent::new("positions", EventAction::Create, data);
        let json = serde_json::to_vec(&event).unwrap();
        let decoded: StoreEvent = serde_json::from_slice(&json).unwrap();
        assert_eq!(decoded, event);
    }
}
