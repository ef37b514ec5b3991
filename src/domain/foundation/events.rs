//! Event envelope shared across the exchange.
//!
//! Every message on the bus carries the same JSON shape:
//! `{action, type, id, timestamp, data, metadata}`. The routing key is
//! transport-level (the channel the message travels on) and is not part
//! of the serialized body.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use super::Timestamp;

/// Free-form metadata attached to an event (customer email, refund
/// amounts, gateway hints). Consumers must validate fields defensively.
pub type EventMetadata = HashMap<String, JsonValue>;

/// Transport wrapper for domain events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// What happened, e.g. `create`, `payment.completed`.
    pub action: String,

    /// Kind of entity the event is about.
    #[serde(rename = "type")]
    pub entity_type: String,

    /// Identifier of the entity the event is about.
    pub id: String,

    /// When the event was emitted.
    pub timestamp: Timestamp,

    /// Entity snapshot or event-specific fields.
    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub data: JsonValue,

    /// Heterogeneous extras; never trusted without validation.
    #[serde(default, skip_serializing_if = "EventMetadata::is_empty")]
    pub metadata: EventMetadata,

    /// Explicit routing key override; `None` means `<type>.<action>`.
    #[serde(skip)]
    routing_key: Option<String>,
}

impl EventEnvelope {
    pub fn new(
        action: impl Into<String>,
        entity_type: impl Into<String>,
        id: impl Into<String>,
        data: JsonValue,
    ) -> Self {
        Self {
            action: action.into(),
            entity_type: entity_type.into(),
            id: id.into(),
            timestamp: Timestamp::now(),
            data,
            metadata: EventMetadata::new(),
            routing_key: None,
        }
    }

    /// Overrides the derived routing key. Payment events use this to
    /// append the paid entity's type (`payment.completed.subscription`).
    pub fn with_routing_key(mut self, key: impl Into<String>) -> Self {
        self.routing_key = Some(key.into());
        self
    }

    pub fn with_metadata(mut self, metadata: EventMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// The key the broker routes this message on.
    pub fn routing_key(&self) -> String {
        self.routing_key
            .clone()
            .unwrap_or_else(|| format!("{}.{}", self.entity_type, self.action))
    }

    /// Deserializes `data` into a typed payload.
    pub fn data_as<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_routing_key_is_type_dot_action() {
        let event = EventEnvelope::new("create", "activity", "3", json!({"titulo": "yoga"}));
        assert_eq!(event.routing_key(), "activity.create");
    }

    #[test]
    fn explicit_routing_key_wins() {
        let event = EventEnvelope::new("payment.completed", "payment", "p-1", json!({}))
            .with_routing_key("payment.completed.subscription");
        assert_eq!(event.routing_key(), "payment.completed.subscription");
    }

    #[test]
    fn wire_body_uses_type_field() {
        let event = EventEnvelope::new("delete", "subscription", "s-1", json!({"user_id": 4}));
        let body = serde_json::to_value(&event).unwrap();
        assert_eq!(body["type"], "subscription");
        assert_eq!(body["action"], "delete");
        assert_eq!(body["id"], "s-1");
        assert_eq!(body["data"]["user_id"], 4);
    }

    #[test]
    fn round_trip_preserves_payload() {
        let mut meta = EventMetadata::new();
        meta.insert("refund_amount".into(), json!(500.0));
        let event = EventEnvelope::new("payment.refunded", "payment", "p-2", json!({"amount": 500.0}))
            .with_metadata(meta);

        let body = serde_json::to_string(&event).unwrap();
        let back: EventEnvelope = serde_json::from_str(&body).unwrap();
        assert_eq!(back.action, "payment.refunded");
        assert_eq!(back.metadata.get("refund_amount"), Some(&json!(500.0)));
        // Routing key override is transport-level and does not survive the body.
        assert_eq!(back.routing_key(), "payment.payment.refunded");
    }

    #[test]
    fn data_as_deserializes_typed_payload() {
        #[derive(Deserialize)]
        struct Payload {
            user_id: i64,
        }

        let event = EventEnvelope::new("delete", "subscription", "s-9", json!({"user_id": 11}));
        let payload: Payload = event.data_as().unwrap();
        assert_eq!(payload.user_id, 11);
    }
}
