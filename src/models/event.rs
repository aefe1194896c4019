use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of a lifecycle event.
///
/// Unrecognized values decode into [`EventType::Other`] and re-encode
/// unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// The product was made.
    Manufactured,
    /// The product left a facility.
    Shipped,
    /// The product arrived at a facility.
    Received,
    /// The product was sold to an end customer.
    Sold,
    /// The product was repaired.
    Repaired,
    /// The product was recycled.
    Recycled,
    /// Any other event type reported by the backend.
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Manufactured => "manufactured",
            Self::Shipped => "shipped",
            Self::Received => "received",
            Self::Sold => "sold",
            Self::Repaired => "repaired",
            Self::Recycled => "recycled",
            Self::Other(other) => other,
        })
    }
}

/// A value in an event's free-form detail map.
///
/// Decoding tries each variant in declaration order, so JSON integers
/// become [`DetailValue::Integer`] and numbers with a fraction or exponent
/// become [`DetailValue::Float`]. `null` and arrays are rejected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetailValue {
    /// `true` or `false`.
    Boolean(bool),
    /// A whole number.
    Integer(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    String(String),
    /// A nested map.
    Map(BTreeMap<String, DetailValue>),
}

impl From<bool> for DetailValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for DetailValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for DetailValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for DetailValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for DetailValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<BTreeMap<String, DetailValue>> for DetailValue {
    fn from(value: BTreeMap<String, DetailValue>) -> Self {
        Self::Map(value)
    }
}

/// A recorded lifecycle event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
    /// Backend identifier.
    pub id: String,
    /// The product the event belongs to.
    pub product_id: String,
    /// Event kind.
    pub event_type: EventType,
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
    /// Where the event happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Who recorded the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// Free-form details.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, DetailValue>,
}

/// Payload for submitting a lifecycle event.
///
/// # Example
///
/// ```rust
/// use tracechain::models::{EventType, NewLifecycleEvent};
///
/// let event = NewLifecycleEvent::new(EventType::Shipped)
///     .with_location("Rotterdam")
///     .with_detail("containerId", "MSCU1234567")
///     .with_detail("temperatureC", 4.5);
/// assert_eq!(event.details.len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLifecycleEvent {
    /// Event kind.
    pub event_type: EventType,
    /// When the event happened; the backend uses its own clock when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Where the event happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Who recorded the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// Free-form details.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, DetailValue>,
}

impl NewLifecycleEvent {
    /// Creates a payload of the given kind.
    #[must_use]
    pub const fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            timestamp: None,
            location: None,
            actor: None,
            details: BTreeMap::new(),
        }
    }

    /// Sets the event time.
    #[must_use]
    pub const fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the location.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the actor.
    #[must_use]
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Adds a detail entry.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<DetailValue>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_type_known_and_other() {
        assert_eq!(
            serde_json::from_value::<EventType>(json!("shipped")).unwrap(),
            EventType::Shipped
        );
        let other: EventType = serde_json::from_value(json!("customs_cleared")).unwrap();
        assert_eq!(other, EventType::Other("customs_cleared".to_string()));
        assert_eq!(serde_json::to_value(&other).unwrap(), json!("customs_cleared"));
    }

    #[test]
    fn test_detail_value_variant_selection() {
        let details: BTreeMap<String, DetailValue> = serde_json::from_value(json!({
            "count": 3,
            "ratio": 0.25,
            "whole": 2.0,
            "label": "pallet",
            "fragile": true,
            "nested": {"depth": 1}
        }))
        .unwrap();

        assert_eq!(details["count"], DetailValue::Integer(3));
        assert_eq!(details["ratio"], DetailValue::Float(0.25));
        assert_eq!(details["whole"], DetailValue::Float(2.0));
        assert_eq!(details["label"], DetailValue::from("pallet"));
        assert_eq!(details["fragile"], DetailValue::Boolean(true));
        assert!(matches!(details["nested"], DetailValue::Map(_)));
    }

    #[test]
    fn test_detail_value_rejects_null_and_arrays() {
        assert!(serde_json::from_value::<DetailValue>(json!(null)).is_err());
        assert!(serde_json::from_value::<DetailValue>(json!([1, 2])).is_err());
    }

    #[test]
    fn test_new_event_serializes_compactly() {
        let value = serde_json::to_value(NewLifecycleEvent::new(EventType::Sold)).unwrap();
        assert_eq!(value, json!({"eventType": "sold"}));
    }
}
