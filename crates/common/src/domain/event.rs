use crate::domain::result::{DomainError, DomainResult};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

/// Wire shape of an inbound stream message.
///
/// `data` stays an opaque JSON object end to end; consumers that need
/// specific fields interpret it themselves.
#[derive(Debug, Clone, Deserialize, garde::Validate)]
pub struct StreamEvent {
    #[garde(length(min = 1))]
    pub event_type: String,
    #[garde(skip)]
    pub timestamp: DateTime<Utc>,
    #[garde(skip)]
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl StreamEvent {
    /// Decode a raw stream payload. Malformed input is a permanent error;
    /// the pipeline drops the message instead of retrying.
    pub fn decode(payload: &[u8]) -> DomainResult<Self> {
        serde_json::from_slice(payload).map_err(|e| DomainError::DecodeError(e.to_string()))
    }
}

/// A decoded event that has not been persisted yet. The event identifier is
/// assigned by the repository at persistence time, so redelivery of the same
/// source message stores a distinct row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl From<StreamEvent> for NewEvent {
    fn from(event: StreamEvent) -> Self {
        NewEvent {
            event_type: event.event_type,
            timestamp: event.timestamp,
            data: event.data,
        }
    }
}

/// Domain entity for a stored event. Immutable once persisted, never deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_id: Uuid,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl Event {
    /// The UTC calendar day this event is aggregated under.
    pub fn day(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Repository trait for append-only event storage.
/// Infrastructure layer (ClickHouse) implements this trait.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Persist a single event, assigning it a time-ordered unique identifier.
    /// Must be durable before returning success.
    async fn put(&self, event: &NewEvent) -> DomainResult<Event>;

    /// Full predicate scan over stored events of one type. Unordered; O(n)
    /// accepted because this serves operational queries, not the hot path.
    async fn scan_by_type(&self, event_type: &str) -> DomainResult<Vec<Event>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_valid_message() {
        let payload =
            br#"{"event_type":"click","timestamp":"2024-01-01T10:00:00Z","data":{"page":"/home"}}"#;
        let event = StreamEvent::decode(payload).unwrap();

        assert_eq!(event.event_type, "click");
        assert_eq!(
            event.timestamp,
            "2024-01-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
        assert_eq!(event.data.get("page"), Some(&serde_json::json!("/home")));
    }

    #[test]
    fn test_decode_missing_data_defaults_to_empty_object() {
        let payload = br#"{"event_type":"click","timestamp":"2024-01-01T10:00:00Z"}"#;
        let event = StreamEvent::decode(payload).unwrap();
        assert!(event.data.is_empty());
    }

    #[test]
    fn test_decode_malformed_json() {
        let result = StreamEvent::decode(b"not json at all");
        assert!(matches!(result, Err(DomainError::DecodeError(_))));
    }

    #[test]
    fn test_decode_invalid_timestamp() {
        let payload = br#"{"event_type":"click","timestamp":"yesterday","data":{}}"#;
        let result = StreamEvent::decode(payload);
        assert!(matches!(result, Err(DomainError::DecodeError(_))));
    }

    #[test]
    fn test_decode_non_object_data() {
        let payload = br#"{"event_type":"click","timestamp":"2024-01-01T10:00:00Z","data":[1,2]}"#;
        let result = StreamEvent::decode(payload);
        assert!(matches!(result, Err(DomainError::DecodeError(_))));
    }

    #[test]
    fn test_day_truncates_to_utc_midnight() {
        let event = Event {
            event_id: Uuid::now_v7(),
            event_type: "click".to_string(),
            timestamp: "2024-01-01T23:59:59Z".parse().unwrap(),
            data: serde_json::Map::new(),
        };
        assert_eq!(event.day(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }
}
