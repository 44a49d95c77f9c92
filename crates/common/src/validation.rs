//! Validation utilities bridging garde reports into the domain error type.

use crate::domain::DomainError;
use garde::{Report, Validate};

/// Validate a struct, converting the garde report to a `DomainError`.
///
/// Validation failure of an inbound event is a permanent input error, so it
/// maps to `ValidationError` (drop the message, never retry).
pub fn validate_struct<T>(value: &T) -> Result<(), DomainError>
where
    T: Validate,
    T::Context: Default,
{
    value
        .validate()
        .map_err(|report| DomainError::ValidationError(format_validation_errors(&report)))
}

/// Format validation errors from a garde Report into a human-readable string
fn format_validation_errors(report: &Report) -> String {
    report
        .iter()
        .map(|(path, error)| {
            if path.to_string().is_empty() {
                error.message().to_string()
            } else {
                format!("{}: {}", path, error.message())
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StreamEvent;

    #[test]
    fn test_validate_event_success() {
        let event = StreamEvent {
            event_type: "page_view".to_string(),
            timestamp: chrono::Utc::now(),
            data: serde_json::Map::new(),
        };
        assert!(validate_struct(&event).is_ok());
    }

    #[test]
    fn test_validate_empty_event_type() {
        let event = StreamEvent {
            event_type: "".to_string(),
            timestamp: chrono::Utc::now(),
            data: serde_json::Map::new(),
        };
        let result = validate_struct(&event);
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[test]
    fn test_validation_error_names_the_field() {
        let event = StreamEvent {
            event_type: "".to_string(),
            timestamp: chrono::Utc::now(),
            data: serde_json::Map::new(),
        };
        if let Err(DomainError::ValidationError(msg)) = validate_struct(&event) {
            assert!(msg.contains("event_type"));
        } else {
            panic!("Expected ValidationError");
        }
    }
}
