use std::time::Duration;
use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("failed to decode event payload: {0}")]
    DecodeError(String),

    #[error("invalid event: {0}")]
    ValidationError(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] anyhow::Error),

    #[error("store call timed out after {0:?}")]
    StoreTimeout(Duration),

    #[error("storage schema missing: {0}")]
    SchemaMissing(String),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl DomainError {
    /// Transient store failures are worth retrying; everything else is not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DomainError::StoreUnavailable(_) | DomainError::StoreTimeout(_)
        )
    }

    /// Permanent input failures: the message itself is bad, retrying or
    /// redelivering cannot fix it.
    pub fn is_permanent_input(&self) -> bool {
        matches!(
            self,
            DomainError::DecodeError(_) | DomainError::ValidationError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(DomainError::StoreUnavailable(anyhow::anyhow!("down")).is_transient());
        assert!(DomainError::StoreTimeout(Duration::from_secs(10)).is_transient());
        assert!(!DomainError::DecodeError("bad json".to_string()).is_transient());
        assert!(!DomainError::SchemaMissing("events".to_string()).is_transient());
        assert!(!DomainError::BadRequest("type required".to_string()).is_transient());
    }

    #[test]
    fn test_permanent_input_errors() {
        assert!(DomainError::DecodeError("bad json".to_string()).is_permanent_input());
        assert!(DomainError::ValidationError("empty type".to_string()).is_permanent_input());
        assert!(!DomainError::StoreUnavailable(anyhow::anyhow!("down")).is_permanent_input());
    }
}
