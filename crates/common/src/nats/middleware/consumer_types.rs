use async_nats::HeaderMap;
use bytes::Bytes;

/// Request type for consuming a single NATS message through Tower.
///
/// Owns all the message data so it can be passed through middleware layers
/// without lifetime concerns.
#[derive(Debug, Clone)]
pub struct ConsumeRequest {
    /// The NATS subject the message was published to
    pub subject: String,
    /// The message payload
    pub payload: Bytes,
    /// Optional headers
    pub headers: Option<HeaderMap>,
}

impl ConsumeRequest {
    pub fn new(subject: String, payload: Bytes, headers: Option<HeaderMap>) -> Self {
        Self {
            subject,
            payload,
            headers,
        }
    }
}

/// Outcome of processing one message: acknowledge (advance past it) or
/// reject for redelivery (the stream position does not advance).
#[derive(Debug, Clone)]
pub enum ConsumeResponse {
    /// Message fully applied, or permanently unprocessable - advance past it
    Ack,
    /// Transient failure - leave the message for redelivery
    Nak(Option<String>),
}

impl ConsumeResponse {
    pub fn nak(reason: impl Into<String>) -> Self {
        Self::Nak(Some(reason.into()))
    }

    pub fn is_ack(&self) -> bool {
        matches!(self, Self::Ack)
    }

    pub fn is_nak(&self) -> bool {
        matches!(self, Self::Nak(_))
    }
}
