use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::domain::DomainError;
use serde_json::json;
use tracing::error;

/// Error wrapper mapping domain failures onto HTTP statuses:
/// client input errors become 400, store failures become 503.
#[derive(Debug)]
pub struct ApiError(DomainError);

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError(DomainError::BadRequest(message.into()))
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DomainError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::SERVICE_UNAVAILABLE,
        };

        if status.is_server_error() {
            error!(error = %self.0, "query failed");
        }

        let message = match self.0 {
            DomainError::BadRequest(message) => message,
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
