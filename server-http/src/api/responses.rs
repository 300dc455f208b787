use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use memproxy::endpoints::Outcome;
use serde::Serialize;
use tracing::warn;

#[derive(Serialize)]
pub struct HealthResponse {
    pub message: String,
}

// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Every failure, whatever its cause, is reported with the same status.
fn error_response(message: impl Into<String>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(message)),
    )
        .into_response()
}

/// Encodes an endpoint response: the error envelope if it carries an error,
/// otherwise the payload as JSON with 200.
pub struct Encoded<R>(pub R);

impl<R: Outcome + Serialize> IntoResponse for Encoded<R> {
    fn into_response(self) -> Response {
        match self.0.error() {
            Some(err) => error_response(err.to_string()),
            None => Json(self.0).into_response(),
        }
    }
}

/// A request that could not be turned into an operation.
#[derive(Debug)]
pub struct DecodeError(pub String);

impl DecodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl IntoResponse for DecodeError {
    fn into_response(self) -> Response {
        warn!("Rejected request: {}", self.0);
        error_response(self.0)
    }
}
