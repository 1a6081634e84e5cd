use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use binged_core::error::{ApiError, ErrorEnvelope};
use thiserror::Error;

/// Newtype wrapper so we can implement `IntoResponse` in this crate.
pub struct AppError(pub ApiError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let envelope = ErrorEnvelope::from(&self.0);
        (status, Json(envelope)).into_response()
    }
}

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        Self(e)
    }
}

/// Problems with the request path itself, before any catalog lookup.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RequestError {
    #[error("malformed config segment: {0}")]
    Config(String),
    #[error("malformed extra segment: {0}")]
    Extra(String),
    #[error("no resource at {0}")]
    Route(String),
}

impl From<RequestError> for AppError {
    fn from(e: RequestError) -> Self {
        let message = e.to_string();
        Self(match e {
            RequestError::Config(_) | RequestError::Extra(_) => ApiError::BadRequest(message),
            RequestError::Route(_) => ApiError::NotFound(message),
        })
    }
}
