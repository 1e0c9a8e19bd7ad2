//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use census_core::ErrorKind;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] census_core::Error),

  /// The request could not be decoded before reaching the store.
  #[error("bad request: {message}")]
  BadRequest {
    reason:  &'static str,
    message: String,
  },

  /// The body exceeded [`crate::MAX_BODY_BYTES`].
  #[error("payload too large: {0}")]
  PayloadTooLarge(String),
}

impl ApiError {
  /// Lift a backend error into its core classification.
  pub fn store<E: Into<census_core::Error>>(err: E) -> Self {
    Self::Core(err.into())
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
      return Self::PayloadTooLarge(rejection.body_text());
    }
    Self::BadRequest {
      reason:  "malformed_body",
      message: rejection.body_text(),
    }
  }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self {
    Self::BadRequest {
      reason:  "malformed_path",
      message: rejection.body_text(),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, reason, message) = match &self {
      ApiError::BadRequest { reason, message } => {
        (StatusCode::BAD_REQUEST, *reason, message.clone())
      }
      ApiError::PayloadTooLarge(message) => {
        (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", message.clone())
      }
      ApiError::Core(e) => match e.kind() {
        ErrorKind::Invalid => (StatusCode::BAD_REQUEST, e.reason(), e.to_string()),
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, e.reason(), e.to_string()),
        ErrorKind::Conflict => {
          tracing::warn!(error = %e, "write conflict surfaced to client");
          (StatusCode::SERVICE_UNAVAILABLE, e.reason(), e.to_string())
        }
        ErrorKind::Internal => {
          tracing::error!(error = ?e, "store failure");
          (
            StatusCode::INTERNAL_SERVER_ERROR,
            e.reason(),
            "internal server error".to_owned(),
          )
        }
      },
    };
    (status, Json(json!({ "error": message, "reason": reason }))).into_response()
  }
}
