//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<herald_core::Error> for ApiError {
  fn from(e: herald_core::Error) -> Self {
    use herald_core::Error as E;
    match e {
      E::SubscriberNotFound(_)
      | E::HappeningNotFound(_)
      | E::RegistrationNotFound(_)
      | E::ReminderNotFound(_)
      | E::NoSuchRegistration { .. } => ApiError::NotFound(e.to_string()),
      E::AlreadyCancelled(_) | E::AlreadyCancelledHappening(_) => {
        ApiError::Conflict(e.to_string())
      }
      E::Storage(_) => ApiError::Store(Box::new(e)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
