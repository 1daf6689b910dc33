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
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("advisor error: {0}")]
  Advisor(String),
}

impl ApiError {
  pub(crate) fn store<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
    Self::Store(Box::new(e))
  }
}

impl From<mdm_core::Error> for ApiError {
  fn from(e: mdm_core::Error) -> Self {
    use mdm_core::Error as Core;
    match e {
      Core::Forbidden(m) => Self::Forbidden(m),
      Core::MissingActorId | Core::MissingActorName => Self::Unauthorized(e.to_string()),
      Core::TerminalStatus(_) | Core::NotEditable(_) | Core::SequenceExhausted(_) => {
        Self::Conflict(e.to_string())
      }
      other => Self::BadRequest(other.to_string()),
    }
  }
}

impl From<mdm_engine::Error> for ApiError {
  fn from(e: mdm_engine::Error) -> Self {
    use mdm_engine::Error as Engine;
    match e {
      Engine::Core(core) => core.into(),
      Engine::NotFound(id) => Self::NotFound(format!("request {id} not found")),
      e @ Engine::IdCollision { .. } => Self::Conflict(e.to_string()),
      Engine::Store(inner) => Self::Store(inner),
      Engine::Advisory(inner) => Self::Advisor(inner.to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
      ApiError::Advisor(m) => (StatusCode::BAD_GATEWAY, m.clone()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
