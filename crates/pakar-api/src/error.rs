//! API error type and [`axum::response::IntoResponse`] implementation.

use std::time::Duration;

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use pakar_core::{engine::ConsultError, store::StoreError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("consultation did not finish within {0:?}")]
  Timeout(Duration),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a store failure by the domain error behind it, if any.
  pub fn from_store<E: StoreError>(err: E) -> Self {
    match err.domain() {
      Some(d) if d.is_not_found() => Self::NotFound(d.to_string()),
      Some(d) if d.is_conflict() => Self::Conflict(d.to_string()),
      Some(d) => Self::BadRequest(d.to_string()),
      None => Self::Store(Box::new(err)),
    }
  }

  pub fn from_consult<E: StoreError>(err: ConsultError<E>) -> Self {
    match err {
      ConsultError::InvalidInput(e) => Self::BadRequest(e.to_string()),
      ConsultError::SubjectNotFound(id) => {
        Self::NotFound(format!("subject {id} not found"))
      }
      ConsultError::Repository(e) => Self::from_store(e),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store fault");
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };
    let message = match &self {
      ApiError::NotFound(m) | ApiError::BadRequest(m) | ApiError::Conflict(m) => m.clone(),
      other => other.to_string(),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
