//! Service-level errors. The lesson engine itself never fails; these cover
//! lookups and validation around it.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppError {
  #[error("{0}")]
  NotFound(String),
  #[error("{0}")]
  Conflict(String),
  #[error("{0}")]
  Validation(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
  pub error: String,
  pub code: &'static str,
}

impl AppError {
  pub fn not_found(message: impl Into<String>) -> Self { AppError::NotFound(message.into()) }
  pub fn conflict(message: impl Into<String>) -> Self { AppError::Conflict(message.into()) }
  pub fn validation(message: impl Into<String>) -> Self { AppError::Validation(message.into()) }

  pub fn code(&self) -> &'static str {
    match self {
      AppError::NotFound(_) => "NOT_FOUND",
      AppError::Conflict(_) => "CONFLICT",
      AppError::Validation(_) => "VALIDATION_ERROR",
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
    }
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let body = ErrorResponse { error: self.to_string(), code: self.code() };
    (self.status(), Json(body)).into_response()
  }
}
