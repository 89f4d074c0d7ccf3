use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;
use storesync_core::{ApiError, HostError, SyncError};

use crate::presence::PresenceError;

/// API error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
  pub error: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details: Option<String>,
}

impl ErrorResponse {
  pub fn new(error: impl Into<String>) -> Self {
    Self {
      error: error.into(),
      details: None,
    }
  }

  pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
    Self {
      error: error.into(),
      details: Some(details.into()),
    }
  }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
  SyncError(SyncError),
  ValidationError(String),
  Unauthorized,
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    match self {
      AppError::SyncError(sync_err) => {
        let (status, response) = match &sync_err {
          SyncError::PackageNotFound(token) => (
            StatusCode::NOT_FOUND,
            ErrorResponse::with_details("Package not found", token.clone()),
          ),
          SyncError::PlayerOffline(player) => (
            StatusCode::NOT_FOUND,
            ErrorResponse::with_details("Player is not online", player.clone()),
          ),
          SyncError::Api(ApiError::Api { message, .. }) => {
            tracing::warn!(?sync_err, "Store rejected request");
            (
              StatusCode::BAD_GATEWAY,
              ErrorResponse::with_details("Store rejected the request", message.clone()),
            )
          }
          SyncError::Api(_) => {
            tracing::error!(?sync_err, "Store backend error");
            (
              StatusCode::BAD_GATEWAY,
              ErrorResponse::new("Store backend is unavailable. Please try again later."),
            )
          }
          SyncError::Host(HostError::Backlog) => (
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorResponse::new("Command outbox is full"),
          ),
          SyncError::Reported(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::new(sync_err.to_string()),
          ),
          SyncError::Host(_) | SyncError::Cache(_) | SyncError::MissingCacheEntry(_) => {
            // Don't expose internal state
            tracing::error!(?sync_err, "Internal error");
            (
              StatusCode::INTERNAL_SERVER_ERROR,
              ErrorResponse::new("An internal error occurred. Please try again later."),
            )
          }
        };

        (status, Json(response)).into_response()
      }
      AppError::ValidationError(msg) => {
        tracing::warn!(validation_error = %msg, "Validation failed");
        let error_response = ErrorResponse::with_details("Invalid request", msg);
        (StatusCode::BAD_REQUEST, Json(error_response)).into_response()
      }
      AppError::Unauthorized => {
        let error_response = ErrorResponse::new("Invalid bridge token");
        (StatusCode::UNAUTHORIZED, Json(error_response)).into_response()
      }
    }
  }
}

impl From<SyncError> for AppError {
  fn from(err: SyncError) -> Self {
    AppError::SyncError(err)
  }
}

impl From<crate::validation::ValidationError> for AppError {
  fn from(err: crate::validation::ValidationError) -> Self {
    AppError::ValidationError(err.to_string())
  }
}

impl From<PresenceError> for AppError {
  fn from(err: PresenceError) -> Self {
    AppError::ValidationError(err.to_string())
  }
}
