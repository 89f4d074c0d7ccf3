use thiserror::Error;

use crate::cache::CacheError;

/// Failure of a call to the store backend.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
  /// The backend answered with an error payload.
  #[error("store api error {code}: {message}")]
  Api { code: i64, message: String },

  /// The backend answered with a status we did not expect.
  #[error("store server error (status {status})")]
  Server { status: u16, body: String },

  /// The request never completed (connect failure, timeout).
  #[error("store request failed: {0}")]
  Transport(String),

  /// The response body did not decode to the expected shape.
  #[error("could not parse store response: {message}")]
  Parse { message: String, body: String },
}

impl ApiError {
  /// Raw response body, when one was received.
  pub fn body(&self) -> Option<&str> {
    match self {
      ApiError::Server { body, .. } | ApiError::Parse { body, .. } => Some(body),
      ApiError::Api { .. } | ApiError::Transport(_) => None,
    }
  }

  pub fn is_parse(&self) -> bool {
    matches!(self, ApiError::Parse { .. })
  }
}

/// Failure reported by the host integration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HostError {
  #[error("command rejected by host: {0}")]
  Rejected(String),

  #[error("host backlog is full")]
  Backlog,

  #[error("player {0} is not connected")]
  NotConnected(String),
}

#[derive(Debug, Error)]
pub enum SyncError {
  #[error(transparent)]
  Api(#[from] ApiError),

  #[error(transparent)]
  Cache(#[from] CacheError),

  #[error(transparent)]
  Host(#[from] HostError),

  #[error("cache entry '{0}' is missing")]
  MissingCacheEntry(&'static str),

  #[error("package '{0}' not found")]
  PackageNotFound(String),

  #[error("player {0} is not online")]
  PlayerOffline(String),

  /// User-facing error for internal faults that were sent to triage.
  #[error("an unexpected error occurred and has been reported automatically")]
  Reported(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Flattens an error and its sources into a printable trace.
pub fn error_trace(err: &(dyn std::error::Error + 'static)) -> String {
  let mut trace = err.to_string();
  let mut source = err.source();
  while let Some(cause) = source {
    trace.push_str("\ncaused by: ");
    trace.push_str(&cause.to_string());
    source = cause.source();
  }
  trace
}
