use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use wopi_lock::{ConflictReason, LockError};
use wopi_store::StoreError;
use wopi_types::{LockToken, TypeError};

use crate::headers::{X_WOPI_LOCK, X_WOPI_LOCK_FAILURE_REASON};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid or missing access token")]
    Unauthorized,

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("lock conflict: {reason}")]
    Conflict {
        current: Option<LockToken>,
        reason: ConflictReason,
    },

    #[error("unsupported X-WOPI-Override: {0:?}")]
    UnknownOverride(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl From<LockError> for ServerError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Validation(msg) => Self::Validation(msg),
            LockError::NotFound(id) => Self::NotFound(id.to_string()),
            LockError::Conflict {
                current, reason, ..
            } => Self::Conflict { current, reason },
            LockError::Store(e) => Self::Internal(e.to_string()),
            LockError::Poisoned(msg) => Self::Internal(msg),
        }
    }
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<TypeError> for ServerError {
    fn from(err: TypeError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::UnknownOverride(_) => StatusCode::BAD_REQUEST,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Conflict { current, reason } => {
                let mut headers = HeaderMap::new();
                let lock = current.as_ref().map(LockToken::as_str).unwrap_or("");
                headers.insert(
                    X_WOPI_LOCK,
                    HeaderValue::from_bytes(lock.as_bytes()).unwrap_or(HeaderValue::from_static("")),
                );
                headers.insert(
                    X_WOPI_LOCK_FAILURE_REASON,
                    HeaderValue::from_static(reason.as_str()),
                );
                (status, headers).into_response()
            }
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                (status, Json(json!({ "error": "internal server error" }))).into_response()
            }
            other => (status, Json(json!({ "error": other.to_string() }))).into_response(),
        }
    }
}
