//! Realm Error Types
//!
//! Realm-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

pub type RealmResult<T> = Result<T, RealmError>;

#[derive(Debug, Error)]
pub enum RealmError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    /// The actor lacks a realm permission
    #[error("Missing permission: {0}")]
    PermissionDenied(String),

    #[error("System administrator privileges required")]
    SystemAdminRequired,

    #[error("No realm selected")]
    NoRealmSelected,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("API key is disabled")]
    ApiKeyDisabled,

    #[error("API key type is not allowed here")]
    WrongApiKeyType,

    #[error("{0} is not configured")]
    ProviderNotConfigured(&'static str),

    #[error("Provider error: {0}")]
    Provider(#[from] platform::notify::NotifyError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RealmError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RealmError::NotFound(_) => ErrorKind::NotFound,
            RealmError::Validation(_) => ErrorKind::BadRequest,
            RealmError::Conflict(_) => ErrorKind::Conflict,
            RealmError::PermissionDenied(_)
            | RealmError::SystemAdminRequired
            | RealmError::NoRealmSelected
            | RealmError::ApiKeyDisabled
            | RealmError::WrongApiKeyType => ErrorKind::Forbidden,
            RealmError::InvalidApiKey => ErrorKind::Unauthorized,
            RealmError::ProviderNotConfigured(_) => ErrorKind::PreconditionFailed,
            RealmError::Provider(_) => ErrorKind::BadGateway,
            RealmError::Database(_) | RealmError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    pub fn to_app_error(&self) -> AppError {
        let err = AppError::new(self.kind(), self.public_message());
        match self {
            RealmError::NoRealmSelected => err.with_action("Select a realm first"),
            _ => err,
        }
    }

    /// Database and internal details stay in the logs
    fn public_message(&self) -> String {
        match self {
            RealmError::Database(_) | RealmError::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn log(&self) {
        match self {
            RealmError::Database(e) => {
                tracing::error!(error = %e, "Realm database error");
            }
            RealmError::Internal(msg) => {
                tracing::error!(message = %msg, "Realm internal error");
            }
            RealmError::Provider(e) => {
                tracing::warn!(error = %e, "Provider delivery failed");
            }
            RealmError::InvalidApiKey | RealmError::ApiKeyDisabled => {
                tracing::warn!(error = %self, "Rejected API key");
            }
            _ => {
                tracing::debug!(error = %self, "Realm error");
            }
        }
    }

    /// Map a unique violation to a conflict with the given message
    pub fn conflict_on_unique(err: sqlx::Error, message: &str) -> Self {
        if kernel::error::conversions::is_unique_violation(&err) {
            RealmError::Conflict(message.to_string())
        } else {
            RealmError::Database(err)
        }
    }
}

impl IntoResponse for RealmError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for RealmError {
    fn from(err: AppError) -> Self {
        RealmError::Internal(err.to_string())
    }
}
