//! Verification Error Types
//!
//! Verification-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use realm::RealmError;
use thiserror::Error;

/// Verification-specific result type alias
pub type VerificationResult<T> = Result<T, VerificationError>;

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("Verification code not found")]
    CodeNotFound,

    /// Unknown code presented by a device
    #[error("Verification code is invalid")]
    CodeInvalid,

    #[error("Verification code has expired")]
    CodeExpired,

    #[error("Verification code has already been used")]
    CodeUsed,

    /// Expire on a code a device already redeemed
    #[error("Verification code has already been claimed")]
    CodeAlreadyClaimed,

    #[error("A verification code with this UUID already exists")]
    DuplicateUuid,

    /// The code's test type is outside what the device accepts
    #[error("Verification code test type is not accepted: {0}")]
    UnsupportedTestType(String),

    #[error("Verification token is invalid")]
    TokenInvalid,

    #[error("Verification token has expired")]
    TokenExpired,

    #[error("Verification token has already been used")]
    TokenUsed,

    #[error("API key is required")]
    MissingApiKey,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Realm(#[from] RealmError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VerificationError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            VerificationError::CodeNotFound => ErrorKind::NotFound,
            VerificationError::CodeInvalid
            | VerificationError::CodeExpired
            | VerificationError::CodeUsed
            | VerificationError::TokenInvalid
            | VerificationError::TokenExpired
            | VerificationError::TokenUsed
            | VerificationError::Validation(_) => ErrorKind::BadRequest,
            VerificationError::CodeAlreadyClaimed | VerificationError::DuplicateUuid => {
                ErrorKind::Conflict
            }
            VerificationError::UnsupportedTestType(_) => ErrorKind::PreconditionFailed,
            VerificationError::MissingApiKey => ErrorKind::Unauthorized,
            VerificationError::RateLimited => ErrorKind::TooManyRequests,
            VerificationError::Realm(e) => e.kind(),
            VerificationError::Database(_) | VerificationError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    pub fn to_app_error(&self) -> AppError {
        match self {
            VerificationError::Realm(e) => e.to_app_error(),
            VerificationError::Database(_) | VerificationError::Internal(_) => {
                AppError::new(self.kind(), "Internal server error")
            }
            VerificationError::MissingApiKey => AppError::new(self.kind(), self.to_string())
                .with_action("Send the key in the X-API-Key header"),
            VerificationError::RateLimited => AppError::new(self.kind(), self.to_string())
                .with_action("Retry after the time in X-RateLimit-Reset"),
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    pub fn log(&self) {
        match self {
            VerificationError::Database(e) => {
                tracing::error!(error = %e, "Verification database error");
            }
            VerificationError::Internal(msg) => {
                tracing::error!(message = %msg, "Verification internal error");
            }
            VerificationError::Realm(e) => e.log(),
            VerificationError::RateLimited => {
                tracing::warn!("API rate limit exceeded");
            }
            VerificationError::TokenInvalid => {
                tracing::warn!("Invalid verification token presented");
            }
            _ => {
                tracing::debug!(error = %self, "Verification error");
            }
        }
    }
}

impl IntoResponse for VerificationError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for VerificationError {
    fn from(err: AppError) -> Self {
        VerificationError::Internal(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for VerificationError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        VerificationError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for VerificationError {
    fn from(err: serde_json::Error) -> Self {
        VerificationError::Internal(err.to_string())
    }
}
