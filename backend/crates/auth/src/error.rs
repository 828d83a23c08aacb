//! Auth Error Types
//!
//! Auth-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use realm::RealmError;
use thiserror::Error;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User not found")]
    UserNotFound,

    #[error("A user with this email already exists")]
    EmailTaken,

    /// Wrong email or password
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Too many failed attempts
    #[error("Account is temporarily locked")]
    AccountLocked,

    #[error("Account is disabled")]
    AccountDisabled,

    /// Missing, forged or expired session cookie
    #[error("Session not found or expired")]
    SessionInvalid,

    /// Session may only reach two-factor enrollment
    #[error("Two-factor authentication must be set up before continuing")]
    MfaEnrollmentRequired,

    /// A realm of the user requires two-factor authentication
    #[error("Two-factor authentication is required by one of your realms")]
    MfaRequiredByRealm,

    #[error("Invalid two-factor authentication code")]
    InvalidTotpCode,

    #[error("Two-factor authentication is not set up")]
    TotpNotSetup,

    #[error("Two-factor authentication is already enabled")]
    TotpAlreadyEnabled,

    #[error("Password does not meet requirements: {0}")]
    PasswordPolicy(String),

    #[error("Reset link is invalid or has expired")]
    InvalidResetToken,

    #[error("You are not a member of this realm")]
    NotAMember,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Realm(#[from] RealmError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::UserNotFound => ErrorKind::NotFound,
            AuthError::EmailTaken | AuthError::TotpAlreadyEnabled => ErrorKind::Conflict,
            AuthError::InvalidCredentials
            | AuthError::SessionInvalid
            | AuthError::InvalidTotpCode => ErrorKind::Unauthorized,
            AuthError::AccountLocked => ErrorKind::Locked,
            AuthError::AccountDisabled
            | AuthError::MfaEnrollmentRequired
            | AuthError::MfaRequiredByRealm
            | AuthError::NotAMember => ErrorKind::Forbidden,
            AuthError::TotpNotSetup => ErrorKind::PreconditionFailed,
            AuthError::PasswordPolicy(_)
            | AuthError::InvalidResetToken
            | AuthError::Validation(_) => ErrorKind::BadRequest,
            AuthError::Realm(e) => e.kind(),
            AuthError::Database(_) | AuthError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    pub fn to_app_error(&self) -> AppError {
        match self {
            AuthError::Realm(e) => e.to_app_error(),
            AuthError::Database(_) | AuthError::Internal(_) => {
                AppError::new(self.kind(), "Internal server error")
            }
            AuthError::AccountLocked => AppError::new(self.kind(), self.to_string())
                .with_action("Try again in 15 minutes or reset your password"),
            AuthError::MfaEnrollmentRequired => AppError::new(self.kind(), self.to_string())
                .with_action("Set up an authenticator app"),
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    pub fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::Realm(e) => e.log(),
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid sign-in attempt");
            }
            AuthError::AccountLocked => {
                tracing::warn!("Sign-in attempt on locked account");
            }
            AuthError::InvalidTotpCode => {
                tracing::warn!("Invalid two-factor code");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for AuthError {
    fn from(err: AppError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<platform::password::PasswordPolicyError> for AuthError {
    fn from(err: platform::password::PasswordPolicyError) -> Self {
        match err {
            platform::password::PasswordPolicyError::Requirements(unmet) => {
                AuthError::PasswordPolicy(unmet.join(", "))
            }
            other => AuthError::PasswordPolicy(other.to_string()),
        }
    }
}

impl From<platform::password::PasswordHashError> for AuthError {
    fn from(err: platform::password::PasswordHashError) -> Self {
        AuthError::Internal(err.to_string())
    }
}
