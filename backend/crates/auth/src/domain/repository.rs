//! Repository Traits
//!
//! Interfaces for data persistence. Implementation is in the infrastructure
//! layer. Method names are unique across traits so one store implements all
//! of them.

use chrono::{DateTime, Utc};
use kernel::id::UserId;
use uuid::Uuid;

use crate::domain::entity::{AuthSession, Credential, PasswordResetToken, User};
use crate::domain::value_object::Email;
use crate::error::AuthResult;

#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Insert a user; a taken email is `EmailTaken`
    async fn create_user(&self, user: &User) -> AuthResult<()>;

    async fn find_user(&self, user_id: &UserId) -> AuthResult<Option<User>>;

    async fn find_user_by_email(&self, email: &Email) -> AuthResult<Option<User>>;

    /// Users with the given ids, missing ids skipped
    async fn find_users(&self, user_ids: &[UserId]) -> AuthResult<Vec<User>>;

    /// Ordered by email
    async fn list_users(&self) -> AuthResult<Vec<User>>;

    async fn update_user(&self, user: &User) -> AuthResult<()>;

    async fn count_users(&self) -> AuthResult<u64>;
}

#[trait_variant::make(CredentialRepository: Send)]
pub trait LocalCredentialRepository {
    async fn create_credential(&self, credential: &Credential) -> AuthResult<()>;

    async fn find_credential(&self, user_id: &UserId) -> AuthResult<Option<Credential>>;

    async fn update_credential(&self, credential: &Credential) -> AuthResult<()>;
}

#[trait_variant::make(SessionRepository: Send)]
pub trait LocalSessionRepository {
    async fn create_session(&self, session: &AuthSession) -> AuthResult<()>;

    /// Session with this id created by a client with this fingerprint
    async fn find_session(
        &self,
        session_id: Uuid,
        fingerprint_hash: &[u8],
    ) -> AuthResult<Option<AuthSession>>;

    /// No fingerprint check; for requests that already passed the session
    /// middleware
    async fn load_session(&self, session_id: Uuid) -> AuthResult<Option<AuthSession>>;

    /// Realm selection, MFA flag and expiry
    async fn update_session(&self, session: &AuthSession) -> AuthResult<()>;

    /// Only the activity columns, so it never races a realm switch
    async fn touch_session(
        &self,
        session_id: Uuid,
        last_activity_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()>;

    async fn delete_session(&self, session_id: Uuid) -> AuthResult<()>;

    /// Sign a user out everywhere, optionally keeping one session
    async fn delete_sessions_for_user(
        &self,
        user_id: &UserId,
        except: Option<Uuid>,
    ) -> AuthResult<u64>;

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> AuthResult<u64>;
}

#[trait_variant::make(PasswordResetRepository: Send)]
pub trait LocalPasswordResetRepository {
    async fn create_reset_token(&self, token: &PasswordResetToken) -> AuthResult<()>;

    async fn find_reset_token(&self, token_hash: &[u8]) -> AuthResult<Option<PasswordResetToken>>;

    /// Mark used if still unused and unexpired; false when someone got there
    /// first
    async fn consume_reset_token(&self, token_id: Uuid, now: DateTime<Utc>) -> AuthResult<bool>;

    /// Expired or used tokens
    async fn purge_reset_tokens(&self, now: DateTime<Utc>) -> AuthResult<u64>;
}

/// Everything the auth use cases need from one store
pub trait AuthStore:
    UserRepository
    + CredentialRepository
    + SessionRepository
    + PasswordResetRepository
    + Clone
    + Send
    + Sync
    + 'static
{
}

impl<T> AuthStore for T where
    T: UserRepository
        + CredentialRepository
        + SessionRepository
        + PasswordResetRepository
        + Clone
        + Send
        + Sync
        + 'static
{
}
