//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use kernel::error::conversions::is_unique_violation;
use kernel::id::{RealmId, UserId};
use platform::password::HashedPassword;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{AuthSession, Credential, PasswordResetToken, User};
use crate::domain::repository::{
    CredentialRepository, PasswordResetRepository, SessionRepository, UserRepository,
};
use crate::domain::value_object::{Email, TotpSecret, UserStatus};
use crate::error::{AuthError, AuthResult};

/// PostgreSQL-backed auth repository
#[derive(Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "user_id, email, name, system_admin, user_status, last_login_at, created_at, updated_at";

const SESSION_COLUMNS: &str = r#"
    session_id, user_id, fingerprint_hash, ip_address, user_agent, realm_id,
    mfa_pending, remember_me, expires_at, last_activity_at, created_at
"#;

// ============================================================================
// User Repository Implementation
// ============================================================================

impl UserRepository for PgAuthRepository {
    async fn create_user(&self, user: &User) -> AuthResult<()> {
        let sql = format!("INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)");
        sqlx::query(&sql)
            .bind(user.id.as_uuid())
            .bind(user.email.as_str())
            .bind(&user.name)
            .bind(user.system_admin)
            .bind(user.status.id())
            .bind(user.last_login_at)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AuthError::EmailTaken
                } else {
                    AuthError::Database(e)
                }
            })?;
        Ok(())
    }

    async fn find_user(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(UserRow::into_user))
    }

    async fn find_user_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(UserRow::into_user))
    }

    async fn find_users(&self, user_ids: &[UserId]) -> AuthResult<Vec<User>> {
        let ids: Vec<Uuid> = user_ids.iter().map(|id| *id.as_uuid()).collect();
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ANY($1) ORDER BY email");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(UserRow::into_user).collect())
    }

    async fn list_users(&self) -> AuthResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY email");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(UserRow::into_user).collect())
    }

    async fn update_user(&self, user: &User) -> AuthResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                name = $2, system_admin = $3, user_status = $4,
                last_login_at = $5, updated_at = $6
            WHERE user_id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(user.system_admin)
        .bind(user.status.id())
        .bind(user.last_login_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    async fn count_users(&self) -> AuthResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}

// ============================================================================
// Credential Repository Implementation
// ============================================================================

impl CredentialRepository for PgAuthRepository {
    async fn create_credential(&self, credential: &Credential) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_credentials (
                user_id, password_hash, password_changed_at, totp_secret,
                totp_enabled, failed_attempts, locked_until, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(credential.user_id.as_uuid())
        .bind(credential.password_hash.as_phc_string())
        .bind(credential.password_changed_at)
        .bind(credential.totp_secret.as_ref().map(TotpSecret::as_base32))
        .bind(credential.totp_enabled)
        .bind(credential.failed_attempts as i32)
        .bind(credential.locked_until)
        .bind(credential.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_credential(&self, user_id: &UserId) -> AuthResult<Option<Credential>> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT
                user_id, password_hash, password_changed_at, totp_secret,
                totp_enabled, failed_attempts, locked_until, updated_at
            FROM auth_credentials
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(CredentialRow::into_credential).transpose()
    }

    async fn update_credential(&self, credential: &Credential) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE auth_credentials SET
                password_hash = $2, password_changed_at = $3, totp_secret = $4,
                totp_enabled = $5, failed_attempts = $6, locked_until = $7, updated_at = $8
            WHERE user_id = $1
            "#,
        )
        .bind(credential.user_id.as_uuid())
        .bind(credential.password_hash.as_phc_string())
        .bind(credential.password_changed_at)
        .bind(credential.totp_secret.as_ref().map(TotpSecret::as_base32))
        .bind(credential.totp_enabled)
        .bind(credential.failed_attempts as i32)
        .bind(credential.locked_until)
        .bind(credential.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// ============================================================================
// Session Repository Implementation
// ============================================================================

impl SessionRepository for PgAuthRepository {
    async fn create_session(&self, session: &AuthSession) -> AuthResult<()> {
        let sql = format!(
            "INSERT INTO auth_sessions ({SESSION_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        );
        sqlx::query(&sql)
            .bind(session.session_id)
            .bind(session.user_id.as_uuid())
            .bind(&session.fingerprint_hash)
            .bind(&session.ip_address)
            .bind(&session.user_agent)
            .bind(session.realm_id.map(|id| *id.as_uuid()))
            .bind(session.mfa_pending)
            .bind(session.remember_me)
            .bind(session.expires_at)
            .bind(session.last_activity_at)
            .bind(session.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_session(
        &self,
        session_id: Uuid,
        fingerprint_hash: &[u8],
    ) -> AuthResult<Option<AuthSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM auth_sessions WHERE session_id = $1 AND fingerprint_hash = $2"
        );
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(session_id)
            .bind(fingerprint_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(SessionRow::into_session))
    }

    async fn load_session(&self, session_id: Uuid) -> AuthResult<Option<AuthSession>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM auth_sessions WHERE session_id = $1");
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(SessionRow::into_session))
    }

    async fn update_session(&self, session: &AuthSession) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE auth_sessions SET
                realm_id = $2, mfa_pending = $3, expires_at = $4, last_activity_at = $5
            WHERE session_id = $1
            "#,
        )
        .bind(session.session_id)
        .bind(session.realm_id.map(|id| *id.as_uuid()))
        .bind(session.mfa_pending)
        .bind(session.expires_at)
        .bind(session.last_activity_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn touch_session(
        &self,
        session_id: Uuid,
        last_activity_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        sqlx::query(
            "UPDATE auth_sessions SET last_activity_at = $2, expires_at = $3 WHERE session_id = $1",
        )
        .bind(session_id)
        .bind(last_activity_at)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_session(&self, session_id: Uuid) -> AuthResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_sessions_for_user(
        &self,
        user_id: &UserId,
        except: Option<Uuid>,
    ) -> AuthResult<u64> {
        let deleted = sqlx::query(
            "DELETE FROM auth_sessions WHERE user_id = $1 AND ($2::uuid IS NULL OR session_id <> $2)",
        )
        .bind(user_id.as_uuid())
        .bind(except)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(deleted)
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let deleted = sqlx::query("DELETE FROM auth_sessions WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::info!(sessions_deleted = deleted, "Cleaned up expired auth sessions");
        Ok(deleted)
    }
}

// ============================================================================
// Password Reset Repository Implementation
// ============================================================================

impl PasswordResetRepository for PgAuthRepository {
    async fn create_reset_token(&self, token: &PasswordResetToken) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (
                token_id, user_id, token_hash, expires_at, used_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(token.token_id)
        .bind(token.user_id.as_uuid())
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .bind(token.used_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_reset_token(&self, token_hash: &[u8]) -> AuthResult<Option<PasswordResetToken>> {
        let row = sqlx::query_as::<_, ResetTokenRow>(
            r#"
            SELECT token_id, user_id, token_hash, expires_at, used_at, created_at
            FROM password_reset_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ResetTokenRow::into_token))
    }

    async fn consume_reset_token(&self, token_id: Uuid, now: DateTime<Utc>) -> AuthResult<bool> {
        let consumed = sqlx::query(
            r#"
            UPDATE password_reset_tokens SET used_at = $2
            WHERE token_id = $1 AND used_at IS NULL AND expires_at > $2
            "#,
        )
        .bind(token_id)
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(consumed == 1)
    }

    async fn purge_reset_tokens(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let deleted = sqlx::query(
            "DELETE FROM password_reset_tokens WHERE used_at IS NOT NULL OR expires_at < $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(deleted)
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: Uuid,
    email: String,
    name: String,
    system_admin: bool,
    user_status: i16,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: UserId::from_uuid(self.user_id),
            email: Email::from_db(self.email),
            name: self.name,
            system_admin: self.system_admin,
            status: UserStatus::from_id(self.user_status),
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    user_id: Uuid,
    password_hash: String,
    password_changed_at: DateTime<Utc>,
    totp_secret: Option<String>,
    totp_enabled: bool,
    failed_attempts: i32,
    locked_until: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl CredentialRow {
    fn into_credential(self) -> AuthResult<Credential> {
        Ok(Credential {
            user_id: UserId::from_uuid(self.user_id),
            password_hash: HashedPassword::from_phc_string(self.password_hash)?,
            password_changed_at: self.password_changed_at,
            totp_secret: self.totp_secret.map(TotpSecret::from_base32).transpose()?,
            totp_enabled: self.totp_enabled,
            failed_attempts: self.failed_attempts.max(0) as u32,
            locked_until: self.locked_until,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    session_id: Uuid,
    user_id: Uuid,
    fingerprint_hash: Vec<u8>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    realm_id: Option<Uuid>,
    mfa_pending: bool,
    remember_me: bool,
    expires_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl SessionRow {
    fn into_session(self) -> AuthSession {
        AuthSession {
            session_id: self.session_id,
            user_id: UserId::from_uuid(self.user_id),
            realm_id: self.realm_id.map(RealmId::from_uuid),
            mfa_pending: self.mfa_pending,
            remember_me: self.remember_me,
            fingerprint_hash: self.fingerprint_hash,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            expires_at: self.expires_at,
            last_activity_at: self.last_activity_at,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ResetTokenRow {
    token_id: Uuid,
    user_id: Uuid,
    token_hash: Vec<u8>,
    expires_at: DateTime<Utc>,
    used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl ResetTokenRow {
    fn into_token(self) -> PasswordResetToken {
        PasswordResetToken {
            token_id: self.token_id,
            user_id: UserId::from_uuid(self.user_id),
            token_hash: self.token_hash,
            expires_at: self.expires_at,
            used_at: self.used_at,
            created_at: self.created_at,
        }
    }
}
