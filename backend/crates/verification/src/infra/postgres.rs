//! PostgreSQL Repository Implementations
//!
//! Claims and token use are single `UPDATE ... RETURNING` statements, so two
//! devices racing on the same code or token cannot both win.

use chrono::{DateTime, NaiveDate, Utc};
use kernel::error::conversions::is_unique_violation;
use kernel::id::{AuthorizedAppId, RealmId, UserId, VerificationCodeId, VerificationTokenId};
use realm::models::TestType;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::{RealmStats, VerificationCode, VerificationToken};
use crate::domain::repository::{CodeRepository, StatsRepository, TokenRepository};
use crate::domain::value_objects::{CodeKind, Issuer, StatCounter};
use crate::error::{VerificationError, VerificationResult};

/// PostgreSQL-backed verification repository
#[derive(Clone)]
pub struct PgVerificationRepository {
    pool: PgPool,
}

impl PgVerificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CODE_COLUMNS: &str = r#"
    code_id, realm_id, uuid, code_hmac, long_code_hmac, test_type, symptom_date,
    test_date, issuing_user_id, issuing_app_id, phone_provided, claimed,
    expires_at, long_expires_at, created_at
"#;

const TOKEN_COLUMNS: &str =
    "token_id, realm_id, code_id, test_type, symptom_date, test_date, used, expires_at, created_at";

fn test_type_from_db(id: i16) -> VerificationResult<TestType> {
    TestType::from_id(id)
        .ok_or_else(|| VerificationError::Internal(format!("unknown test type id {id}")))
}

// ============================================================================
// Code Repository Implementation
// ============================================================================

impl CodeRepository for PgVerificationRepository {
    async fn create_code(&self, code: &VerificationCode) -> VerificationResult<()> {
        let sql = format!(
            "INSERT INTO verification_codes ({CODE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"
        );
        sqlx::query(&sql)
            .bind(code.id.as_uuid())
            .bind(code.realm_id.as_uuid())
            .bind(code.uuid)
            .bind(&code.code_hmac)
            .bind(&code.long_code_hmac)
            .bind(code.test_type.id())
            .bind(code.symptom_date)
            .bind(code.test_date)
            .bind(code.issuer.and_then(|i| i.user_id()).map(|id| id.into_uuid()))
            .bind(code.issuer.and_then(|i| i.app_id()).map(|id| id.into_uuid()))
            .bind(code.phone_provided)
            .bind(code.claimed)
            .bind(code.expires_at)
            .bind(code.long_expires_at)
            .bind(code.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    VerificationError::DuplicateUuid
                } else {
                    VerificationError::Database(e)
                }
            })?;
        Ok(())
    }

    async fn find_code_by_uuid(
        &self,
        realm_id: &RealmId,
        uuid: &Uuid,
    ) -> VerificationResult<Option<VerificationCode>> {
        let sql = format!(
            "SELECT {CODE_COLUMNS} FROM verification_codes WHERE realm_id = $1 AND uuid = $2"
        );
        let row = sqlx::query_as::<_, CodeRow>(&sql)
            .bind(realm_id.as_uuid())
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?;
        row.map(CodeRow::into_code).transpose()
    }

    async fn find_code_by_hmac(
        &self,
        realm_id: &RealmId,
        hmac: &str,
    ) -> VerificationResult<Option<VerificationCode>> {
        // Newest first: an expired code may share its HMAC with a live one
        let sql = format!(
            r#"
            SELECT {CODE_COLUMNS} FROM verification_codes
            WHERE realm_id = $1 AND (code_hmac = $2 OR long_code_hmac = $2)
            ORDER BY created_at DESC
            LIMIT 1
            "#
        );
        let row = sqlx::query_as::<_, CodeRow>(&sql)
            .bind(realm_id.as_uuid())
            .bind(hmac)
            .fetch_optional(&self.pool)
            .await?;
        row.map(CodeRow::into_code).transpose()
    }

    async fn claim_code(
        &self,
        code_id: &VerificationCodeId,
        kind: CodeKind,
        now: DateTime<Utc>,
    ) -> VerificationResult<Option<VerificationCode>> {
        let expiry_column = match kind {
            CodeKind::Short => "expires_at",
            CodeKind::Long => "long_expires_at",
        };
        let sql = format!(
            r#"
            UPDATE verification_codes SET claimed = TRUE
            WHERE code_id = $1 AND claimed = FALSE AND {expiry_column} > $2
            RETURNING {CODE_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, CodeRow>(&sql)
            .bind(code_id.as_uuid())
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        row.map(CodeRow::into_code).transpose()
    }

    async fn release_code(&self, code_id: &VerificationCodeId) -> VerificationResult<()> {
        sqlx::query("UPDATE verification_codes SET claimed = FALSE WHERE code_id = $1")
            .bind(code_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn expire_code(
        &self,
        code_id: &VerificationCodeId,
        now: DateTime<Utc>,
    ) -> VerificationResult<Option<VerificationCode>> {
        let sql = format!(
            r#"
            UPDATE verification_codes SET expires_at = $2, long_expires_at = $2
            WHERE code_id = $1 AND claimed = FALSE
            RETURNING {CODE_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, CodeRow>(&sql)
            .bind(code_id.as_uuid())
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        row.map(CodeRow::into_code).transpose()
    }

    async fn purge_codes(&self, before: DateTime<Utc>) -> VerificationResult<u64> {
        let result = sqlx::query("DELETE FROM verification_codes WHERE long_expires_at < $1")
            .bind(before)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

// ============================================================================
// Token Repository Implementation
// ============================================================================

impl TokenRepository for PgVerificationRepository {
    async fn create_token(&self, token: &VerificationToken) -> VerificationResult<()> {
        let sql = format!(
            "INSERT INTO verification_tokens ({TOKEN_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        );
        sqlx::query(&sql)
            .bind(token.id.as_uuid())
            .bind(token.realm_id.as_uuid())
            .bind(token.code_id.as_uuid())
            .bind(token.test_type.id())
            .bind(token.symptom_date)
            .bind(token.test_date)
            .bind(token.used)
            .bind(token.expires_at)
            .bind(token.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_token(
        &self,
        realm_id: &RealmId,
        token_id: &VerificationTokenId,
    ) -> VerificationResult<Option<VerificationToken>> {
        let sql = format!(
            "SELECT {TOKEN_COLUMNS} FROM verification_tokens WHERE token_id = $1 AND realm_id = $2"
        );
        let row = sqlx::query_as::<_, TokenRow>(&sql)
            .bind(token_id.as_uuid())
            .bind(realm_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(TokenRow::into_token).transpose()
    }

    async fn use_token(
        &self,
        realm_id: &RealmId,
        token_id: &VerificationTokenId,
        now: DateTime<Utc>,
    ) -> VerificationResult<Option<VerificationToken>> {
        let sql = format!(
            r#"
            UPDATE verification_tokens SET used = TRUE
            WHERE token_id = $1 AND realm_id = $2 AND used = FALSE AND expires_at > $3
            RETURNING {TOKEN_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, TokenRow>(&sql)
            .bind(token_id.as_uuid())
            .bind(realm_id.as_uuid())
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TokenRow::into_token).transpose()
    }

    async fn purge_tokens(&self, before: DateTime<Utc>) -> VerificationResult<u64> {
        let result = sqlx::query("DELETE FROM verification_tokens WHERE expires_at < $1")
            .bind(before)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

// ============================================================================
// Stats Repository Implementation
// ============================================================================

impl StatsRepository for PgVerificationRepository {
    async fn increment_stat(
        &self,
        realm_id: &RealmId,
        date: NaiveDate,
        counter: StatCounter,
    ) -> VerificationResult<()> {
        let column = counter.column();
        let sql = format!(
            r#"
            INSERT INTO realm_stats (realm_id, date, {column}) VALUES ($1, $2, 1)
            ON CONFLICT (realm_id, date)
            DO UPDATE SET {column} = realm_stats.{column} + 1
            "#
        );
        sqlx::query(&sql)
            .bind(realm_id.as_uuid())
            .bind(date)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_stats(
        &self,
        realm_id: &RealmId,
        since: NaiveDate,
    ) -> VerificationResult<Vec<RealmStats>> {
        let rows = sqlx::query_as::<_, StatsRow>(
            r#"
            SELECT realm_id, date, codes_issued, codes_claimed, tokens_claimed
            FROM realm_stats
            WHERE realm_id = $1 AND date >= $2
            ORDER BY date DESC
            "#,
        )
        .bind(realm_id.as_uuid())
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(StatsRow::into_stats).collect())
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(sqlx::FromRow)]
struct CodeRow {
    code_id: Uuid,
    realm_id: Uuid,
    uuid: Uuid,
    code_hmac: String,
    long_code_hmac: String,
    test_type: i16,
    symptom_date: Option<NaiveDate>,
    test_date: Option<NaiveDate>,
    issuing_user_id: Option<Uuid>,
    issuing_app_id: Option<Uuid>,
    phone_provided: bool,
    claimed: bool,
    expires_at: DateTime<Utc>,
    long_expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl CodeRow {
    fn into_code(self) -> VerificationResult<VerificationCode> {
        Ok(VerificationCode {
            id: VerificationCodeId::from_uuid(self.code_id),
            realm_id: RealmId::from_uuid(self.realm_id),
            uuid: self.uuid,
            code_hmac: self.code_hmac,
            long_code_hmac: self.long_code_hmac,
            test_type: test_type_from_db(self.test_type)?,
            symptom_date: self.symptom_date,
            test_date: self.test_date,
            issuer: Issuer::from_ids(
                self.issuing_user_id.map(UserId::from_uuid),
                self.issuing_app_id.map(AuthorizedAppId::from_uuid),
            ),
            phone_provided: self.phone_provided,
            claimed: self.claimed,
            expires_at: self.expires_at,
            long_expires_at: self.long_expires_at,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    token_id: Uuid,
    realm_id: Uuid,
    code_id: Uuid,
    test_type: i16,
    symptom_date: Option<NaiveDate>,
    test_date: Option<NaiveDate>,
    used: bool,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TokenRow {
    fn into_token(self) -> VerificationResult<VerificationToken> {
        Ok(VerificationToken {
            id: VerificationTokenId::from_uuid(self.token_id),
            realm_id: RealmId::from_uuid(self.realm_id),
            code_id: VerificationCodeId::from_uuid(self.code_id),
            test_type: test_type_from_db(self.test_type)?,
            symptom_date: self.symptom_date,
            test_date: self.test_date,
            used: self.used,
            expires_at: self.expires_at,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct StatsRow {
    realm_id: Uuid,
    date: NaiveDate,
    codes_issued: i64,
    codes_claimed: i64,
    tokens_claimed: i64,
}

impl StatsRow {
    fn into_stats(self) -> RealmStats {
        RealmStats {
            realm_id: RealmId::from_uuid(self.realm_id),
            date: self.date,
            codes_issued: self.codes_issued,
            codes_claimed: self.codes_claimed,
            tokens_claimed: self.tokens_claimed,
        }
    }
}
