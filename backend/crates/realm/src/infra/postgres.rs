//! PostgreSQL Repository Implementations

use chrono::{DateTime, Duration, Utc};
use kernel::id::{AuditEntryId, AuthorizedAppId, MobileAppId, RealmId, SigningKeyId, UserId};
use platform::password::PasswordRequirements;
use platform::secret::Secret32;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{
    AuditEntry, AuthorizedApp, EmailConfig, Membership, MobileApp, MobileOs, Realm, SigningKey,
    SmsConfig, SmsFromNumber,
};
use crate::domain::repository::{
    AuditRepository, AuthorizedAppRepository, MembershipRepository, MobileAppRepository,
    ProviderConfigRepository, RealmRepository, SigningKeyRepository,
};
use crate::domain::value_object::{ApiKeyType, MfaMode, Permissions, TestTypes};
use crate::error::{RealmError, RealmResult};

/// PostgreSQL-backed realm repository
#[derive(Clone)]
pub struct PgRealmRepository {
    pool: PgPool,
}

impl PgRealmRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn scope_key(realm_id: Option<&RealmId>) -> String {
    realm_id.map_or_else(|| "system".to_string(), |id| id.to_string())
}

const REALM_COLUMNS: &str = r#"
    realm_id, name, region_code, allowed_test_types, require_date,
    code_length, code_duration_secs, long_code_length, long_code_duration_secs,
    sms_text_template, mfa_mode, mfa_grace_period_secs,
    password_min_length, password_uppercase, password_lowercase, password_digits,
    password_symbols, password_rotation_period_days, password_rotation_warning_days,
    certificate_issuer, certificate_audience, certificate_duration_secs,
    use_system_sms_config, sms_from_number_id, use_system_email_config,
    can_use_system_sms_config, can_use_system_email_config, created_at, updated_at
"#;

// ============================================================================
// Realm Repository Implementation
// ============================================================================

impl RealmRepository for PgRealmRepository {
    async fn create_realm(&self, realm: &Realm) -> RealmResult<()> {
        let sql = format!(
            "INSERT INTO realms ({REALM_COLUMNS}) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29
            )"
        );
        bind_realm(sqlx::query(&sql), realm)
            .execute(&self.pool)
            .await
            .map_err(|e| RealmError::conflict_on_unique(e, "realm name is already taken"))?;
        Ok(())
    }

    async fn find_realm(&self, realm_id: &RealmId) -> RealmResult<Option<Realm>> {
        let sql = format!("SELECT {REALM_COLUMNS} FROM realms WHERE realm_id = $1");
        let row = sqlx::query_as::<_, RealmRow>(&sql)
            .bind(realm_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(RealmRow::into_realm))
    }

    async fn list_realms(&self) -> RealmResult<Vec<Realm>> {
        let sql = format!("SELECT {REALM_COLUMNS} FROM realms ORDER BY name");
        let rows = sqlx::query_as::<_, RealmRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(RealmRow::into_realm).collect())
    }

    async fn update_realm(&self, realm: &Realm) -> RealmResult<()> {
        let result = bind_realm(
            sqlx::query(
                r#"
                UPDATE realms SET
                    name = $2, region_code = $3, allowed_test_types = $4, require_date = $5,
                    code_length = $6, code_duration_secs = $7, long_code_length = $8,
                    long_code_duration_secs = $9, sms_text_template = $10, mfa_mode = $11,
                    mfa_grace_period_secs = $12, password_min_length = $13,
                    password_uppercase = $14, password_lowercase = $15, password_digits = $16,
                    password_symbols = $17, password_rotation_period_days = $18,
                    password_rotation_warning_days = $19, certificate_issuer = $20,
                    certificate_audience = $21, certificate_duration_secs = $22,
                    use_system_sms_config = $23, sms_from_number_id = $24,
                    use_system_email_config = $25, can_use_system_sms_config = $26,
                    can_use_system_email_config = $27, created_at = $28, updated_at = $29
                WHERE realm_id = $1
                "#,
            ),
            realm,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RealmError::conflict_on_unique(e, "realm name is already taken"))?;

        if result.rows_affected() == 0 {
            return Err(RealmError::NotFound("Realm"));
        }
        Ok(())
    }
}

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>;

/// Bind the realm columns in `REALM_COLUMNS` order
fn bind_realm<'q>(query: PgQuery<'q>, realm: &'q Realm) -> PgQuery<'q> {
    let pw = &realm.password_requirements;
    query
        .bind(realm.id.as_uuid())
        .bind(&realm.name)
        .bind(&realm.region_code)
        .bind(realm.allowed_test_types.bits())
        .bind(realm.require_date)
        .bind(realm.code_length as i32)
        .bind(realm.code_duration.num_seconds())
        .bind(realm.long_code_length as i32)
        .bind(realm.long_code_duration.num_seconds())
        .bind(&realm.sms_text_template)
        .bind(realm.mfa_mode.id())
        .bind(realm.mfa_required_grace_period.num_seconds())
        .bind(pw.min_length as i32)
        .bind(pw.uppercase as i32)
        .bind(pw.lowercase as i32)
        .bind(pw.digits as i32)
        .bind(pw.symbols as i32)
        .bind(realm.password_rotation_period_days as i32)
        .bind(realm.password_rotation_warning_days as i32)
        .bind(&realm.certificate_issuer)
        .bind(&realm.certificate_audience)
        .bind(realm.certificate_duration.num_seconds())
        .bind(realm.use_system_sms_config)
        .bind(realm.sms_from_number_id)
        .bind(realm.use_system_email_config)
        .bind(realm.can_use_system_sms_config)
        .bind(realm.can_use_system_email_config)
        .bind(realm.created_at)
        .bind(realm.updated_at)
}

// ============================================================================
// Membership Repository Implementation
// ============================================================================

impl MembershipRepository for PgRealmRepository {
    async fn find_membership(
        &self,
        realm_id: &RealmId,
        user_id: &UserId,
    ) -> RealmResult<Option<Membership>> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT realm_id, user_id, permissions, created_at, updated_at
            FROM realm_memberships
            WHERE realm_id = $1 AND user_id = $2
            "#,
        )
        .bind(realm_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(MembershipRow::into_membership))
    }

    async fn list_memberships_for_user(&self, user_id: &UserId) -> RealmResult<Vec<Membership>> {
        let rows = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT realm_id, user_id, permissions, created_at, updated_at
            FROM realm_memberships
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MembershipRow::into_membership).collect())
    }

    async fn list_memberships_for_realm(&self, realm_id: &RealmId) -> RealmResult<Vec<Membership>> {
        let rows = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT realm_id, user_id, permissions, created_at, updated_at
            FROM realm_memberships
            WHERE realm_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(realm_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MembershipRow::into_membership).collect())
    }

    async fn upsert_membership(&self, membership: &Membership) -> RealmResult<()> {
        sqlx::query(
            r#"
            INSERT INTO realm_memberships (realm_id, user_id, permissions, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (realm_id, user_id) DO UPDATE SET
                permissions = EXCLUDED.permissions,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(membership.realm_id.as_uuid())
        .bind(membership.user_id.as_uuid())
        .bind(i64::from(membership.permissions.bits()))
        .bind(membership.created_at)
        .bind(membership.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_membership(&self, realm_id: &RealmId, user_id: &UserId) -> RealmResult<bool> {
        let deleted = sqlx::query("DELETE FROM realm_memberships WHERE realm_id = $1 AND user_id = $2")
            .bind(realm_id.as_uuid())
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }
}

// ============================================================================
// Authorized App Repository Implementation
// ============================================================================

impl AuthorizedAppRepository for PgRealmRepository {
    async fn create_app(&self, app: &AuthorizedApp) -> RealmResult<()> {
        sqlx::query(
            r#"
            INSERT INTO authorized_apps (
                app_id, realm_id, name, api_key_type, api_key_hmac, api_key_preview,
                created_at, deleted_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(app.id.as_uuid())
        .bind(app.realm_id.as_uuid())
        .bind(&app.name)
        .bind(app.api_key_type.id())
        .bind(&app.api_key_hmac)
        .bind(&app.api_key_preview)
        .bind(app.created_at)
        .bind(app.deleted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RealmError::conflict_on_unique(e, "an API key with this name exists"))?;

        Ok(())
    }

    async fn find_app(
        &self,
        realm_id: &RealmId,
        app_id: &AuthorizedAppId,
    ) -> RealmResult<Option<AuthorizedApp>> {
        let row = sqlx::query_as::<_, AuthorizedAppRow>(
            r#"
            SELECT app_id, realm_id, name, api_key_type, api_key_hmac, api_key_preview,
                   created_at, deleted_at
            FROM authorized_apps
            WHERE realm_id = $1 AND app_id = $2
            "#,
        )
        .bind(realm_id.as_uuid())
        .bind(app_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(AuthorizedAppRow::into_app).transpose()
    }

    async fn find_app_by_hmac(&self, api_key_hmac: &str) -> RealmResult<Option<AuthorizedApp>> {
        let row = sqlx::query_as::<_, AuthorizedAppRow>(
            r#"
            SELECT app_id, realm_id, name, api_key_type, api_key_hmac, api_key_preview,
                   created_at, deleted_at
            FROM authorized_apps
            WHERE api_key_hmac = $1
            "#,
        )
        .bind(api_key_hmac)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AuthorizedAppRow::into_app).transpose()
    }

    async fn list_apps(&self, realm_id: &RealmId) -> RealmResult<Vec<AuthorizedApp>> {
        let rows = sqlx::query_as::<_, AuthorizedAppRow>(
            r#"
            SELECT app_id, realm_id, name, api_key_type, api_key_hmac, api_key_preview,
                   created_at, deleted_at
            FROM authorized_apps
            WHERE realm_id = $1
            ORDER BY name
            "#,
        )
        .bind(realm_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AuthorizedAppRow::into_app).collect()
    }

    async fn update_app(&self, app: &AuthorizedApp) -> RealmResult<()> {
        sqlx::query("UPDATE authorized_apps SET name = $2, deleted_at = $3 WHERE app_id = $1")
            .bind(app.id.as_uuid())
            .bind(&app.name)
            .bind(app.deleted_at)
            .execute(&self.pool)
            .await
            .map_err(|e| RealmError::conflict_on_unique(e, "an API key with this name exists"))?;

        Ok(())
    }
}

// ============================================================================
// Mobile App Repository Implementation
// ============================================================================

impl MobileAppRepository for PgRealmRepository {
    async fn create_mobile_app(&self, app: &MobileApp) -> RealmResult<()> {
        sqlx::query(
            r#"
            INSERT INTO mobile_apps (
                mobile_app_id, realm_id, name, os, app_id, url, sha, disabled,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(app.id.as_uuid())
        .bind(app.realm_id.as_uuid())
        .bind(&app.name)
        .bind(app.os.id())
        .bind(&app.app_id)
        .bind(&app.url)
        .bind(&app.sha)
        .bind(app.disabled)
        .bind(app.created_at)
        .bind(app.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_mobile_app(
        &self,
        realm_id: &RealmId,
        app_id: &MobileAppId,
    ) -> RealmResult<Option<MobileApp>> {
        let row = sqlx::query_as::<_, MobileAppRow>(
            r#"
            SELECT mobile_app_id, realm_id, name, os, app_id, url, sha, disabled,
                   created_at, updated_at
            FROM mobile_apps
            WHERE realm_id = $1 AND mobile_app_id = $2
            "#,
        )
        .bind(realm_id.as_uuid())
        .bind(app_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(MobileAppRow::into_mobile_app).transpose()
    }

    async fn list_mobile_apps(&self, realm_id: &RealmId) -> RealmResult<Vec<MobileApp>> {
        let rows = sqlx::query_as::<_, MobileAppRow>(
            r#"
            SELECT mobile_app_id, realm_id, name, os, app_id, url, sha, disabled,
                   created_at, updated_at
            FROM mobile_apps
            WHERE realm_id = $1
            ORDER BY name
            "#,
        )
        .bind(realm_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(MobileAppRow::into_mobile_app).collect()
    }

    async fn update_mobile_app(&self, app: &MobileApp) -> RealmResult<()> {
        sqlx::query(
            r#"
            UPDATE mobile_apps SET
                name = $2, os = $3, app_id = $4, url = $5, sha = $6, disabled = $7,
                updated_at = $8
            WHERE mobile_app_id = $1
            "#,
        )
        .bind(app.id.as_uuid())
        .bind(&app.name)
        .bind(app.os.id())
        .bind(&app.app_id)
        .bind(&app.url)
        .bind(&app.sha)
        .bind(app.disabled)
        .bind(app.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ============================================================================
// Provider Config Repository Implementation
// ============================================================================

impl ProviderConfigRepository for PgRealmRepository {
    async fn find_sms_config(&self, realm_id: Option<&RealmId>) -> RealmResult<Option<SmsConfig>> {
        let row = sqlx::query_as::<_, SmsConfigRow>(
            r#"
            SELECT realm_id, provider, webhook_url, auth_token, from_number, updated_at
            FROM sms_configs
            WHERE scope = $1
            "#,
        )
        .bind(scope_key(realm_id))
        .fetch_optional(&self.pool)
        .await?;

        row.map(SmsConfigRow::into_config).transpose()
    }

    async fn upsert_sms_config(&self, config: &SmsConfig) -> RealmResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sms_configs (
                scope, realm_id, provider, webhook_url, auth_token, from_number, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (scope) DO UPDATE SET
                provider = EXCLUDED.provider,
                webhook_url = EXCLUDED.webhook_url,
                auth_token = EXCLUDED.auth_token,
                from_number = EXCLUDED.from_number,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(scope_key(config.realm_id.as_ref()))
        .bind(config.realm_id.map(|id| id.into_uuid()))
        .bind(config.provider.as_str())
        .bind(&config.webhook_url)
        .bind(&config.auth_token)
        .bind(&config.from_number)
        .bind(config.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_email_config(
        &self,
        realm_id: Option<&RealmId>,
    ) -> RealmResult<Option<EmailConfig>> {
        let row = sqlx::query_as::<_, EmailConfigRow>(
            r#"
            SELECT realm_id, provider, webhook_url, auth_token, from_address, updated_at
            FROM email_configs
            WHERE scope = $1
            "#,
        )
        .bind(scope_key(realm_id))
        .fetch_optional(&self.pool)
        .await?;

        row.map(EmailConfigRow::into_config).transpose()
    }

    async fn upsert_email_config(&self, config: &EmailConfig) -> RealmResult<()> {
        sqlx::query(
            r#"
            INSERT INTO email_configs (
                scope, realm_id, provider, webhook_url, auth_token, from_address, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (scope) DO UPDATE SET
                provider = EXCLUDED.provider,
                webhook_url = EXCLUDED.webhook_url,
                auth_token = EXCLUDED.auth_token,
                from_address = EXCLUDED.from_address,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(scope_key(config.realm_id.as_ref()))
        .bind(config.realm_id.map(|id| id.into_uuid()))
        .bind(config.provider.as_str())
        .bind(&config.webhook_url)
        .bind(&config.auth_token)
        .bind(&config.from_address)
        .bind(config.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_sms_from_numbers(&self) -> RealmResult<Vec<SmsFromNumber>> {
        let rows = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT number_id, label, value FROM sms_from_numbers ORDER BY position",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, label, value)| SmsFromNumber { id, label, value })
            .collect())
    }

    async fn replace_sms_from_numbers(&self, numbers: &[SmsFromNumber]) -> RealmResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM sms_from_numbers")
            .execute(&mut *tx)
            .await?;

        for (position, number) in numbers.iter().enumerate() {
            sqlx::query(
                "INSERT INTO sms_from_numbers (number_id, label, value, position) VALUES ($1, $2, $3, $4)",
            )
            .bind(number.id)
            .bind(&number.label)
            .bind(&number.value)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

// ============================================================================
// Audit Repository Implementation
// ============================================================================

impl AuditRepository for PgRealmRepository {
    async fn record_audit(&self, entry: &AuditEntry) -> RealmResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_entries (
                audit_id, realm_id, actor_id, actor_display, action, target_id,
                target_display, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.realm_id.map(|id| id.into_uuid()))
        .bind(&entry.actor_id)
        .bind(&entry.actor_display)
        .bind(&entry.action)
        .bind(&entry.target_id)
        .bind(&entry.target_display)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_audit(
        &self,
        realm_id: Option<&RealmId>,
        limit: u32,
        offset: u32,
    ) -> RealmResult<Vec<AuditEntry>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT audit_id, realm_id, actor_id, actor_display, action, target_id,
                   target_display, created_at
            FROM audit_entries
            WHERE realm_id IS NOT DISTINCT FROM $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(realm_id.map(|id| *id.as_uuid()))
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AuditRow::into_entry).collect())
    }

    async fn purge_audit_before(&self, before: DateTime<Utc>) -> RealmResult<u64> {
        let deleted = sqlx::query("DELETE FROM audit_entries WHERE created_at < $1")
            .bind(before)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::info!(audit_entries_deleted = deleted, "Purged old audit entries");
        Ok(deleted)
    }
}

// ============================================================================
// Signing Key Repository Implementation
// ============================================================================

impl SigningKeyRepository for PgRealmRepository {
    async fn list_signing_keys(&self, realm_id: &RealmId) -> RealmResult<Vec<SigningKey>> {
        let rows = sqlx::query_as::<_, SigningKeyRow>(
            r#"
            SELECT key_id, realm_id, kid, key_material, active, created_at, deleted_at
            FROM signing_keys
            WHERE realm_id = $1 AND deleted_at IS NULL
            ORDER BY created_at
            "#,
        )
        .bind(realm_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SigningKeyRow::into_key).collect()
    }

    async fn create_signing_key(&self, key: &SigningKey) -> RealmResult<()> {
        sqlx::query(
            r#"
            INSERT INTO signing_keys (key_id, realm_id, kid, key_material, active, created_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(key.id.as_uuid())
        .bind(key.realm_id.as_uuid())
        .bind(&key.kid)
        .bind(key.key.to_base64())
        .bind(key.active)
        .bind(key.created_at)
        .bind(key.deleted_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn activate_signing_key(
        &self,
        realm_id: &RealmId,
        key_id: &SigningKeyId,
    ) -> RealmResult<bool> {
        // Single statement so the realm never has two active keys
        let updated = sqlx::query(
            r#"
            UPDATE signing_keys SET active = (key_id = $2)
            WHERE realm_id = $1
              AND deleted_at IS NULL
              AND EXISTS (
                  SELECT 1 FROM signing_keys
                  WHERE realm_id = $1 AND key_id = $2 AND deleted_at IS NULL
              )
            "#,
        )
        .bind(realm_id.as_uuid())
        .bind(key_id.as_uuid())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated > 0)
    }

    async fn delete_signing_key(
        &self,
        realm_id: &RealmId,
        key_id: &SigningKeyId,
    ) -> RealmResult<bool> {
        let deleted = sqlx::query(
            r#"
            UPDATE signing_keys SET deleted_at = NOW(), active = FALSE
            WHERE realm_id = $1 AND key_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(realm_id.as_uuid())
        .bind(key_id.as_uuid())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(deleted > 0)
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct RealmRow {
    realm_id: Uuid,
    name: String,
    region_code: String,
    allowed_test_types: i16,
    require_date: bool,
    code_length: i32,
    code_duration_secs: i64,
    long_code_length: i32,
    long_code_duration_secs: i64,
    sms_text_template: String,
    mfa_mode: i16,
    mfa_grace_period_secs: i64,
    password_min_length: i32,
    password_uppercase: i32,
    password_lowercase: i32,
    password_digits: i32,
    password_symbols: i32,
    password_rotation_period_days: i32,
    password_rotation_warning_days: i32,
    certificate_issuer: String,
    certificate_audience: String,
    certificate_duration_secs: i64,
    use_system_sms_config: bool,
    sms_from_number_id: Option<Uuid>,
    use_system_email_config: bool,
    can_use_system_sms_config: bool,
    can_use_system_email_config: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RealmRow {
    fn into_realm(self) -> Realm {
        let count = |v: i32| v.max(0) as u32;
        Realm {
            id: RealmId::from_uuid(self.realm_id),
            name: self.name,
            region_code: self.region_code,
            allowed_test_types: TestTypes::from_bits_truncate(self.allowed_test_types),
            require_date: self.require_date,
            code_length: count(self.code_length),
            code_duration: Duration::seconds(self.code_duration_secs),
            long_code_length: count(self.long_code_length),
            long_code_duration: Duration::seconds(self.long_code_duration_secs),
            sms_text_template: self.sms_text_template,
            mfa_mode: MfaMode::from_id(self.mfa_mode),
            mfa_required_grace_period: Duration::seconds(self.mfa_grace_period_secs),
            password_requirements: PasswordRequirements {
                min_length: count(self.password_min_length),
                uppercase: count(self.password_uppercase),
                lowercase: count(self.password_lowercase),
                digits: count(self.password_digits),
                symbols: count(self.password_symbols),
            },
            password_rotation_period_days: count(self.password_rotation_period_days),
            password_rotation_warning_days: count(self.password_rotation_warning_days),
            certificate_issuer: self.certificate_issuer,
            certificate_audience: self.certificate_audience,
            certificate_duration: Duration::seconds(self.certificate_duration_secs),
            use_system_sms_config: self.use_system_sms_config,
            sms_from_number_id: self.sms_from_number_id,
            use_system_email_config: self.use_system_email_config,
            can_use_system_sms_config: self.can_use_system_sms_config,
            can_use_system_email_config: self.can_use_system_email_config,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MembershipRow {
    realm_id: Uuid,
    user_id: Uuid,
    permissions: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MembershipRow {
    fn into_membership(self) -> Membership {
        Membership {
            realm_id: RealmId::from_uuid(self.realm_id),
            user_id: UserId::from_uuid(self.user_id),
            permissions: Permissions::from_bits_truncate(self.permissions).implied(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AuthorizedAppRow {
    app_id: Uuid,
    realm_id: Uuid,
    name: String,
    api_key_type: i16,
    api_key_hmac: String,
    api_key_preview: String,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl AuthorizedAppRow {
    fn into_app(self) -> RealmResult<AuthorizedApp> {
        let api_key_type = ApiKeyType::from_id(self.api_key_type).ok_or_else(|| {
            RealmError::Internal(format!("Invalid api_key_type: {}", self.api_key_type))
        })?;

        Ok(AuthorizedApp {
            id: AuthorizedAppId::from_uuid(self.app_id),
            realm_id: RealmId::from_uuid(self.realm_id),
            name: self.name,
            api_key_type,
            api_key_hmac: self.api_key_hmac,
            api_key_preview: self.api_key_preview,
            created_at: self.created_at,
            deleted_at: self.deleted_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MobileAppRow {
    mobile_app_id: Uuid,
    realm_id: Uuid,
    name: String,
    os: i16,
    app_id: String,
    url: String,
    sha: String,
    disabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MobileAppRow {
    fn into_mobile_app(self) -> RealmResult<MobileApp> {
        let os = MobileOs::from_id(self.os)
            .ok_or_else(|| RealmError::Internal(format!("Invalid mobile os: {}", self.os)))?;

        Ok(MobileApp {
            id: MobileAppId::from_uuid(self.mobile_app_id),
            realm_id: RealmId::from_uuid(self.realm_id),
            name: self.name,
            os,
            app_id: self.app_id,
            url: self.url,
            sha: self.sha,
            disabled: self.disabled,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SmsConfigRow {
    realm_id: Option<Uuid>,
    provider: String,
    webhook_url: String,
    auth_token: String,
    from_number: String,
    updated_at: DateTime<Utc>,
}

impl SmsConfigRow {
    fn into_config(self) -> RealmResult<SmsConfig> {
        Ok(SmsConfig {
            realm_id: self.realm_id.map(RealmId::from_uuid),
            provider: self.provider.parse().map_err(RealmError::Internal)?,
            webhook_url: self.webhook_url,
            auth_token: self.auth_token,
            from_number: self.from_number,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct EmailConfigRow {
    realm_id: Option<Uuid>,
    provider: String,
    webhook_url: String,
    auth_token: String,
    from_address: String,
    updated_at: DateTime<Utc>,
}

impl EmailConfigRow {
    fn into_config(self) -> RealmResult<EmailConfig> {
        Ok(EmailConfig {
            realm_id: self.realm_id.map(RealmId::from_uuid),
            provider: self.provider.parse().map_err(RealmError::Internal)?,
            webhook_url: self.webhook_url,
            auth_token: self.auth_token,
            from_address: self.from_address,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    audit_id: Uuid,
    realm_id: Option<Uuid>,
    actor_id: String,
    actor_display: String,
    action: String,
    target_id: String,
    target_display: String,
    created_at: DateTime<Utc>,
}

impl AuditRow {
    fn into_entry(self) -> AuditEntry {
        AuditEntry {
            id: AuditEntryId::from_uuid(self.audit_id),
            realm_id: self.realm_id.map(RealmId::from_uuid),
            actor_id: self.actor_id,
            actor_display: self.actor_display,
            action: self.action,
            target_id: self.target_id,
            target_display: self.target_display,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SigningKeyRow {
    key_id: Uuid,
    realm_id: Uuid,
    kid: String,
    key_material: String,
    active: bool,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl SigningKeyRow {
    fn into_key(self) -> RealmResult<SigningKey> {
        let key = Secret32::from_base64(&self.key_material)
            .map_err(|e| RealmError::Internal(format!("Invalid signing key {}: {}", self.kid, e)))?;

        Ok(SigningKey {
            id: SigningKeyId::from_uuid(self.key_id),
            realm_id: RealmId::from_uuid(self.realm_id),
            kid: self.kid,
            key,
            active: self.active,
            created_at: self.created_at,
            deleted_at: self.deleted_at,
        })
    }
}
