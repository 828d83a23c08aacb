//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use platform::password::PasswordRequirements;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entity::{
    AuditEntry, AuthorizedApp, EmailConfig, MobileApp, MobileOs, ProviderKind, Realm, SigningKey,
    SmsConfig, SmsFromNumber,
};
use crate::domain::value_object::{ApiKeyType, MfaMode, TestTypes};

// ============================================================================
// Realms
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRealmRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmResponse {
    pub id: Uuid,
    pub name: String,
    pub region_code: String,
    pub allowed_test_types: TestTypes,
    pub require_date: bool,
    pub code_length: u32,
    pub code_duration_minutes: i64,
    pub long_code_length: u32,
    pub long_code_duration_hours: i64,
    pub sms_text_template: String,
    pub mfa_mode: MfaMode,
    pub mfa_grace_period_days: i64,
    pub password_requirements: PasswordRequirements,
    pub password_rotation_period_days: u32,
    pub password_rotation_warning_days: u32,
    pub certificate_issuer: String,
    pub certificate_audience: String,
    pub certificate_duration_minutes: i64,
    pub use_system_sms_config: bool,
    pub sms_from_number_id: Option<Uuid>,
    pub use_system_email_config: bool,
    pub can_use_system_sms_config: bool,
    pub can_use_system_email_config: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Realm> for RealmResponse {
    fn from(r: Realm) -> Self {
        Self {
            id: r.id.into_uuid(),
            name: r.name,
            region_code: r.region_code,
            allowed_test_types: r.allowed_test_types,
            require_date: r.require_date,
            code_length: r.code_length,
            code_duration_minutes: r.code_duration.num_minutes(),
            long_code_length: r.long_code_length,
            long_code_duration_hours: r.long_code_duration.num_hours(),
            sms_text_template: r.sms_text_template,
            mfa_mode: r.mfa_mode,
            mfa_grace_period_days: r.mfa_required_grace_period.num_days(),
            password_requirements: r.password_requirements,
            password_rotation_period_days: r.password_rotation_period_days,
            password_rotation_warning_days: r.password_rotation_warning_days,
            certificate_issuer: r.certificate_issuer,
            certificate_audience: r.certificate_audience,
            certificate_duration_minutes: r.certificate_duration.num_minutes(),
            use_system_sms_config: r.use_system_sms_config,
            sms_from_number_id: r.sms_from_number_id,
            use_system_email_config: r.use_system_email_config,
            can_use_system_sms_config: r.can_use_system_sms_config,
            can_use_system_email_config: r.can_use_system_email_config,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

// ============================================================================
// API Keys
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyRequest {
    pub name: String,
    pub api_key_type: ApiKeyType,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyResponse {
    pub id: Uuid,
    pub name: String,
    pub api_key_type: ApiKeyType,
    pub preview: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<AuthorizedApp> for ApiKeyResponse {
    fn from(app: AuthorizedApp) -> Self {
        Self {
            active: app.is_active(),
            id: app.id.into_uuid(),
            name: app.name,
            api_key_type: app.api_key_type,
            preview: app.api_key_preview,
            created_at: app.created_at,
        }
    }
}

/// The full key appears only in this response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedApiKeyResponse {
    #[serde(flatten)]
    pub app: ApiKeyResponse,
    pub api_key: String,
}

// ============================================================================
// Mobile Apps
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileAppResponse {
    pub id: Uuid,
    pub name: String,
    pub os: MobileOs,
    pub app_id: String,
    pub url: String,
    pub sha: Vec<String>,
    pub disabled: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<MobileApp> for MobileAppResponse {
    fn from(app: MobileApp) -> Self {
        Self {
            id: app.id.into_uuid(),
            name: app.name,
            os: app.os,
            app_id: app.app_id,
            url: app.url,
            sha: app
                .sha
                .split(',')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            disabled: app.disabled,
            updated_at: app.updated_at,
        }
    }
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Auth tokens are reported as present or absent only
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsConfigResponse {
    pub provider: ProviderKind,
    pub webhook_url: String,
    pub has_auth_token: bool,
    pub from_number: String,
    pub updated_at: DateTime<Utc>,
}

impl From<SmsConfig> for SmsConfigResponse {
    fn from(c: SmsConfig) -> Self {
        Self {
            provider: c.provider,
            webhook_url: c.webhook_url,
            has_auth_token: !c.auth_token.is_empty(),
            from_number: c.from_number,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSmsResponse {
    pub config: Option<SmsConfigResponse>,
    pub from_numbers: Vec<SmsFromNumber>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailConfigResponse {
    pub provider: ProviderKind,
    pub webhook_url: String,
    pub has_auth_token: bool,
    pub from_address: String,
    pub updated_at: DateTime<Utc>,
}

impl From<EmailConfig> for EmailConfigResponse {
    fn from(c: EmailConfig) -> Self {
        Self {
            provider: c.provider,
            webhook_url: c.webhook_url,
            has_auth_token: !c.auth_token.is_empty(),
            from_address: c.from_address,
            updated_at: c.updated_at,
        }
    }
}

// ============================================================================
// Audit
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntryResponse {
    pub id: Uuid,
    pub actor_id: String,
    pub actor: String,
    pub action: String,
    pub target_id: String,
    pub target: String,
    pub created_at: DateTime<Utc>,
}

impl From<AuditEntry> for AuditEntryResponse {
    fn from(e: AuditEntry) -> Self {
        Self {
            id: e.id.into_uuid(),
            actor_id: e.actor_id,
            actor: e.actor_display,
            action: e.action,
            target_id: e.target_id,
            target: e.target_display,
            created_at: e.created_at,
        }
    }
}

// ============================================================================
// Signing Keys
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningKeyResponse {
    pub id: Uuid,
    pub kid: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<SigningKey> for SigningKeyResponse {
    fn from(k: SigningKey) -> Self {
        Self {
            id: k.id.into_uuid(),
            kid: k.kid,
            active: k.active,
            created_at: k.created_at,
        }
    }
}
