//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use realm::models::Permissions;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::{RealmChoice, RealmMember, SessionStatus, SignInOutput, TotpSetupOutput};
use crate::domain::entity::User;
use crate::domain::value_object::{MfaDecision, UserStatus};

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub system_admin: bool,
    pub status: UserStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id.into_uuid(),
            email: u.email.into_db(),
            name: u.name,
            system_admin: u.system_admin,
            status: u.status,
            last_login_at: u.last_login_at,
            created_at: u.created_at,
        }
    }
}

// ============================================================================
// Sign In
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
    /// Required once the user has enrolled in TOTP
    pub totp_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub user: UserResponse,
    pub mfa_decision: MfaDecision,
    /// Resend with `totpCode`; no session was created
    pub totp_required: bool,
    /// Session may only reach TOTP enrollment and sign-out
    pub mfa_pending: bool,
    pub realm_id: Option<Uuid>,
    pub password_expired: bool,
    pub password_expires_in_days: Option<i64>,
}

impl From<SignInOutput> for SignInResponse {
    fn from(out: SignInOutput) -> Self {
        Self {
            totp_required: out.totp_required(),
            user: out.user.into(),
            mfa_decision: out.mfa_decision,
            mfa_pending: out.mfa_pending,
            realm_id: out.realm_id.map(|id| id.into_uuid()),
            password_expired: out.password.expired,
            password_expires_in_days: out.password.expires_in_days,
        }
    }
}

// ============================================================================
// Session Status
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub authenticated: bool,
    pub user: Option<UserResponse>,
    pub realm_id: Option<Uuid>,
    pub mfa_pending: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub password_expired: bool,
    pub password_expires_in_days: Option<i64>,
}

impl SessionStatusResponse {
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            user: None,
            realm_id: None,
            mfa_pending: false,
            expires_at: None,
            password_expired: false,
            password_expires_in_days: None,
        }
    }
}

impl From<SessionStatus> for SessionStatusResponse {
    fn from(s: SessionStatus) -> Self {
        let session = s.current.session;
        Self {
            authenticated: true,
            user: Some(s.current.user.into()),
            realm_id: session.realm_id.map(|id| id.into_uuid()),
            mfa_pending: session.mfa_pending,
            expires_at: Some(session.expires_at),
            password_expired: s.password.expired,
            password_expires_in_days: s.password.expires_in_days,
        }
    }
}

// ============================================================================
// Realm Selection
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmChoiceResponse {
    pub realm_id: Uuid,
    pub name: String,
    pub permissions: Permissions,
}

impl From<RealmChoice> for RealmChoiceResponse {
    fn from(c: RealmChoice) -> Self {
        Self {
            realm_id: c.realm_id.into_uuid(),
            name: c.name,
            permissions: c.permissions,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectRealmRequest {
    pub realm_id: Uuid,
}

// ============================================================================
// TOTP
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotpSetupResponse {
    /// PNG, base64
    pub qr_code_base64: String,
    pub secret: String,
    pub otpauth_url: String,
}

impl From<TotpSetupOutput> for TotpSetupResponse {
    fn from(out: TotpSetupOutput) -> Self {
        Self {
            qr_code_base64: out.qr_code_base64,
            secret: out.secret,
            otpauth_url: out.otpauth_url,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotpCodeRequest {
    pub code: String,
}

// ============================================================================
// Passwords
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePasswordResetRequest {
    pub token: String,
    pub new_password: String,
}

// ============================================================================
// Realm Users
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub permissions: Permissions,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRequest {
    pub permissions: Permissions,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub permissions: Permissions,
}

impl From<RealmMember> for MemberResponse {
    fn from(m: RealmMember) -> Self {
        Self {
            user: m.user.into(),
            permissions: m.permissions,
        }
    }
}

// ============================================================================
// System Users
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemAdminRequest {
    pub system_admin: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusRequest {
    pub disabled: bool,
}
