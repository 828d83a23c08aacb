//! Removal of expired sessions, reset tokens, codes, tokens and old audit
//! entries

use auth::store::{AuthStore, PasswordResetRepository, SessionRepository};
use chrono::{DateTime, Duration, Utc};
use realm::store::{AuditRepository, RealmStore};
use serde::Serialize;
use verification::store::{CodeRepository, TokenRepository, VerificationStore};

use crate::jobs::JobResult;

/// Codes stay visible to status checks for this long after their long expiry
pub const CODE_RETENTION_DAYS: i64 = 7;
pub const AUDIT_RETENTION_DAYS: i64 = 90;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub sessions: u64,
    pub reset_tokens: u64,
    pub codes: u64,
    pub tokens: u64,
    pub audit_entries: u64,
}

pub async fn run_cleanup<A, R, V>(
    auth: &A,
    realms: &R,
    verification: &V,
    now: DateTime<Utc>,
) -> JobResult<CleanupReport>
where
    A: AuthStore,
    R: RealmStore,
    V: VerificationStore,
{
    let report = CleanupReport {
        sessions: auth.purge_expired_sessions(now).await?,
        reset_tokens: auth.purge_reset_tokens(now).await?,
        codes: verification
            .purge_codes(now - Duration::days(CODE_RETENTION_DAYS))
            .await?,
        tokens: verification.purge_tokens(now).await?,
        audit_entries: realms
            .purge_audit_before(now - Duration::days(AUDIT_RETENTION_DAYS))
            .await?,
    };

    tracing::info!(
        sessions_deleted = report.sessions,
        reset_tokens_deleted = report.reset_tokens,
        codes_deleted = report.codes,
        tokens_deleted = report.tokens,
        audit_entries_deleted = report.audit_entries,
        "Cleanup completed"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth::store::MemoryAuthRepository;
    use kernel::id::{RealmId, VerificationCodeId};
    use realm::models::TestType;
    use realm::store::MemoryRealmRepository;
    use verification::models::{VerificationCode, VerificationToken};
    use verification::store::MemoryVerificationRepository;

    fn code(long_expires_at: DateTime<Utc>) -> VerificationCode {
        VerificationCode {
            id: VerificationCodeId::new(),
            realm_id: RealmId::new(),
            uuid: uuid::Uuid::new_v4(),
            code_hmac: uuid::Uuid::new_v4().to_string(),
            long_code_hmac: uuid::Uuid::new_v4().to_string(),
            test_type: TestType::Confirmed,
            symptom_date: None,
            test_date: None,
            issuer: None,
            phone_provided: false,
            claimed: false,
            expires_at: long_expires_at,
            long_expires_at,
            created_at: long_expires_at - Duration::days(1),
        }
    }

    #[tokio::test]
    async fn test_cleanup_keeps_recent_codes() {
        let auth = MemoryAuthRepository::new();
        let realms = MemoryRealmRepository::new();
        let verification = MemoryVerificationRepository::new();
        let now = Utc::now();

        let stale = code(now - Duration::days(CODE_RETENTION_DAYS + 1));
        let recent = code(now - Duration::days(1));
        verification.create_code(&stale).await.unwrap();
        verification.create_code(&recent).await.unwrap();

        let token = VerificationToken::for_code(&recent, Duration::minutes(1), now - Duration::hours(1));
        verification.create_token(&token).await.unwrap();

        let report = run_cleanup(&auth, &realms, &verification, now).await.unwrap();
        assert_eq!(report.codes, 1);
        assert_eq!(report.tokens, 1);
        assert_eq!(report.sessions, 0);

        assert!(verification.find_code_by_uuid(&recent.realm_id, &recent.uuid).await.unwrap().is_some());
        assert!(verification.find_code_by_uuid(&stale.realm_id, &stale.uuid).await.unwrap().is_none());
    }
}
