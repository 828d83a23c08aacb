//! Issue Code Use Case
//!
//! Creates a short and a long code for a diagnosis. When a phone number is
//! given the codes go out by SMS; a failed send expires the code again.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use kernel::id::VerificationCodeId;
use platform::notify::{SmsMessage, normalize_phone};
use realm::application::{ResolvedSms, resolve_sms_provider};
use realm::domain::service::sms_template::{SmsTemplateValues, expand};
use realm::models::{ApiKeyType, Permissions, Realm, TestType};
use realm::store::RealmStore;
use realm::{RealmConfig, RealmError};
use uuid::Uuid;

use crate::application::caller::Caller;
use crate::application::config::VerificationConfig;
use crate::application::realm_stats::bump;
use crate::domain::entities::VerificationCode;
use crate::domain::repository::VerificationStore;
use crate::domain::services::{GeneratedCodes, code_hmac, generate_codes};
use crate::domain::value_objects::{DateWindow, StatCounter};
use crate::error::{VerificationError, VerificationResult};

#[derive(Debug, Clone, Default)]
pub struct IssueCodeInput {
    pub test_type: Option<TestType>,
    /// `YYYY-MM-DD`
    pub symptom_date: Option<String>,
    /// `YYYY-MM-DD`
    pub test_date: Option<String>,
    /// Minutes east of UTC of the issuer
    pub tz_offset_minutes: i64,
    pub phone: Option<String>,
    /// Client chosen handle; generated when absent
    pub uuid: Option<Uuid>,
}

/// A stored code with its plain values
#[derive(Debug, Clone)]
pub struct IssuedCode {
    pub code: VerificationCode,
    pub plain: GeneratedCodes,
}

pub struct IssueCodeUseCase<V, R>
where
    V: VerificationStore,
    R: RealmStore,
{
    repo: Arc<V>,
    realms: Arc<R>,
    config: Arc<VerificationConfig>,
    realm_config: Arc<RealmConfig>,
}

impl<V, R> IssueCodeUseCase<V, R>
where
    V: VerificationStore,
    R: RealmStore,
{
    pub fn new(
        repo: Arc<V>,
        realms: Arc<R>,
        config: Arc<VerificationConfig>,
        realm_config: Arc<RealmConfig>,
    ) -> Self {
        Self {
            repo,
            realms,
            config,
            realm_config,
        }
    }

    pub async fn execute(
        &self,
        caller: Caller<'_>,
        input: IssueCodeInput,
    ) -> VerificationResult<IssuedCode> {
        let realm_id = caller
            .realm(self.realms.as_ref(), Permissions::CODE_ISSUE, ApiKeyType::Admin)
            .await?;
        let realm = self
            .realms
            .find_realm(&realm_id)
            .await?
            .ok_or(RealmError::NotFound("Realm"))?;

        let now = Utc::now();
        let test_type = input
            .test_type
            .ok_or_else(|| VerificationError::Validation("testType is required".to_string()))?;
        if !realm.allowed_test_types.contains(test_type) {
            return Err(VerificationError::Validation(format!(
                "test type {test_type} is not allowed in this realm"
            )));
        }

        let window = DateWindow::around(now, input.tz_offset_minutes);
        let symptom_date = parse_date(&window, "symptomDate", input.symptom_date.as_deref())?;
        let test_date = parse_date(&window, "testDate", input.test_date.as_deref())?;
        if realm.require_date && symptom_date.is_none() && test_date.is_none() {
            return Err(VerificationError::Validation(
                "a symptom date or test date is required".to_string(),
            ));
        }

        let phone = match input.phone.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(normalize_phone(raw).ok_or_else(|| {
                VerificationError::Validation(
                    "phone number must be in international format, e.g. +15551234567"
                        .to_string(),
                )
            })?),
            _ => None,
        };
        // Resolve before storing anything: no provider, no code
        let sms = match &phone {
            Some(_) => Some(
                resolve_sms_provider(self.realms.as_ref(), &self.realm_config.http_client, &realm)
                    .await?
                    .ok_or(RealmError::ProviderNotConfigured("SMS"))?,
            ),
            None => None,
        };

        let plain = self.unused_codes(&realm, now).await?;
        let secret = self.config.code_secret();
        let code = VerificationCode {
            id: VerificationCodeId::new(),
            realm_id,
            uuid: input.uuid.unwrap_or_else(Uuid::new_v4),
            code_hmac: code_hmac(secret, &plain.code),
            long_code_hmac: code_hmac(secret, &plain.long_code),
            test_type,
            symptom_date,
            test_date,
            issuer: Some(caller.issuer()),
            phone_provided: phone.is_some(),
            claimed: false,
            expires_at: now + realm.code_duration,
            long_expires_at: now + realm.long_code_duration,
            created_at: now,
        };
        self.repo.create_code(&code).await?;

        if let (Some(to), Some(sms)) = (phone, sms) {
            self.send_sms(&realm, &code, &plain, to, sms).await?;
        }

        bump(self.repo.as_ref(), &realm_id, StatCounter::CodesIssued).await;
        tracing::info!(
            realm_id = %realm_id,
            code_id = %code.id,
            test_type = %test_type,
            sms = code.phone_provided,
            "Verification code issued"
        );
        Ok(IssuedCode { code, plain })
    }

    /// Draws codes until the short code matches no live code in the realm
    async fn unused_codes(&self, realm: &Realm, now: DateTime<Utc>) -> VerificationResult<GeneratedCodes> {
        for _ in 0..self.config.code_generation_attempts.max(1) {
            let plain = generate_codes(realm.code_length, realm.long_code_length);
            let hmac = code_hmac(self.config.code_secret(), &plain.code);
            match self.repo.find_code_by_hmac(&realm.id, &hmac).await? {
                Some(existing) if !existing.claimed && !existing.is_fully_expired(now) => continue,
                _ => return Ok(plain),
            }
        }
        Err(VerificationError::Internal(
            "could not generate an unused verification code".to_string(),
        ))
    }

    async fn send_sms(
        &self,
        realm: &Realm,
        code: &VerificationCode,
        plain: &GeneratedCodes,
        to: String,
        sms: ResolvedSms,
    ) -> VerificationResult<()> {
        let body = expand(
            &realm.sms_text_template,
            &SmsTemplateValues {
                region: &realm.region_code,
                code: &plain.code,
                expires: realm.code_duration,
                long_code: &plain.long_code,
                long_expires: realm.long_code_duration,
                redirect_domain: self.realm_config.redirect_domain.as_deref(),
            },
        );
        let message = SmsMessage {
            to,
            from: sms.from,
            body,
        };

        if let Err(e) = sms.provider.send(&message).await {
            tracing::warn!(
                realm_id = %realm.id,
                code_id = %code.id,
                provider = sms.provider.name(),
                error = %e,
                "SMS send failed, expiring code"
            );
            if let Err(expire_err) = self.repo.expire_code(&code.id, Utc::now()).await {
                tracing::error!(
                    code_id = %code.id,
                    error = %expire_err,
                    "Failed to expire code after SMS failure"
                );
            }
            return Err(RealmError::Provider(e).into());
        }
        Ok(())
    }
}

fn parse_date(
    window: &DateWindow,
    field: &str,
    raw: Option<&str>,
) -> VerificationResult<Option<NaiveDate>> {
    match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => window
            .parse(field, raw)
            .map(Some)
            .map_err(VerificationError::Validation),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{Fixture, admin_actor, configure_sms, member_actor};
    use crate::domain::repository::{CodeRepository, StatsRepository};
    use crate::domain::value_objects::Issuer;
    use realm::models::{ProviderKind, TestTypes};

    fn use_case(fx: &Fixture) -> IssueCodeUseCase<crate::infra::memory::MemoryVerificationRepository, realm::store::MemoryRealmRepository> {
        IssueCodeUseCase::new(
            fx.repo.clone(),
            fx.realms.clone(),
            fx.config.clone(),
            fx.realm_config.clone(),
        )
    }

    fn confirmed() -> IssueCodeInput {
        IssueCodeInput {
            test_type: Some(TestType::Confirmed),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_issue_stores_only_hmacs() {
        let fx = Fixture::new().await;
        let actor = admin_actor(&fx.realms, fx.realm.id).await;

        let issued = use_case(&fx)
            .execute(Caller::Session(&actor), confirmed())
            .await
            .unwrap();

        assert_eq!(issued.plain.code.len(), fx.realm.code_length as usize);
        assert_eq!(issued.plain.long_code.len(), fx.realm.long_code_length as usize);
        let stored = fx.repo.codes().await;
        assert_eq!(stored.len(), 1);
        assert_ne!(stored[0].code_hmac, issued.plain.code);
        assert_eq!(stored[0].code_hmac, code_hmac(fx.config.code_secret(), &issued.plain.code));
        assert_eq!(stored[0].issuer, Some(Issuer::User(actor.user_id)));
        assert_eq!(stored[0].expires_at - stored[0].created_at, fx.realm.code_duration);

        let stats = fx
            .repo
            .list_stats(&fx.realm.id, Utc::now().date_naive())
            .await
            .unwrap();
        assert_eq!(stats[0].codes_issued, 1);
    }

    #[tokio::test]
    async fn test_issue_requires_permission() {
        let fx = Fixture::new().await;
        let viewer = member_actor(&fx.realms, fx.realm.id, Permissions::CODE_READ).await;

        let result = use_case(&fx)
            .execute(Caller::Session(&viewer), confirmed())
            .await;
        assert!(matches!(
            result,
            Err(VerificationError::Realm(RealmError::PermissionDenied(_)))
        ));
    }

    #[tokio::test]
    async fn test_issue_by_admin_key() {
        let fx = Fixture::new().await;
        let app = fx.app(ApiKeyType::Admin);

        let issued = use_case(&fx).execute(Caller::App(&app), confirmed()).await.unwrap();
        assert_eq!(issued.code.issuer, Some(Issuer::App(app.id)));

        let device = fx.app(ApiKeyType::Device);
        assert!(matches!(
            use_case(&fx).execute(Caller::App(&device), confirmed()).await,
            Err(VerificationError::Realm(RealmError::WrongApiKeyType))
        ));
    }

    #[tokio::test]
    async fn test_issue_rejects_disallowed_test_type() {
        let mut fx = Fixture::new().await;
        fx.update_realm(|r| r.allowed_test_types = TestTypes::from(TestType::Confirmed))
            .await;
        let app = fx.app(ApiKeyType::Admin);

        let input = IssueCodeInput {
            test_type: Some(TestType::Negative),
            ..Default::default()
        };
        let err = use_case(&fx).execute(Caller::App(&app), input).await.unwrap_err();
        assert!(err.to_string().contains("not allowed"));
    }

    #[tokio::test]
    async fn test_issue_date_rules() {
        let mut fx = Fixture::new().await;
        fx.update_realm(|r| r.require_date = true).await;
        let app = fx.app(ApiKeyType::Admin);

        let err = use_case(&fx)
            .execute(Caller::App(&app), confirmed())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("required"));

        let old = (Utc::now() - chrono::Duration::days(20)).date_naive();
        let input = IssueCodeInput {
            symptom_date: Some(old.to_string()),
            ..confirmed()
        };
        let err = use_case(&fx).execute(Caller::App(&app), input).await.unwrap_err();
        assert!(err.to_string().contains("symptomDate"));

        let today = Utc::now().date_naive();
        let input = IssueCodeInput {
            test_date: Some(today.to_string()),
            ..confirmed()
        };
        let issued = use_case(&fx).execute(Caller::App(&app), input).await.unwrap();
        assert_eq!(issued.code.test_date, Some(today));
    }

    #[tokio::test]
    async fn test_issue_duplicate_uuid() {
        let fx = Fixture::new().await;
        let app = fx.app(ApiKeyType::Admin);
        let uuid = Uuid::new_v4();
        let input = IssueCodeInput {
            uuid: Some(uuid),
            ..confirmed()
        };

        use_case(&fx).execute(Caller::App(&app), input.clone()).await.unwrap();
        assert!(matches!(
            use_case(&fx).execute(Caller::App(&app), input).await,
            Err(VerificationError::DuplicateUuid)
        ));
    }

    #[tokio::test]
    async fn test_issue_with_phone() {
        let fx = Fixture::new().await;
        let app = fx.app(ApiKeyType::Admin);
        let input = IssueCodeInput {
            phone: Some("+1 (555) 123-4567".into()),
            ..confirmed()
        };

        // No provider configured
        assert!(matches!(
            use_case(&fx).execute(Caller::App(&app), input.clone()).await,
            Err(VerificationError::Realm(RealmError::ProviderNotConfigured(_)))
        ));
        assert!(fx.repo.codes().await.is_empty());

        configure_sms(&fx.realms, fx.realm.id, ProviderKind::Noop, "").await;
        let issued = use_case(&fx).execute(Caller::App(&app), input).await.unwrap();
        assert!(issued.code.phone_provided);

        let bad_phone = IssueCodeInput {
            phone: Some("555-1234".into()),
            ..confirmed()
        };
        assert!(matches!(
            use_case(&fx).execute(Caller::App(&app), bad_phone).await,
            Err(VerificationError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_sms_failure_expires_code() {
        let fx = Fixture::new().await;
        configure_sms(&fx.realms, fx.realm.id, ProviderKind::Webhook, "http://127.0.0.1:9/sms").await;
        let app = fx.app(ApiKeyType::Admin);
        let input = IssueCodeInput {
            phone: Some("+15551234567".into()),
            ..confirmed()
        };

        let result = use_case(&fx).execute(Caller::App(&app), input).await;
        assert!(matches!(
            result,
            Err(VerificationError::Realm(RealmError::Provider(_)))
        ));

        let stored = fx.repo.codes().await;
        assert_eq!(stored.len(), 1);
        assert!(stored[0].is_fully_expired(Utc::now()));
        let found = fx
            .repo
            .find_code_by_uuid(&fx.realm.id, &stored[0].uuid)
            .await
            .unwrap();
        assert!(found.is_some());
    }
}
