//! SMS and Email Provider Configuration Use Case
//!
//! Realm and system-level provider settings, and the resolution of the
//! provider a realm actually sends through.

use std::sync::Arc;

use chrono::Utc;
use kernel::actor::SessionActor;
use kernel::id::RealmId;
use platform::notify::{EmailProvider, SmsProvider, Webhook, normalize_phone};
use serde::Deserialize;
use uuid::Uuid;

use crate::application::audit::record;
use crate::application::authorize::{authorize, require_system_admin, selected_realm};
use crate::application::config::RealmConfig;
use crate::domain::entity::{EmailConfig, ProviderKind, Realm, SmsConfig, SmsFromNumber};
use crate::domain::repository::{AuditRepository, MembershipRepository, ProviderConfigRepository};
use crate::domain::value_object::Permissions;
use crate::error::{RealmError, RealmResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsConfigInput {
    pub provider: ProviderKind,
    #[serde(default)]
    pub webhook_url: String,
    /// `None` keeps the stored token
    pub auth_token: Option<String>,
    #[serde(default)]
    pub from_number: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailConfigInput {
    pub provider: ProviderKind,
    #[serde(default)]
    pub webhook_url: String,
    pub auth_token: Option<String>,
    pub from_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FromNumberInput {
    /// Existing numbers keep their id so realms stay attached
    pub id: Option<Uuid>,
    pub label: String,
    pub value: String,
}

/// SMS provider a realm sends through
#[derive(Debug, Clone)]
pub struct ResolvedSms {
    pub provider: SmsProvider,
    pub from: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedEmail {
    pub provider: EmailProvider,
    pub from: String,
}

fn webhook(client: &reqwest::Client, url: &str, token: &str) -> RealmResult<Webhook> {
    Ok(Webhook::new(client.clone(), url, token)?)
}

fn build_sms_provider(config: &SmsConfig, client: &reqwest::Client) -> RealmResult<SmsProvider> {
    Ok(match config.provider {
        ProviderKind::Noop => SmsProvider::Noop,
        ProviderKind::Webhook => {
            SmsProvider::Webhook(webhook(client, &config.webhook_url, &config.auth_token)?)
        }
    })
}

fn build_email_provider(
    config: &EmailConfig,
    client: &reqwest::Client,
) -> RealmResult<EmailProvider> {
    Ok(match config.provider {
        ProviderKind::Noop => EmailProvider::Noop,
        ProviderKind::Webhook => {
            EmailProvider::Webhook(webhook(client, &config.webhook_url, &config.auth_token)?)
        }
    })
}

/// SMS provider for a realm, or `None` when nothing is configured
///
/// The system configuration is used only when the realm opted in and is
/// allowed to.
pub async fn resolve_sms_provider<R>(
    repo: &R,
    client: &reqwest::Client,
    realm: &Realm,
) -> RealmResult<Option<ResolvedSms>>
where
    R: ProviderConfigRepository,
{
    if realm.sends_sms_through_system() {
        let Some(config) = repo.find_sms_config(None).await? else {
            return Ok(None);
        };
        let numbers = repo.list_sms_from_numbers().await?;
        let from = realm
            .sms_from_number_id
            .and_then(|id| numbers.iter().find(|n| n.id == id))
            .or(numbers.first())
            .map(|n| n.value.clone());
        return Ok(Some(ResolvedSms {
            provider: build_sms_provider(&config, client)?,
            from,
        }));
    }

    match repo.find_sms_config(Some(&realm.id)).await? {
        Some(config) => Ok(Some(ResolvedSms {
            provider: build_sms_provider(&config, client)?,
            from: Some(config.from_number.clone()).filter(|n| !n.is_empty()),
        })),
        None => Ok(None),
    }
}

/// Email provider for a realm, or the system provider when `realm` is `None`
pub async fn resolve_email_provider<R>(
    repo: &R,
    client: &reqwest::Client,
    realm: Option<&Realm>,
) -> RealmResult<Option<ResolvedEmail>>
where
    R: ProviderConfigRepository,
{
    let scope = match realm {
        Some(realm) if !realm.sends_email_through_system() => Some(&realm.id),
        _ => None,
    };
    match repo.find_email_config(scope).await? {
        Some(config) => Ok(Some(ResolvedEmail {
            provider: build_email_provider(&config, client)?,
            from: config.from_address.clone(),
        })),
        None => Ok(None),
    }
}

pub struct ProviderConfigUseCase<R>
where
    R: ProviderConfigRepository + MembershipRepository + AuditRepository,
{
    repo: Arc<R>,
    config: Arc<RealmConfig>,
}

impl<R> ProviderConfigUseCase<R>
where
    R: ProviderConfigRepository + MembershipRepository + AuditRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<RealmConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn realm_sms(&self, actor: &SessionActor) -> RealmResult<Option<SmsConfig>> {
        let realm_id = selected_realm(actor)?;
        authorize(self.repo.as_ref(), actor, &realm_id, Permissions::SETTINGS_READ).await?;
        self.repo.find_sms_config(Some(&realm_id)).await
    }

    pub async fn update_realm_sms(
        &self,
        actor: &SessionActor,
        input: SmsConfigInput,
    ) -> RealmResult<SmsConfig> {
        let realm_id = selected_realm(actor)?;
        authorize(self.repo.as_ref(), actor, &realm_id, Permissions::SETTINGS_WRITE).await?;
        self.save_sms(actor, Some(realm_id), input).await
    }

    pub async fn realm_email(&self, actor: &SessionActor) -> RealmResult<Option<EmailConfig>> {
        let realm_id = selected_realm(actor)?;
        authorize(self.repo.as_ref(), actor, &realm_id, Permissions::SETTINGS_READ).await?;
        self.repo.find_email_config(Some(&realm_id)).await
    }

    pub async fn update_realm_email(
        &self,
        actor: &SessionActor,
        input: EmailConfigInput,
    ) -> RealmResult<EmailConfig> {
        let realm_id = selected_realm(actor)?;
        authorize(self.repo.as_ref(), actor, &realm_id, Permissions::SETTINGS_WRITE).await?;
        self.save_email(actor, Some(realm_id), input).await
    }

    pub async fn system_sms(
        &self,
        actor: &SessionActor,
    ) -> RealmResult<(Option<SmsConfig>, Vec<SmsFromNumber>)> {
        require_system_admin(actor)?;
        let config = self.repo.find_sms_config(None).await?;
        let numbers = self.repo.list_sms_from_numbers().await?;
        Ok((config, numbers))
    }

    pub async fn update_system_sms(
        &self,
        actor: &SessionActor,
        input: SmsConfigInput,
    ) -> RealmResult<SmsConfig> {
        require_system_admin(actor)?;
        self.save_sms(actor, None, input).await
    }

    /// Replace the system list of SMS sender numbers
    pub async fn set_sms_from_numbers(
        &self,
        actor: &SessionActor,
        input: Vec<FromNumberInput>,
    ) -> RealmResult<Vec<SmsFromNumber>> {
        require_system_admin(actor)?;

        let mut numbers = Vec::with_capacity(input.len());
        for n in input {
            let number = SmsFromNumber {
                id: n.id.unwrap_or_else(Uuid::new_v4),
                label: n.label.trim().to_string(),
                value: normalize_phone(&n.value).unwrap_or(n.value),
            };
            number.validate().map_err(RealmError::Validation)?;
            numbers.push(number);
        }
        self.repo.replace_sms_from_numbers(&numbers).await?;

        record(
            self.repo.as_ref(),
            None,
            actor,
            "updated SMS from numbers",
            "system",
            format!("{} numbers", numbers.len()),
        )
        .await?;
        Ok(numbers)
    }

    pub async fn system_email(&self, actor: &SessionActor) -> RealmResult<Option<EmailConfig>> {
        require_system_admin(actor)?;
        self.repo.find_email_config(None).await
    }

    pub async fn update_system_email(
        &self,
        actor: &SessionActor,
        input: EmailConfigInput,
    ) -> RealmResult<EmailConfig> {
        require_system_admin(actor)?;
        self.save_email(actor, None, input).await
    }

    pub async fn resolve_sms(&self, realm: &Realm) -> RealmResult<Option<ResolvedSms>> {
        resolve_sms_provider(self.repo.as_ref(), &self.config.http_client, realm).await
    }

    pub async fn resolve_email(&self, realm: Option<&Realm>) -> RealmResult<Option<ResolvedEmail>> {
        resolve_email_provider(self.repo.as_ref(), &self.config.http_client, realm).await
    }

    async fn save_sms(
        &self,
        actor: &SessionActor,
        realm_id: Option<RealmId>,
        input: SmsConfigInput,
    ) -> RealmResult<SmsConfig> {
        let existing = self.repo.find_sms_config(realm_id.as_ref()).await?;
        let auth_token = input
            .auth_token
            .or_else(|| existing.map(|c| c.auth_token))
            .unwrap_or_default();
        let from_number = if input.from_number.trim().is_empty() {
            String::new()
        } else {
            normalize_phone(&input.from_number).unwrap_or(input.from_number)
        };

        let config = SmsConfig {
            realm_id,
            provider: input.provider,
            webhook_url: input.webhook_url.trim().to_string(),
            auth_token,
            from_number,
            updated_at: Utc::now(),
        };
        config.validate().map_err(RealmError::Validation)?;
        self.repo.upsert_sms_config(&config).await?;

        record(
            self.repo.as_ref(),
            realm_id,
            actor,
            "updated SMS configuration",
            scope_id(realm_id),
            config.provider.as_str(),
        )
        .await?;
        tracing::info!(realm_id = ?realm_id, provider = %config.provider, "SMS configuration saved");
        Ok(config)
    }

    async fn save_email(
        &self,
        actor: &SessionActor,
        realm_id: Option<RealmId>,
        input: EmailConfigInput,
    ) -> RealmResult<EmailConfig> {
        let existing = self.repo.find_email_config(realm_id.as_ref()).await?;
        let auth_token = input
            .auth_token
            .or_else(|| existing.map(|c| c.auth_token))
            .unwrap_or_default();

        let config = EmailConfig {
            realm_id,
            provider: input.provider,
            webhook_url: input.webhook_url.trim().to_string(),
            auth_token,
            from_address: input.from_address.trim().to_string(),
            updated_at: Utc::now(),
        };
        config.validate().map_err(RealmError::Validation)?;
        self.repo.upsert_email_config(&config).await?;

        record(
            self.repo.as_ref(),
            realm_id,
            actor,
            "updated email configuration",
            scope_id(realm_id),
            config.provider.as_str(),
        )
        .await?;
        tracing::info!(realm_id = ?realm_id, provider = %config.provider, "Email configuration saved");
        Ok(config)
    }
}

fn scope_id(realm_id: Option<RealmId>) -> String {
    realm_id.map_or_else(|| "system".to_string(), |id| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Membership;
    use crate::infra::memory::MemoryRealmRepository;
    use kernel::id::UserId;

    fn actor(system_admin: bool, realm_id: RealmId) -> SessionActor {
        SessionActor {
            user_id: UserId::new(),
            session_id: Uuid::new_v4(),
            email: "a@example.com".into(),
            name: "A".into(),
            system_admin,
            realm_id: Some(realm_id),
        }
    }

    fn webhook_input(token: Option<&str>) -> SmsConfigInput {
        SmsConfigInput {
            provider: ProviderKind::Webhook,
            webhook_url: "https://sms.example.com/send".into(),
            auth_token: token.map(str::to_string),
            from_number: "+1 (555) 000-1111".into(),
        }
    }

    #[tokio::test]
    async fn test_realm_sms_keeps_token() {
        let repo = Arc::new(MemoryRealmRepository::new());
        let realm = Realm::new("R");
        let user = actor(false, realm.id);
        repo.upsert_membership(&Membership::new(realm.id, user.user_id, Permissions::SETTINGS_WRITE))
            .await
            .unwrap();
        let use_case = ProviderConfigUseCase::new(repo.clone(), Arc::new(RealmConfig::default()));

        let saved = use_case
            .update_realm_sms(&user, webhook_input(Some("t0ken")))
            .await
            .unwrap();
        assert_eq!(saved.from_number, "+15550001111");

        let saved = use_case
            .update_realm_sms(&user, webhook_input(None))
            .await
            .unwrap();
        assert_eq!(saved.auth_token, "t0ken");

        let resolved = use_case.resolve_sms(&realm).await.unwrap().unwrap();
        assert_eq!(resolved.provider.name(), "webhook");
        assert_eq!(resolved.from.as_deref(), Some("+15550001111"));

        assert!(use_case.update_system_sms(&user, webhook_input(None)).await.is_err());
    }

    #[tokio::test]
    async fn test_system_sms_requires_opt_in_and_permission() {
        let repo = Arc::new(MemoryRealmRepository::new());
        let mut realm = Realm::new("R");
        let admin = actor(true, realm.id);
        let use_case = ProviderConfigUseCase::new(repo.clone(), Arc::new(RealmConfig::default()));

        use_case
            .update_system_sms(
                &admin,
                SmsConfigInput {
                    provider: ProviderKind::Noop,
                    webhook_url: String::new(),
                    auth_token: None,
                    from_number: String::new(),
                },
            )
            .await
            .unwrap();
        let numbers = use_case
            .set_sms_from_numbers(
                &admin,
                vec![
                    FromNumberInput {
                        id: None,
                        label: "Main".into(),
                        value: "+15550000001".into(),
                    },
                    FromNumberInput {
                        id: None,
                        label: "Backup".into(),
                        value: "+15550000002".into(),
                    },
                ],
            )
            .await
            .unwrap();

        assert!(use_case.resolve_sms(&realm).await.unwrap().is_none());

        realm.use_system_sms_config = true;
        assert!(use_case.resolve_sms(&realm).await.unwrap().is_none());

        realm.can_use_system_sms_config = true;
        realm.sms_from_number_id = Some(numbers[1].id);
        let resolved = use_case.resolve_sms(&realm).await.unwrap().unwrap();
        assert_eq!(resolved.provider.name(), "noop");
        assert_eq!(resolved.from.as_deref(), Some("+15550000002"));
    }

    #[tokio::test]
    async fn test_email_resolution() {
        let repo = Arc::new(MemoryRealmRepository::new());
        let realm = Realm::new("R");
        let admin = actor(true, realm.id);
        let use_case = ProviderConfigUseCase::new(repo, Arc::new(RealmConfig::default()));

        assert!(use_case.resolve_email(None).await.unwrap().is_none());
        use_case
            .update_system_email(
                &admin,
                EmailConfigInput {
                    provider: ProviderKind::Noop,
                    webhook_url: String::new(),
                    auth_token: None,
                    from_address: "noreply@example.com".into(),
                },
            )
            .await
            .unwrap();
        let system = use_case.resolve_email(None).await.unwrap().unwrap();
        assert_eq!(system.from, "noreply@example.com");
        assert!(use_case.resolve_email(Some(&realm)).await.unwrap().is_none());

        let bad = EmailConfigInput {
            provider: ProviderKind::Noop,
            webhook_url: String::new(),
            auth_token: None,
            from_address: "not-an-address".into(),
        };
        assert!(matches!(
            use_case.update_realm_email(&admin, bad).await,
            Err(RealmError::Validation(_))
        ));
    }
}
