//! API Key Use Case
//!
//! Issues, lists and toggles realm API keys, and resolves presented keys for
//! the API middleware.

use std::sync::Arc;

use kernel::actor::SessionActor;
use kernel::id::AuthorizedAppId;
use platform::cache::TtlCache;

use crate::application::audit::record;
use crate::application::authorize::{authorize, selected_realm};
use crate::application::config::RealmConfig;
use crate::domain::entity::AuthorizedApp;
use crate::domain::repository::{AuditRepository, AuthorizedAppRepository, MembershipRepository};
use crate::domain::value_object::api_key::{generate_api_key, verify_api_key};
use crate::domain::value_object::{ApiKeyType, Permissions};
use crate::error::{RealmError, RealmResult};

/// Resolved apps keyed by stored key HMAC
pub type ApiKeyCache = TtlCache<String, AuthorizedApp>;

/// A new app and its key, which is never retrievable again
#[derive(Debug)]
pub struct CreatedApiKey {
    pub app: AuthorizedApp,
    pub api_key: String,
}

pub struct ApiKeyUseCase<R>
where
    R: AuthorizedAppRepository + MembershipRepository + AuditRepository,
{
    repo: Arc<R>,
    config: Arc<RealmConfig>,
    cache: Arc<ApiKeyCache>,
}

impl<R> ApiKeyUseCase<R>
where
    R: AuthorizedAppRepository + MembershipRepository + AuditRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<RealmConfig>, cache: Arc<ApiKeyCache>) -> Self {
        Self {
            repo,
            config,
            cache,
        }
    }

    pub async fn create(
        &self,
        actor: &SessionActor,
        name: &str,
        api_key_type: ApiKeyType,
    ) -> RealmResult<CreatedApiKey> {
        let realm_id = selected_realm(actor)?;
        authorize(self.repo.as_ref(), actor, &realm_id, Permissions::API_KEY_WRITE).await?;
        AuthorizedApp::validate_name(name).map_err(RealmError::Validation)?;

        let generated = generate_api_key(realm_id, self.config.api_key_secret());
        let app = AuthorizedApp::new(
            realm_id,
            name,
            api_key_type,
            generated.hmac.clone(),
            generated.preview.clone(),
        );
        self.repo.create_app(&app).await?;

        record(
            self.repo.as_ref(),
            Some(realm_id),
            actor,
            "created API key",
            app.id,
            app.display(),
        )
        .await?;

        tracing::info!(
            realm_id = %realm_id,
            app_id = %app.id,
            api_key_type = %api_key_type,
            "API key created"
        );
        Ok(CreatedApiKey {
            app,
            api_key: generated.full_key,
        })
    }

    pub async fn list(&self, actor: &SessionActor) -> RealmResult<Vec<AuthorizedApp>> {
        let realm_id = selected_realm(actor)?;
        authorize(self.repo.as_ref(), actor, &realm_id, Permissions::API_KEY_READ).await?;
        self.repo.list_apps(&realm_id).await
    }

    pub async fn get(
        &self,
        actor: &SessionActor,
        app_id: &AuthorizedAppId,
    ) -> RealmResult<AuthorizedApp> {
        let realm_id = selected_realm(actor)?;
        authorize(self.repo.as_ref(), actor, &realm_id, Permissions::API_KEY_READ).await?;
        self.repo
            .find_app(&realm_id, app_id)
            .await?
            .ok_or(RealmError::NotFound("API key"))
    }

    pub async fn disable(
        &self,
        actor: &SessionActor,
        app_id: &AuthorizedAppId,
    ) -> RealmResult<AuthorizedApp> {
        self.set_enabled(actor, app_id, false).await
    }

    pub async fn enable(
        &self,
        actor: &SessionActor,
        app_id: &AuthorizedAppId,
    ) -> RealmResult<AuthorizedApp> {
        self.set_enabled(actor, app_id, true).await
    }

    async fn set_enabled(
        &self,
        actor: &SessionActor,
        app_id: &AuthorizedAppId,
        enabled: bool,
    ) -> RealmResult<AuthorizedApp> {
        let realm_id = selected_realm(actor)?;
        authorize(self.repo.as_ref(), actor, &realm_id, Permissions::API_KEY_WRITE).await?;

        let mut app = self
            .repo
            .find_app(&realm_id, app_id)
            .await?
            .ok_or(RealmError::NotFound("API key"))?;
        if app.is_active() == enabled {
            return Ok(app);
        }

        if enabled {
            app.enable();
        } else {
            app.disable();
        }
        self.repo.update_app(&app).await?;
        self.cache.remove(&app.api_key_hmac).await;

        let action = if enabled {
            "enabled API key"
        } else {
            "disabled API key"
        };
        record(
            self.repo.as_ref(),
            Some(realm_id),
            actor,
            action,
            app.id,
            app.display(),
        )
        .await?;

        tracing::info!(realm_id = %realm_id, app_id = %app.id, enabled, "API key toggled");
        Ok(app)
    }

    /// Resolve a presented key to its active app
    ///
    /// Forged and malformed keys are rejected before touching the store.
    pub async fn lookup(&self, full_key: &str) -> RealmResult<AuthorizedApp> {
        let verified = verify_api_key(full_key, self.config.api_key_secret())
            .ok_or(RealmError::InvalidApiKey)?;

        let repo = self.repo.clone();
        let hmac = verified.hmac.clone();
        let app = self
            .cache
            .get_or_try_insert_with(verified.hmac, || async move {
                repo.find_app_by_hmac(&hmac)
                    .await?
                    .ok_or(RealmError::InvalidApiKey)
            })
            .await?;

        if app.realm_id != verified.realm_id {
            return Err(RealmError::InvalidApiKey);
        }
        if !app.is_active() {
            return Err(RealmError::ApiKeyDisabled);
        }
        Ok(app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Membership;
    use crate::infra::memory::MemoryRealmRepository;
    use kernel::id::{RealmId, UserId};
    use std::time::Duration;
    use uuid::Uuid;

    async fn setup() -> (ApiKeyUseCase<MemoryRealmRepository>, SessionActor) {
        let repo = Arc::new(MemoryRealmRepository::new());
        let realm_id = RealmId::new();
        let actor = SessionActor {
            user_id: UserId::new(),
            session_id: Uuid::new_v4(),
            email: "admin@example.com".into(),
            name: "Admin".into(),
            system_admin: false,
            realm_id: Some(realm_id),
        };
        repo.upsert_membership(&Membership::new(
            realm_id,
            actor.user_id,
            Permissions::API_KEY_WRITE,
        ))
        .await
        .unwrap();
        let use_case = ApiKeyUseCase::new(
            repo,
            Arc::new(RealmConfig::with_random_secret()),
            Arc::new(ApiKeyCache::new(Duration::from_secs(300))),
        );
        (use_case, actor)
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let (use_case, actor) = setup().await;
        let created = use_case
            .create(&actor, "Lab system", ApiKeyType::Admin)
            .await
            .unwrap();
        assert!(created.api_key.starts_with(&created.app.api_key_preview));

        let app = use_case.lookup(&created.api_key).await.unwrap();
        assert_eq!(app.id, created.app.id);
        assert_eq!(app.api_key_type, ApiKeyType::Admin);

        assert!(matches!(
            use_case.create(&actor, "Lab system", ApiKeyType::Device).await,
            Err(RealmError::Conflict(_))
        ));
        assert_eq!(use_case.list(&actor).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_disable_invalidates_cache() {
        let (use_case, actor) = setup().await;
        let created = use_case
            .create(&actor, "Device app", ApiKeyType::Device)
            .await
            .unwrap();
        use_case.lookup(&created.api_key).await.unwrap();

        use_case.disable(&actor, &created.app.id).await.unwrap();
        assert!(matches!(
            use_case.lookup(&created.api_key).await,
            Err(RealmError::ApiKeyDisabled)
        ));

        use_case.enable(&actor, &created.app.id).await.unwrap();
        assert!(use_case.lookup(&created.api_key).await.is_ok());
    }

    #[tokio::test]
    async fn test_rejects_forged_keys() {
        let (use_case, actor) = setup().await;
        let created = use_case
            .create(&actor, "Stats", ApiKeyType::Stats)
            .await
            .unwrap();

        let mut forged = created.api_key.clone();
        forged.pop();
        forged.push(if created.api_key.ends_with('A') { 'B' } else { 'A' });
        assert!(matches!(
            use_case.lookup(&forged).await,
            Err(RealmError::InvalidApiKey)
        ));
        assert!(matches!(
            use_case.lookup("not-a-key").await,
            Err(RealmError::InvalidApiKey)
        ));

        // Well-formed and signed, but never stored
        let other = generate_api_key(RealmId::new(), use_case.config.api_key_secret());
        assert!(matches!(
            use_case.lookup(&other.full_key).await,
            Err(RealmError::InvalidApiKey)
        ));
    }
}
