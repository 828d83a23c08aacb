//! Shared fixtures for use case tests

use std::sync::Arc;

use chrono::Utc;
use kernel::actor::SessionActor;
use kernel::id::{RealmId, UserId};
use realm::RealmConfig;
use realm::models::{
    ApiKeyType, AuthorizedApp, Membership, Permissions, ProviderKind, Realm, SmsConfig,
};
use realm::store::{MemoryRealmRepository, MembershipRepository, ProviderConfigRepository, RealmRepository};
use uuid::Uuid;

use crate::application::config::VerificationConfig;
use crate::infra::memory::MemoryVerificationRepository;

pub async fn realm_store() -> (Arc<MemoryRealmRepository>, Realm) {
    let realms = Arc::new(MemoryRealmRepository::new());
    let realm = Realm::new("Example Health");
    realms.create_realm(&realm).await.unwrap();
    (realms, realm)
}

pub async fn member_actor(
    realms: &MemoryRealmRepository,
    realm_id: RealmId,
    permissions: Permissions,
) -> SessionActor {
    let actor = SessionActor {
        user_id: UserId::new(),
        session_id: Uuid::new_v4(),
        email: "tracer@example.com".into(),
        name: "Tracer".into(),
        system_admin: false,
        realm_id: Some(realm_id),
    };
    realms
        .upsert_membership(&Membership::new(realm_id, actor.user_id, permissions))
        .await
        .unwrap();
    actor
}

pub async fn admin_actor(realms: &MemoryRealmRepository, realm_id: RealmId) -> SessionActor {
    member_actor(realms, realm_id, Permissions::admin()).await
}

pub fn app_with_type(realm_id: RealmId, api_key_type: ApiKeyType) -> AuthorizedApp {
    AuthorizedApp::new(
        realm_id,
        format!("{api_key_type} app"),
        api_key_type,
        "hmac".to_string(),
        "abcdef".to_string(),
    )
}

/// Realm SMS through the given provider
pub async fn configure_sms(realms: &MemoryRealmRepository, realm_id: RealmId, provider: ProviderKind, url: &str) {
    realms
        .upsert_sms_config(&SmsConfig {
            realm_id: Some(realm_id),
            provider,
            webhook_url: url.to_string(),
            auth_token: "token".to_string(),
            from_number: "+15550000000".to_string(),
            updated_at: Utc::now(),
        })
        .await
        .unwrap();
}

pub struct Fixture {
    pub repo: Arc<MemoryVerificationRepository>,
    pub realms: Arc<MemoryRealmRepository>,
    pub config: Arc<VerificationConfig>,
    pub realm_config: Arc<RealmConfig>,
    pub realm: Realm,
}

impl Fixture {
    pub async fn new() -> Self {
        let (realms, realm) = realm_store().await;
        Self {
            repo: Arc::new(MemoryVerificationRepository::new()),
            realms,
            config: Arc::new(VerificationConfig::with_random_secret()),
            realm_config: Arc::new(RealmConfig::with_random_secret()),
            realm,
        }
    }

    pub async fn update_realm(&mut self, change: impl FnOnce(&mut Realm)) {
        change(&mut self.realm);
        self.realms.update_realm(&self.realm).await.unwrap();
    }

    pub fn app(&self, api_key_type: ApiKeyType) -> AuthorizedApp {
        app_with_type(self.realm.id, api_key_type)
    }
}
