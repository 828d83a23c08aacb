//! In-memory realm store for tests

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::{AuthorizedAppId, MobileAppId, RealmId, SigningKeyId, UserId};
use tokio::sync::Mutex;

use crate::domain::entity::{
    AuditEntry, AuthorizedApp, EmailConfig, Membership, MobileApp, Realm, SigningKey, SmsConfig,
    SmsFromNumber,
};
use crate::domain::repository::{
    AuditRepository, AuthorizedAppRepository, MembershipRepository, MobileAppRepository,
    ProviderConfigRepository, RealmRepository, SigningKeyRepository,
};
use crate::error::{RealmError, RealmResult};

#[derive(Default)]
struct State {
    realms: HashMap<RealmId, Realm>,
    memberships: HashMap<(RealmId, UserId), Membership>,
    apps: HashMap<AuthorizedAppId, AuthorizedApp>,
    mobile_apps: HashMap<MobileAppId, MobileApp>,
    sms_configs: HashMap<Option<RealmId>, SmsConfig>,
    email_configs: HashMap<Option<RealmId>, EmailConfig>,
    from_numbers: Vec<SmsFromNumber>,
    audit: Vec<AuditEntry>,
    signing_keys: Vec<SigningKey>,
}

/// Keeps everything in process memory; clones share state
#[derive(Clone, Default)]
pub struct MemoryRealmRepository {
    state: Arc<Mutex<State>>,
}

impl MemoryRealmRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Audit entries in insertion order
    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.state.lock().await.audit.clone()
    }
}

impl RealmRepository for MemoryRealmRepository {
    async fn create_realm(&self, realm: &Realm) -> RealmResult<()> {
        let mut state = self.state.lock().await;
        if state.realms.values().any(|r| r.name == realm.name) {
            return Err(RealmError::Conflict("realm name is already taken".into()));
        }
        state.realms.insert(realm.id, realm.clone());
        Ok(())
    }

    async fn find_realm(&self, realm_id: &RealmId) -> RealmResult<Option<Realm>> {
        Ok(self.state.lock().await.realms.get(realm_id).cloned())
    }

    async fn list_realms(&self) -> RealmResult<Vec<Realm>> {
        let mut realms: Vec<Realm> = self.state.lock().await.realms.values().cloned().collect();
        realms.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(realms)
    }

    async fn update_realm(&self, realm: &Realm) -> RealmResult<()> {
        let mut state = self.state.lock().await;
        if state
            .realms
            .values()
            .any(|r| r.id != realm.id && r.name == realm.name)
        {
            return Err(RealmError::Conflict("realm name is already taken".into()));
        }
        state.realms.insert(realm.id, realm.clone());
        Ok(())
    }
}

impl MembershipRepository for MemoryRealmRepository {
    async fn find_membership(
        &self,
        realm_id: &RealmId,
        user_id: &UserId,
    ) -> RealmResult<Option<Membership>> {
        Ok(self
            .state
            .lock()
            .await
            .memberships
            .get(&(*realm_id, *user_id))
            .cloned())
    }

    async fn list_memberships_for_user(&self, user_id: &UserId) -> RealmResult<Vec<Membership>> {
        Ok(self
            .state
            .lock()
            .await
            .memberships
            .values()
            .filter(|m| &m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_memberships_for_realm(&self, realm_id: &RealmId) -> RealmResult<Vec<Membership>> {
        let mut memberships: Vec<Membership> = self
            .state
            .lock()
            .await
            .memberships
            .values()
            .filter(|m| &m.realm_id == realm_id)
            .cloned()
            .collect();
        memberships.sort_by_key(|m| m.created_at);
        Ok(memberships)
    }

    async fn upsert_membership(&self, membership: &Membership) -> RealmResult<()> {
        self.state
            .lock()
            .await
            .memberships
            .insert((membership.realm_id, membership.user_id), membership.clone());
        Ok(())
    }

    async fn delete_membership(&self, realm_id: &RealmId, user_id: &UserId) -> RealmResult<bool> {
        Ok(self
            .state
            .lock()
            .await
            .memberships
            .remove(&(*realm_id, *user_id))
            .is_some())
    }
}

impl AuthorizedAppRepository for MemoryRealmRepository {
    async fn create_app(&self, app: &AuthorizedApp) -> RealmResult<()> {
        let mut state = self.state.lock().await;
        if state
            .apps
            .values()
            .any(|a| a.realm_id == app.realm_id && a.name == app.name)
        {
            return Err(RealmError::Conflict("an API key with this name exists".into()));
        }
        state.apps.insert(app.id, app.clone());
        Ok(())
    }

    async fn find_app(
        &self,
        realm_id: &RealmId,
        app_id: &AuthorizedAppId,
    ) -> RealmResult<Option<AuthorizedApp>> {
        Ok(self
            .state
            .lock()
            .await
            .apps
            .get(app_id)
            .filter(|a| &a.realm_id == realm_id)
            .cloned())
    }

    async fn find_app_by_hmac(&self, api_key_hmac: &str) -> RealmResult<Option<AuthorizedApp>> {
        Ok(self
            .state
            .lock()
            .await
            .apps
            .values()
            .find(|a| a.api_key_hmac == api_key_hmac)
            .cloned())
    }

    async fn list_apps(&self, realm_id: &RealmId) -> RealmResult<Vec<AuthorizedApp>> {
        let mut apps: Vec<AuthorizedApp> = self
            .state
            .lock()
            .await
            .apps
            .values()
            .filter(|a| &a.realm_id == realm_id)
            .cloned()
            .collect();
        apps.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(apps)
    }

    async fn update_app(&self, app: &AuthorizedApp) -> RealmResult<()> {
        self.state.lock().await.apps.insert(app.id, app.clone());
        Ok(())
    }
}

impl MobileAppRepository for MemoryRealmRepository {
    async fn create_mobile_app(&self, app: &MobileApp) -> RealmResult<()> {
        self.state
            .lock()
            .await
            .mobile_apps
            .insert(app.id, app.clone());
        Ok(())
    }

    async fn find_mobile_app(
        &self,
        realm_id: &RealmId,
        app_id: &MobileAppId,
    ) -> RealmResult<Option<MobileApp>> {
        Ok(self
            .state
            .lock()
            .await
            .mobile_apps
            .get(app_id)
            .filter(|a| &a.realm_id == realm_id)
            .cloned())
    }

    async fn list_mobile_apps(&self, realm_id: &RealmId) -> RealmResult<Vec<MobileApp>> {
        let mut apps: Vec<MobileApp> = self
            .state
            .lock()
            .await
            .mobile_apps
            .values()
            .filter(|a| &a.realm_id == realm_id)
            .cloned()
            .collect();
        apps.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(apps)
    }

    async fn update_mobile_app(&self, app: &MobileApp) -> RealmResult<()> {
        self.state
            .lock()
            .await
            .mobile_apps
            .insert(app.id, app.clone());
        Ok(())
    }
}

impl ProviderConfigRepository for MemoryRealmRepository {
    async fn find_sms_config(&self, realm_id: Option<&RealmId>) -> RealmResult<Option<SmsConfig>> {
        Ok(self
            .state
            .lock()
            .await
            .sms_configs
            .get(&realm_id.copied())
            .cloned())
    }

    async fn upsert_sms_config(&self, config: &SmsConfig) -> RealmResult<()> {
        self.state
            .lock()
            .await
            .sms_configs
            .insert(config.realm_id, config.clone());
        Ok(())
    }

    async fn find_email_config(
        &self,
        realm_id: Option<&RealmId>,
    ) -> RealmResult<Option<EmailConfig>> {
        Ok(self
            .state
            .lock()
            .await
            .email_configs
            .get(&realm_id.copied())
            .cloned())
    }

    async fn upsert_email_config(&self, config: &EmailConfig) -> RealmResult<()> {
        self.state
            .lock()
            .await
            .email_configs
            .insert(config.realm_id, config.clone());
        Ok(())
    }

    async fn list_sms_from_numbers(&self) -> RealmResult<Vec<SmsFromNumber>> {
        Ok(self.state.lock().await.from_numbers.clone())
    }

    async fn replace_sms_from_numbers(&self, numbers: &[SmsFromNumber]) -> RealmResult<()> {
        self.state.lock().await.from_numbers = numbers.to_vec();
        Ok(())
    }
}

impl AuditRepository for MemoryRealmRepository {
    async fn record_audit(&self, entry: &AuditEntry) -> RealmResult<()> {
        self.state.lock().await.audit.push(entry.clone());
        Ok(())
    }

    async fn list_audit(
        &self,
        realm_id: Option<&RealmId>,
        limit: u32,
        offset: u32,
    ) -> RealmResult<Vec<AuditEntry>> {
        let state = self.state.lock().await;
        Ok(state
            .audit
            .iter()
            .rev()
            .filter(|e| e.realm_id.as_ref() == realm_id)
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn purge_audit_before(&self, before: DateTime<Utc>) -> RealmResult<u64> {
        let mut state = self.state.lock().await;
        let count = state.audit.len();
        state.audit.retain(|e| e.created_at >= before);
        Ok((count - state.audit.len()) as u64)
    }
}

impl SigningKeyRepository for MemoryRealmRepository {
    async fn list_signing_keys(&self, realm_id: &RealmId) -> RealmResult<Vec<SigningKey>> {
        Ok(self
            .state
            .lock()
            .await
            .signing_keys
            .iter()
            .filter(|k| &k.realm_id == realm_id && k.is_live())
            .cloned()
            .collect())
    }

    async fn create_signing_key(&self, key: &SigningKey) -> RealmResult<()> {
        self.state.lock().await.signing_keys.push(key.clone());
        Ok(())
    }

    async fn activate_signing_key(
        &self,
        realm_id: &RealmId,
        key_id: &SigningKeyId,
    ) -> RealmResult<bool> {
        let mut state = self.state.lock().await;
        let exists = state
            .signing_keys
            .iter()
            .any(|k| &k.realm_id == realm_id && &k.id == key_id && k.is_live());
        if !exists {
            return Ok(false);
        }
        for key in state
            .signing_keys
            .iter_mut()
            .filter(|k| &k.realm_id == realm_id)
        {
            key.active = &key.id == key_id;
        }
        Ok(true)
    }

    async fn delete_signing_key(
        &self,
        realm_id: &RealmId,
        key_id: &SigningKeyId,
    ) -> RealmResult<bool> {
        let mut state = self.state.lock().await;
        match state
            .signing_keys
            .iter_mut()
            .find(|k| &k.realm_id == realm_id && &k.id == key_id && k.is_live())
        {
            Some(key) => {
                key.deleted_at = Some(Utc::now());
                key.active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
