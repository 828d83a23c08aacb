//! Realm Settings Use Case
//!
//! Reads and partially updates realm settings. Every changed field is
//! audited separately.

use std::sync::Arc;

use kernel::actor::SessionActor;
use kernel::id::RealmId;

use crate::application::audit::record;
use crate::application::authorize::{authorize, selected_realm};
use crate::domain::entity::{Realm, RealmSettingsPatch};
use crate::domain::repository::{
    AuditRepository, MembershipRepository, ProviderConfigRepository, RealmRepository,
};
use crate::domain::value_object::Permissions;
use crate::error::{RealmError, RealmResult};

pub struct RealmSettingsUseCase<R>
where
    R: RealmRepository + MembershipRepository + ProviderConfigRepository + AuditRepository,
{
    repo: Arc<R>,
}

impl<R> RealmSettingsUseCase<R>
where
    R: RealmRepository + MembershipRepository + ProviderConfigRepository + AuditRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Settings of the actor's selected realm
    pub async fn get(&self, actor: &SessionActor) -> RealmResult<Realm> {
        let realm_id = selected_realm(actor)?;
        authorize(self.repo.as_ref(), actor, &realm_id, Permissions::SETTINGS_READ).await?;
        self.load(&realm_id).await
    }

    pub async fn update(
        &self,
        actor: &SessionActor,
        patch: &RealmSettingsPatch,
    ) -> RealmResult<Realm> {
        let realm_id = selected_realm(actor)?;
        self.update_realm(actor, &realm_id, patch).await
    }

    /// Apply `patch` to any realm the actor may write settings for
    ///
    /// The `can_use_system_*` switches are reserved to system admins.
    pub async fn update_realm(
        &self,
        actor: &SessionActor,
        realm_id: &RealmId,
        patch: &RealmSettingsPatch,
    ) -> RealmResult<Realm> {
        authorize(self.repo.as_ref(), actor, realm_id, Permissions::SETTINGS_WRITE).await?;
        if patch.touches_system_settings() && !actor.system_admin {
            return Err(RealmError::SystemAdminRequired);
        }

        if let Some(number_id) = patch.sms_from_number_id {
            let known = self
                .repo
                .list_sms_from_numbers()
                .await?
                .iter()
                .any(|n| n.id == number_id);
            if !known {
                return Err(RealmError::Validation("unknown SMS from number".to_string()));
            }
        }

        let mut realm = self.load(realm_id).await?;
        let changed = realm.apply(patch).map_err(RealmError::Validation)?;
        if changed.is_empty() {
            return Ok(realm);
        }

        self.repo.update_realm(&realm).await?;

        for field in &changed {
            record(
                self.repo.as_ref(),
                Some(realm.id),
                actor,
                &format!("updated {field}"),
                realm.id,
                &realm.name,
            )
            .await?;
        }

        tracing::info!(
            realm_id = %realm.id,
            user_id = %actor.user_id,
            changed = changed.len(),
            "Realm settings updated"
        );
        Ok(realm)
    }

    async fn load(&self, realm_id: &RealmId) -> RealmResult<Realm> {
        self.repo
            .find_realm(realm_id)
            .await?
            .ok_or(RealmError::NotFound("Realm"))
    }
}
