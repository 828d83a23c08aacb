//! Realm Administration Use Case
//!
//! System administrators create and browse realms.

use std::sync::Arc;

use kernel::actor::SessionActor;
use kernel::id::RealmId;

use crate::application::audit::record;
use crate::application::authorize::require_system_admin;
use crate::domain::entity::{Realm, SigningKey};
use crate::domain::repository::{AuditRepository, RealmRepository, SigningKeyRepository};
use crate::error::{RealmError, RealmResult};

pub struct RealmAdminUseCase<R>
where
    R: RealmRepository + SigningKeyRepository + AuditRepository,
{
    repo: Arc<R>,
}

impl<R> RealmAdminUseCase<R>
where
    R: RealmRepository + SigningKeyRepository + AuditRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Create a realm with default settings and its first signing key
    pub async fn create(&self, actor: &SessionActor, name: &str) -> RealmResult<Realm> {
        require_system_admin(actor)?;

        let realm = Realm::new(name);
        realm.validate().map_err(RealmError::Validation)?;
        self.repo.create_realm(&realm).await?;

        let key = SigningKey::generate(realm.id, true);
        self.repo.create_signing_key(&key).await?;

        record(
            self.repo.as_ref(),
            None,
            actor,
            "created realm",
            realm.id,
            &realm.name,
        )
        .await?;

        tracing::info!(realm_id = %realm.id, name = %realm.name, "Realm created");
        Ok(realm)
    }

    pub async fn list(&self, actor: &SessionActor) -> RealmResult<Vec<Realm>> {
        require_system_admin(actor)?;
        self.repo.list_realms().await
    }

    pub async fn get(&self, actor: &SessionActor, realm_id: &RealmId) -> RealmResult<Realm> {
        require_system_admin(actor)?;
        self.repo
            .find_realm(realm_id)
            .await?
            .ok_or(RealmError::NotFound("Realm"))
    }
}
