//! Signing Key Use Case
//!
//! Rotation of the per-realm keys that sign verification tokens and
//! certificates.

use std::sync::Arc;

use kernel::actor::SessionActor;
use kernel::id::{RealmId, SigningKeyId};

use crate::application::audit::record;
use crate::application::authorize::{authorize, selected_realm};
use crate::domain::entity::SigningKey;
use crate::domain::entity::signing_key::MAX_LIVE_KEYS;
use crate::domain::repository::{AuditRepository, MembershipRepository, SigningKeyRepository};
use crate::domain::value_object::Permissions;
use crate::error::{RealmError, RealmResult};

/// Active key of a realm, generating one when the realm has none
pub async fn active_key<R>(repo: &R, realm_id: &RealmId) -> RealmResult<SigningKey>
where
    R: SigningKeyRepository,
{
    let keys = repo.list_signing_keys(realm_id).await?;
    if let Some(key) = keys.iter().rev().find(|k| k.active) {
        return Ok(key.clone());
    }

    let key = SigningKey::generate(*realm_id, true);
    repo.create_signing_key(&key).await?;
    if !keys.is_empty() {
        repo.activate_signing_key(realm_id, &key.id).await?;
    }
    tracing::info!(realm_id = %realm_id, kid = %key.kid, "Generated realm signing key");
    Ok(key)
}

/// Live key with the given `kid`, active or not
pub async fn find_key<R>(repo: &R, realm_id: &RealmId, kid: &str) -> RealmResult<Option<SigningKey>>
where
    R: SigningKeyRepository,
{
    Ok(repo
        .list_signing_keys(realm_id)
        .await?
        .into_iter()
        .find(|k| k.kid == kid))
}

pub struct SigningKeyUseCase<R>
where
    R: SigningKeyRepository + MembershipRepository + AuditRepository,
{
    repo: Arc<R>,
}

impl<R> SigningKeyUseCase<R>
where
    R: SigningKeyRepository + MembershipRepository + AuditRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn list(&self, actor: &SessionActor) -> RealmResult<Vec<SigningKey>> {
        let realm_id = selected_realm(actor)?;
        authorize(self.repo.as_ref(), actor, &realm_id, Permissions::SETTINGS_READ).await?;
        self.repo.list_signing_keys(&realm_id).await
    }

    /// New key; it becomes active only when the realm has no other key
    pub async fn create(&self, actor: &SessionActor) -> RealmResult<SigningKey> {
        let realm_id = selected_realm(actor)?;
        authorize(self.repo.as_ref(), actor, &realm_id, Permissions::SETTINGS_WRITE).await?;

        let live = self.repo.list_signing_keys(&realm_id).await?;
        if live.len() >= MAX_LIVE_KEYS {
            return Err(RealmError::Validation(format!(
                "a realm can have at most {} signing keys",
                MAX_LIVE_KEYS
            )));
        }

        let key = SigningKey::generate(realm_id, live.is_empty());
        self.repo.create_signing_key(&key).await?;
        record(
            self.repo.as_ref(),
            Some(realm_id),
            actor,
            "created signing key",
            key.id,
            &key.kid,
        )
        .await?;

        tracing::info!(realm_id = %realm_id, kid = %key.kid, "Signing key created");
        Ok(key)
    }

    pub async fn activate(&self, actor: &SessionActor, key_id: &SigningKeyId) -> RealmResult<()> {
        let realm_id = selected_realm(actor)?;
        authorize(self.repo.as_ref(), actor, &realm_id, Permissions::SETTINGS_WRITE).await?;

        if !self.repo.activate_signing_key(&realm_id, key_id).await? {
            return Err(RealmError::NotFound("Signing key"));
        }
        record(
            self.repo.as_ref(),
            Some(realm_id),
            actor,
            "activated signing key",
            key_id,
            key_id.to_string(),
        )
        .await?;

        tracing::info!(realm_id = %realm_id, key_id = %key_id, "Signing key activated");
        Ok(())
    }

    /// Soft delete; the active key cannot be deleted
    pub async fn delete(&self, actor: &SessionActor, key_id: &SigningKeyId) -> RealmResult<()> {
        let realm_id = selected_realm(actor)?;
        authorize(self.repo.as_ref(), actor, &realm_id, Permissions::SETTINGS_WRITE).await?;

        let key = self
            .repo
            .list_signing_keys(&realm_id)
            .await?
            .into_iter()
            .find(|k| &k.id == key_id)
            .ok_or(RealmError::NotFound("Signing key"))?;
        if key.active {
            return Err(RealmError::Validation(
                "the active signing key cannot be deleted".to_string(),
            ));
        }

        if !self.repo.delete_signing_key(&realm_id, key_id).await? {
            return Err(RealmError::NotFound("Signing key"));
        }
        record(
            self.repo.as_ref(),
            Some(realm_id),
            actor,
            "deleted signing key",
            key_id,
            &key.kid,
        )
        .await?;

        tracing::info!(realm_id = %realm_id, kid = %key.kid, "Signing key deleted");
        Ok(())
    }
}
