//! Realm Selection Use Case
//!
//! Which realms a console user can work in, and switching the session
//! between them.

use std::sync::Arc;

use kernel::actor::SessionActor;
use kernel::id::{RealmId, UserId};
use realm::RealmError;
use realm::models::{Permissions, Realm};
use realm::store::RealmStore;

use crate::domain::repository::AuthStore;
use crate::error::{AuthError, AuthResult};

/// A realm the user may select
#[derive(Debug, Clone)]
pub struct RealmChoice {
    pub realm_id: RealmId,
    pub name: String,
    pub permissions: Permissions,
}

pub struct RealmSelectionUseCase<A, R>
where
    A: AuthStore,
    R: RealmStore,
{
    repo: Arc<A>,
    realms: Arc<R>,
}

impl<A, R> RealmSelectionUseCase<A, R>
where
    A: AuthStore,
    R: RealmStore,
{
    pub fn new(repo: Arc<A>, realms: Arc<R>) -> Self {
        Self { repo, realms }
    }

    /// Memberships; system admins see every realm
    pub async fn choices(&self, user_id: &UserId, system_admin: bool) -> AuthResult<Vec<RealmChoice>> {
        if system_admin {
            let realms = self.realms.list_realms().await?;
            return Ok(realms
                .into_iter()
                .map(|r| RealmChoice {
                    realm_id: r.id,
                    name: r.name,
                    permissions: Permissions::all(),
                })
                .collect());
        }

        let mut choices = Vec::new();
        for membership in self.realms.list_memberships_for_user(user_id).await? {
            if let Some(realm) = self.realms.find_realm(&membership.realm_id).await? {
                choices.push(RealmChoice {
                    realm_id: realm.id,
                    name: realm.name,
                    permissions: membership.permissions,
                });
            }
        }
        choices.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(choices)
    }

    pub async fn select(&self, actor: &SessionActor, realm_id: RealmId) -> AuthResult<Realm> {
        let realm = self
            .realms
            .find_realm(&realm_id)
            .await?
            .ok_or(RealmError::NotFound("Realm"))?;

        if !actor.system_admin
            && self
                .realms
                .find_membership(&realm_id, &actor.user_id)
                .await?
                .is_none()
        {
            return Err(AuthError::NotAMember);
        }

        let mut session = self
            .repo
            .load_session(actor.session_id)
            .await?
            .ok_or(AuthError::SessionInvalid)?;
        session.realm_id = Some(realm_id);
        self.repo.update_session(&session).await?;

        tracing::info!(user_id = %actor.user_id, realm_id = %realm_id, "Realm selected");
        Ok(realm)
    }
}
