//! Realm Users Use Case
//!
//! Membership management inside the actor's selected realm.

use std::collections::HashMap;
use std::sync::Arc;

use kernel::actor::SessionActor;
use kernel::id::{RealmId, UserId};
use platform::crypto::random_token;
use platform::password::ClearTextPassword;
use realm::RealmError;
use realm::application::audit::record;
use realm::application::authorize::authorize_grant;
use realm::application::{authorize, selected_realm};
use realm::models::{Membership, Permissions};
use realm::store::RealmStore;

use crate::application::config::AuthConfig;
use crate::application::password_reset::send_reset_link;
use crate::domain::entity::{Credential, User};
use crate::domain::repository::AuthStore;
use crate::domain::value_object::Email;
use crate::error::{AuthError, AuthResult};

/// A user together with their permissions in the realm
#[derive(Debug, Clone)]
pub struct RealmMember {
    pub user: User,
    pub permissions: Permissions,
}

pub struct RealmUsersUseCase<A, R>
where
    A: AuthStore,
    R: RealmStore,
{
    repo: Arc<A>,
    realms: Arc<R>,
    config: Arc<AuthConfig>,
}

impl<A, R> RealmUsersUseCase<A, R>
where
    A: AuthStore,
    R: RealmStore,
{
    pub fn new(repo: Arc<A>, realms: Arc<R>, config: Arc<AuthConfig>) -> Self {
        Self {
            repo,
            realms,
            config,
        }
    }

    async fn writable_realm(&self, actor: &SessionActor) -> AuthResult<RealmId> {
        let realm_id = selected_realm(actor)?;
        authorize(self.realms.as_ref(), actor, &realm_id, Permissions::USER_WRITE).await?;
        Ok(realm_id)
    }

    pub async fn list(&self, actor: &SessionActor) -> AuthResult<Vec<RealmMember>> {
        let realm_id = selected_realm(actor)?;
        authorize(self.realms.as_ref(), actor, &realm_id, Permissions::USER_READ).await?;

        let memberships = self.realms.list_memberships_for_realm(&realm_id).await?;
        let mut permissions: HashMap<UserId, Permissions> = memberships
            .iter()
            .map(|m| (m.user_id, m.permissions))
            .collect();
        let ids: Vec<UserId> = permissions.keys().copied().collect();

        Ok(self
            .repo
            .find_users(&ids)
            .await?
            .into_iter()
            .filter_map(|user| {
                permissions
                    .remove(&user.id)
                    .map(|permissions| RealmMember { user, permissions })
            })
            .collect())
    }

    /// Add a member, creating and inviting the user when the email is new
    pub async fn add(
        &self,
        actor: &SessionActor,
        email: &str,
        name: &str,
        permissions: Permissions,
    ) -> AuthResult<RealmMember> {
        let realm_id = self.writable_realm(actor).await?;
        authorize_grant(self.realms.as_ref(), actor, &realm_id, permissions).await?;

        let email = Email::new(email)?;
        let user = match self.repo.find_user_by_email(&email).await? {
            Some(user) => user,
            None => self.invite(actor, &realm_id, email, name).await?,
        };

        if self
            .realms
            .find_membership(&realm_id, &user.id)
            .await?
            .is_some()
        {
            return Err(RealmError::Conflict(format!("{} is already a member", user.email)).into());
        }

        let membership = Membership::new(realm_id, user.id, permissions);
        self.realms.upsert_membership(&membership).await?;
        record(
            self.realms.as_ref(),
            Some(realm_id),
            actor,
            "added user to realm",
            user.id,
            user.email.as_str(),
        )
        .await?;

        tracing::info!(realm_id = %realm_id, user_id = %user.id, "Realm member added");
        Ok(RealmMember {
            user,
            permissions: membership.permissions,
        })
    }

    /// Unknown user: create with an unusable password and email a reset link
    async fn invite(
        &self,
        actor: &SessionActor,
        realm_id: &RealmId,
        email: Email,
        name: &str,
    ) -> AuthResult<User> {
        let user = User::new(email, name.trim());
        user.validate().map_err(AuthError::Validation)?;
        self.repo.create_user(&user).await?;

        let placeholder = ClearTextPassword::new(random_token(32))?;
        self.repo
            .create_credential(&Credential::new(
                user.id,
                placeholder.hash(self.config.pepper())?,
            ))
            .await?;

        let realm_name = self
            .realms
            .find_realm(realm_id)
            .await?
            .map(|r| r.name)
            .unwrap_or_default();
        send_reset_link(
            self.repo.as_ref(),
            self.realms.as_ref(),
            &self.config,
            &user,
            "You have been invited to the verification server",
            &format!(
                "{} added you to {}. Choose a password to activate your account:",
                actor.display(),
                realm_name
            ),
        )
        .await?;

        tracing::info!(user_id = %user.id, realm_id = %realm_id, "User invited");
        Ok(user)
    }

    pub async fn update(
        &self,
        actor: &SessionActor,
        user_id: &UserId,
        permissions: Permissions,
    ) -> AuthResult<RealmMember> {
        if *user_id == actor.user_id {
            return Err(AuthError::Validation(
                "You cannot change your own permissions".to_string(),
            ));
        }
        let realm_id = self.writable_realm(actor).await?;

        let mut membership = self
            .realms
            .find_membership(&realm_id, user_id)
            .await?
            .ok_or(AuthError::NotAMember)?;
        authorize_grant(self.realms.as_ref(), actor, &realm_id, permissions).await?;

        let user = self
            .repo
            .find_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        membership.set_permissions(permissions);
        self.realms.upsert_membership(&membership).await?;
        record(
            self.realms.as_ref(),
            Some(realm_id),
            actor,
            "updated user permissions",
            user.id,
            user.email.as_str(),
        )
        .await?;

        Ok(RealmMember {
            user,
            permissions: membership.permissions,
        })
    }

    pub async fn remove(&self, actor: &SessionActor, user_id: &UserId) -> AuthResult<()> {
        if *user_id == actor.user_id {
            return Err(AuthError::Validation(
                "You cannot remove yourself from the realm".to_string(),
            ));
        }
        let realm_id = self.writable_realm(actor).await?;

        if !self.realms.delete_membership(&realm_id, user_id).await? {
            return Err(AuthError::NotAMember);
        }

        let display = self
            .repo
            .find_user(user_id)
            .await?
            .map(|u| u.email.to_string())
            .unwrap_or_default();
        record(
            self.realms.as_ref(),
            Some(realm_id),
            actor,
            "removed user from realm",
            user_id,
            display,
        )
        .await?;

        tracing::info!(realm_id = %realm_id, user_id = %user_id, "Realm member removed");
        Ok(())
    }
}
