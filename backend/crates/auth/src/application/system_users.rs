//! System Users Use Case
//!
//! Server-wide user administration for system admins.

use std::sync::Arc;

use kernel::actor::SessionActor;
use kernel::id::UserId;
use realm::application::audit::record;
use realm::application::require_system_admin;
use realm::store::RealmStore;

use crate::domain::entity::User;
use crate::domain::repository::AuthStore;
use crate::domain::value_object::UserStatus;
use crate::error::{AuthError, AuthResult};

pub struct SystemUsersUseCase<A, R>
where
    A: AuthStore,
    R: RealmStore,
{
    repo: Arc<A>,
    realms: Arc<R>,
}

impl<A, R> SystemUsersUseCase<A, R>
where
    A: AuthStore,
    R: RealmStore,
{
    pub fn new(repo: Arc<A>, realms: Arc<R>) -> Self {
        Self { repo, realms }
    }

    pub async fn list(&self, actor: &SessionActor) -> AuthResult<Vec<User>> {
        require_system_admin(actor)?;
        self.repo.list_users().await
    }

    async fn target(&self, user_id: &UserId) -> AuthResult<User> {
        self.repo
            .find_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    pub async fn set_system_admin(
        &self,
        actor: &SessionActor,
        user_id: &UserId,
        system_admin: bool,
    ) -> AuthResult<User> {
        require_system_admin(actor)?;
        if *user_id == actor.user_id && !system_admin {
            return Err(AuthError::Validation(
                "You cannot revoke your own system admin privileges".to_string(),
            ));
        }

        let mut user = self.target(user_id).await?;
        if user.system_admin == system_admin {
            return Ok(user);
        }
        user.set_system_admin(system_admin);
        self.repo.update_user(&user).await?;

        let action = if system_admin {
            "granted system admin"
        } else {
            "revoked system admin"
        };
        record(self.realms.as_ref(), None, actor, action, user.id, user.email.as_str()).await?;

        tracing::info!(user_id = %user.id, system_admin, "System admin changed");
        Ok(user)
    }

    /// Disabling also signs the user out everywhere
    pub async fn set_disabled(
        &self,
        actor: &SessionActor,
        user_id: &UserId,
        disabled: bool,
    ) -> AuthResult<User> {
        require_system_admin(actor)?;
        if *user_id == actor.user_id {
            return Err(AuthError::Validation(
                "You cannot change the status of your own account".to_string(),
            ));
        }

        let mut user = self.target(user_id).await?;
        let status = if disabled {
            UserStatus::Disabled
        } else {
            UserStatus::Active
        };
        if user.status == status {
            return Ok(user);
        }
        user.set_status(status);
        self.repo.update_user(&user).await?;

        if disabled {
            self.repo.delete_sessions_for_user(&user.id, None).await?;
        }

        let action = if disabled { "disabled user" } else { "enabled user" };
        record(self.realms.as_ref(), None, actor, action, user.id, user.email.as_str()).await?;

        tracing::info!(user_id = %user.id, status = %status, "User status changed");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::Fixture;

    #[tokio::test]
    async fn test_requires_system_admin() {
        let fx = Fixture::new().await;
        let uc = SystemUsersUseCase::new(fx.auth.clone(), fx.realms.clone());
        let err = uc.list(&fx.actor(&fx.user, None)).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);

        let users = uc.list(&fx.actor(&fx.admin, None)).await.unwrap();
        assert_eq!(users.len(), 2);
    }

    #[tokio::test]
    async fn test_grant_and_self_revoke() {
        let fx = Fixture::new().await;
        let admin = fx.actor(&fx.admin, None);
        let uc = SystemUsersUseCase::new(fx.auth.clone(), fx.realms.clone());

        let user = uc.set_system_admin(&admin, &fx.user.id, true).await.unwrap();
        assert!(user.system_admin);

        let err = uc
            .set_system_admin(&admin, &fx.admin.id, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));

        let audit = fx.realms.audit_entries().await;
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].realm_id, None);
    }

    #[tokio::test]
    async fn test_disable_revokes_sessions() {
        let fx = Fixture::new().await;
        fx.signed_in(&fx.user).await;
        let uc = SystemUsersUseCase::new(fx.auth.clone(), fx.realms.clone());

        let user = uc
            .set_disabled(&fx.actor(&fx.admin, None), &fx.user.id, true)
            .await
            .unwrap();
        assert!(!user.can_login());
        assert!(fx.auth.sessions_for(&fx.user.id).await.is_empty());

        let user = uc
            .set_disabled(&fx.actor(&fx.admin, None), &fx.user.id, false)
            .await
            .unwrap();
        assert!(user.can_login());
    }
}
