//! Change Password Use Case

use std::sync::Arc;

use kernel::actor::SessionActor;
use platform::password::ClearTextPassword;
use realm::store::RealmStore;

use crate::application::config::AuthConfig;
use crate::application::realm_policy::UserRealms;
use crate::domain::repository::AuthStore;
use crate::error::{AuthError, AuthResult};

pub struct ChangePasswordUseCase<A, R>
where
    A: AuthStore,
    R: RealmStore,
{
    repo: Arc<A>,
    realms: Arc<R>,
    config: Arc<AuthConfig>,
}

impl<A, R> ChangePasswordUseCase<A, R>
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

    /// Other sessions of the user are signed out
    pub async fn execute(
        &self,
        actor: &SessionActor,
        current_password: String,
        new_password: String,
    ) -> AuthResult<()> {
        let mut credential = self
            .repo
            .find_credential(&actor.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let current = ClearTextPassword::for_verification(current_password);
        if !credential.password_hash.verify(&current, self.config.pepper()) {
            return Err(AuthError::InvalidCredentials);
        }

        let new_password = ClearTextPassword::new(new_password)?;
        UserRealms::load(self.realms.as_ref(), &actor.user_id)
            .await?
            .password_requirements()
            .check(&new_password)?;

        if credential.password_hash.verify(&new_password, self.config.pepper()) {
            return Err(AuthError::Validation(
                "New password must differ from the current password".to_string(),
            ));
        }

        credential.set_password(new_password.hash(self.config.pepper())?);
        self.repo.update_credential(&credential).await?;

        let revoked = self
            .repo
            .delete_sessions_for_user(&actor.user_id, Some(actor.session_id))
            .await?;

        tracing::info!(user_id = %actor.user_id, sessions_revoked = revoked, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{Fixture, PASSWORD};
    use crate::domain::repository::CredentialRepository;
    use platform::password::PasswordRequirements;

    #[tokio::test]
    async fn test_change_password_revokes_other_sessions() {
        let fx = Fixture::new().await;
        let (_, current) = fx.signed_in(&fx.user).await;
        fx.signed_in(&fx.user).await;

        let mut actor = fx.actor(&fx.user, None);
        actor.session_id = current.session_id;

        let uc = ChangePasswordUseCase::new(fx.auth.clone(), fx.realms.clone(), fx.config.clone());
        uc.execute(&actor, PASSWORD.into(), "N3w-Passw0rd!".into())
            .await
            .unwrap();

        let sessions = fx.auth.sessions_for(&fx.user.id).await;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session_id, current.session_id);

        let cred = fx.auth.find_credential(&fx.user.id).await.unwrap().unwrap();
        assert!(cred.password_hash.verify(
            &ClearTextPassword::for_verification("N3w-Passw0rd!".into()),
            None
        ));
    }

    #[tokio::test]
    async fn test_rejects_wrong_current_and_reuse() {
        let fx = Fixture::new().await;
        let actor = fx.actor(&fx.user, None);
        let uc = ChangePasswordUseCase::new(fx.auth.clone(), fx.realms.clone(), fx.config.clone());

        let err = uc
            .execute(&actor, "wrong".into(), "N3w-Passw0rd!".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let err = uc
            .execute(&actor, PASSWORD.into(), PASSWORD.into())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn test_realm_requirements_apply() {
        let fx = Fixture::new().await;
        fx.update_realm(|r| {
            r.password_requirements = PasswordRequirements {
                min_length: 16,
                ..PasswordRequirements::default()
            }
        })
        .await;

        let uc = ChangePasswordUseCase::new(fx.auth.clone(), fx.realms.clone(), fx.config.clone());
        let err = uc
            .execute(&fx.actor(&fx.user, None), PASSWORD.into(), "Sh0rt-Pass!".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::PasswordPolicy(_)));
    }
}
