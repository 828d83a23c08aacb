//! First system admin on an empty database

use platform::password::ClearTextPassword;

use crate::application::config::AuthConfig;
use crate::domain::entity::{Credential, User};
use crate::domain::repository::AuthStore;
use crate::domain::value_object::Email;
use crate::error::{AuthError, AuthResult};

/// Create a system admin when no user exists yet
///
/// Returns the new user, or `None` when the database already has users.
pub async fn bootstrap_admin<A>(
    repo: &A,
    config: &AuthConfig,
    email: &str,
    password: String,
    name: &str,
) -> AuthResult<Option<User>>
where
    A: AuthStore,
{
    if repo.count_users().await? > 0 {
        tracing::debug!("Users exist; skipping admin bootstrap");
        return Ok(None);
    }

    let password = ClearTextPassword::new(password)?;
    let mut user = User::new(Email::new(email)?, name);
    user.validate().map_err(AuthError::Validation)?;
    user.set_system_admin(true);

    repo.create_user(&user).await?;
    repo.create_credential(&Credential::new(user.id, password.hash(config.pepper())?))
        .await?;

    tracing::info!(user_id = %user.id, "Bootstrapped system admin");
    Ok(Some(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::UserRepository;
    use crate::infra::memory::MemoryAuthRepository;

    #[tokio::test]
    async fn test_bootstrap_only_once() {
        let repo = MemoryAuthRepository::new();
        let config = AuthConfig::with_random_secret();

        let admin = bootstrap_admin(&repo, &config, "root@example.com", "Adm1n-Passw0rd!".into(), "Root")
            .await
            .unwrap()
            .unwrap();
        assert!(admin.system_admin);

        let again = bootstrap_admin(&repo, &config, "other@example.com", "Adm1n-Passw0rd!".into(), "")
            .await
            .unwrap();
        assert!(again.is_none());
        assert_eq!(repo.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_rejects_short_password() {
        let repo = MemoryAuthRepository::new();
        let err = bootstrap_admin(
            &repo,
            &AuthConfig::with_random_secret(),
            "root@example.com",
            "short".into(),
            "",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::PasswordPolicy(_)));
    }
}
