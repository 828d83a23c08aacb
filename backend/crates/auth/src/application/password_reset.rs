//! Password Reset Use Case
//!
//! Emailed reset links for forgotten passwords and for invitations of new
//! realm members. Requests never reveal whether an account exists.

use std::sync::Arc;

use chrono::Utc;
use platform::notify::EmailMessage;
use platform::password::ClearTextPassword;
use realm::application::resolve_email_provider;
use realm::store::RealmStore;

use crate::application::config::{AuthConfig, chrono_duration};
use crate::application::realm_policy::UserRealms;
use crate::domain::entity::{PasswordResetToken, User};
use crate::domain::repository::AuthStore;
use crate::domain::value_object::Email;
use crate::error::{AuthError, AuthResult};

/// Store a fresh token and email its link through the system email provider
///
/// Delivery problems are logged; the token stays valid either way.
pub(crate) async fn send_reset_link<A, R>(
    repo: &A,
    realms: &R,
    config: &AuthConfig,
    user: &User,
    subject: &str,
    intro: &str,
) -> AuthResult<()>
where
    A: AuthStore,
    R: RealmStore,
{
    let (token, raw) = PasswordResetToken::issue(user.id, chrono_duration(config.reset_token_ttl));
    repo.create_reset_token(&token).await?;

    let Some(email) = resolve_email_provider(realms, &config.http_client, None).await? else {
        tracing::warn!(user_id = %user.id, "No system email provider; reset link not sent");
        return Ok(());
    };

    let message = EmailMessage {
        to: user.email.to_string(),
        from: email.from.clone(),
        subject: subject.to_string(),
        text_body: format!(
            "{}\n\n{}\n\nThe link expires in {} minutes.",
            intro,
            config.reset_link(&raw),
            config.reset_token_ttl.as_secs() / 60
        ),
    };

    if let Err(e) = email.provider.send(&message).await {
        tracing::warn!(user_id = %user.id, provider = email.provider.name(), error = %e, "Reset email failed");
    }
    Ok(())
}

pub struct PasswordResetUseCase<A, R>
where
    A: AuthStore,
    R: RealmStore,
{
    repo: Arc<A>,
    realms: Arc<R>,
    config: Arc<AuthConfig>,
}

impl<A, R> PasswordResetUseCase<A, R>
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

    /// Always succeeds unless storage fails
    pub async fn request(&self, email: &str) -> AuthResult<()> {
        let Ok(email) = Email::new(email) else {
            return Ok(());
        };
        let Some(user) = self.repo.find_user_by_email(&email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };
        if !user.can_login() {
            return Ok(());
        }

        send_reset_link(
            self.repo.as_ref(),
            self.realms.as_ref(),
            &self.config,
            &user,
            "Reset your password",
            "Someone asked to reset the password of your verification server account. \
             If it was you, open this link:",
        )
        .await?;

        tracing::info!(user_id = %user.id, "Password reset requested");
        Ok(())
    }

    /// Set a new password from an emailed token
    ///
    /// Clears any lockout and signs the user out everywhere.
    pub async fn complete(&self, raw_token: &str, new_password: String) -> AuthResult<()> {
        let now = Utc::now();
        let token = self
            .repo
            .find_reset_token(&PasswordResetToken::hash(raw_token))
            .await?
            .filter(|t| t.is_usable(now))
            .ok_or(AuthError::InvalidResetToken)?;

        let new_password = ClearTextPassword::new(new_password)?;
        UserRealms::load(self.realms.as_ref(), &token.user_id)
            .await?
            .password_requirements()
            .check(&new_password)?;

        if !self.repo.consume_reset_token(token.token_id, now).await? {
            return Err(AuthError::InvalidResetToken);
        }

        let mut credential = self
            .repo
            .find_credential(&token.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        credential.set_password(new_password.hash(self.config.pepper())?);
        credential.reset_failures();
        self.repo.update_credential(&credential).await?;

        let revoked = self
            .repo
            .delete_sessions_for_user(&token.user_id, None)
            .await?;

        tracing::info!(user_id = %token.user_id, sessions_revoked = revoked, "Password reset completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::Fixture;
    use crate::domain::repository::{CredentialRepository, PasswordResetRepository};

    /// Reset token whose raw value the test knows
    async fn known_token(fx: &Fixture) -> String {
        let (token, raw) = PasswordResetToken::issue(fx.user.id, chrono::Duration::hours(1));
        fx.auth.create_reset_token(&token).await.unwrap();
        raw
    }

    #[tokio::test]
    async fn test_request_for_unknown_email_is_silent() {
        let fx = Fixture::new().await;
        let uc = PasswordResetUseCase::new(fx.auth.clone(), fx.realms.clone(), fx.config.clone());
        uc.request("nobody@example.com").await.unwrap();
        uc.request("not an email").await.unwrap();
    }

    #[tokio::test]
    async fn test_request_stores_token_without_provider() {
        let fx = Fixture::new().await;
        let uc = PasswordResetUseCase::new(fx.auth.clone(), fx.realms.clone(), fx.config.clone());
        uc.request("TRACER@example.com").await.unwrap();
        assert_eq!(fx.auth.reset_tokens_for(&fx.user.id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_complete_resets_password_and_lockout() {
        let fx = Fixture::new().await;
        fx.signed_in(&fx.user).await;

        let mut cred = fx.auth.find_credential(&fx.user.id).await.unwrap().unwrap();
        for _ in 0..5 {
            cred.record_failure(Utc::now());
        }
        fx.auth.update_credential(&cred).await.unwrap();

        let raw = known_token(&fx).await;
        let uc = PasswordResetUseCase::new(fx.auth.clone(), fx.realms.clone(), fx.config.clone());
        uc.complete(&raw, "Fresh-Start-42".into()).await.unwrap();

        let cred = fx.auth.find_credential(&fx.user.id).await.unwrap().unwrap();
        assert!(!cred.is_locked(Utc::now()));
        assert!(cred.password_hash.verify(
            &ClearTextPassword::for_verification("Fresh-Start-42".into()),
            None
        ));
        assert!(fx.auth.sessions_for(&fx.user.id).await.is_empty());

        let err = uc.complete(&raw, "Another-One-43".into()).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidResetToken));
    }

    #[tokio::test]
    async fn test_complete_checks_password_policy() {
        let fx = Fixture::new().await;
        let raw = known_token(&fx).await;
        let uc = PasswordResetUseCase::new(fx.auth.clone(), fx.realms.clone(), fx.config.clone());

        let err = uc.complete(&raw, "alllowercase".into()).await.unwrap_err();
        assert!(matches!(err, AuthError::PasswordPolicy(_)));

        // Still usable after a rejected password
        uc.complete(&raw, "Fresh-Start-42".into()).await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let fx = Fixture::new().await;
        let uc = PasswordResetUseCase::new(fx.auth.clone(), fx.realms.clone(), fx.config.clone());
        let err = uc.complete("bogus", "Fresh-Start-42".into()).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidResetToken));
    }
}
