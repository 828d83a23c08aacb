//! Session Status Use Case

use std::sync::Arc;

use chrono::Utc;
use realm::store::RealmStore;

use crate::application::check_session::{Authenticated, CheckSessionUseCase};
use crate::application::config::AuthConfig;
use crate::application::realm_policy::UserRealms;
use crate::domain::repository::AuthStore;
use crate::domain::value_object::PasswordRotation;
use crate::error::AuthResult;

pub struct SessionStatus {
    pub current: Authenticated,
    pub password: PasswordRotation,
}

pub struct SessionStatusUseCase<A, R>
where
    A: AuthStore,
    R: RealmStore,
{
    repo: Arc<A>,
    realms: Arc<R>,
    config: Arc<AuthConfig>,
}

impl<A, R> SessionStatusUseCase<A, R>
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

    /// `None` for a missing, expired or foreign session
    pub async fn execute(
        &self,
        session_token: Option<&str>,
        fingerprint_hash: &[u8],
    ) -> AuthResult<Option<SessionStatus>> {
        let Some(token) = session_token else {
            return Ok(None);
        };

        let check = CheckSessionUseCase::new(self.repo.clone(), self.config.clone());
        let current = match check.authenticate(token, fingerprint_hash).await {
            Ok(current) => current,
            Err(e) if e.status_code().is_client_error() => return Ok(None),
            Err(e) => return Err(e),
        };

        let password = match self.repo.find_credential(&current.user.id).await? {
            Some(credential) => UserRealms::load(self.realms.as_ref(), &current.user.id)
                .await?
                .password_rotation(&credential, Utc::now()),
            None => PasswordRotation::default(),
        };

        Ok(Some(SessionStatus { current, password }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::Fixture;
    use crate::domain::repository::CredentialRepository;

    #[tokio::test]
    async fn test_status_reports_rotation() {
        let fx = Fixture::new().await;
        fx.update_realm(|r| {
            r.password_rotation_period_days = 30;
            r.password_rotation_warning_days = 7;
        })
        .await;
        let mut cred = fx.auth.find_credential(&fx.user.id).await.unwrap().unwrap();
        cred.password_changed_at = Utc::now() - chrono::Duration::days(40);
        fx.auth.update_credential(&cred).await.unwrap();

        let (token, _) = fx.signed_in(&fx.user).await;
        let uc = SessionStatusUseCase::new(fx.auth.clone(), fx.realms.clone(), fx.config.clone());
        let status = uc
            .execute(Some(&token), &fx.fingerprint)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.current.user.id, fx.user.id);
        assert!(status.password.expired);
    }

    #[tokio::test]
    async fn test_no_session() {
        let fx = Fixture::new().await;
        let uc = SessionStatusUseCase::new(fx.auth.clone(), fx.realms.clone(), fx.config.clone());
        assert!(uc.execute(None, &fx.fingerprint).await.unwrap().is_none());
        assert!(uc.execute(Some("garbage"), &fx.fingerprint).await.unwrap().is_none());

        let (token, _) = fx.signed_in(&fx.user).await;
        assert!(uc.execute(Some(&token), b"other-agent").await.unwrap().is_none());
    }
}
