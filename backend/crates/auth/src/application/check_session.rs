//! Check Session Use Case
//!
//! Resolves a session cookie into the session and its user.

use std::sync::Arc;

use chrono::Utc;
use kernel::actor::SessionActor;

use crate::application::config::{AuthConfig, chrono_duration};
use crate::domain::entity::{AuthSession, User};
use crate::domain::repository::AuthStore;
use crate::domain::value_object::session_token;
use crate::error::{AuthError, AuthResult};

/// Signed-in user behind a request
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub session: AuthSession,
    pub user: User,
}

impl Authenticated {
    pub fn actor(&self) -> SessionActor {
        SessionActor {
            user_id: self.user.id,
            session_id: self.session.session_id,
            email: self.user.email.to_string(),
            name: self.user.name.clone(),
            system_admin: self.user.system_admin,
            realm_id: self.session.realm_id,
        }
    }
}

pub struct CheckSessionUseCase<A>
where
    A: AuthStore,
{
    repo: Arc<A>,
    config: Arc<AuthConfig>,
}

impl<A> CheckSessionUseCase<A>
where
    A: AuthStore,
{
    pub fn new(repo: Arc<A>, config: Arc<AuthConfig>) -> Self {
        Self { repo, config }
    }

    /// Session and its active user
    pub async fn authenticate(
        &self,
        session_token: &str,
        fingerprint_hash: &[u8],
    ) -> AuthResult<Authenticated> {
        let session = self.get_session(session_token, fingerprint_hash).await?;

        let user = self
            .repo
            .find_user(&session.user_id)
            .await?
            .ok_or(AuthError::SessionInvalid)?;

        if !user.can_login() {
            self.repo.delete_session(session.session_id).await?;
            return Err(AuthError::AccountDisabled);
        }

        Ok(Authenticated { session, user })
    }

    /// Verify the token, load the session and record activity
    pub async fn get_session(
        &self,
        session_token: &str,
        fingerprint_hash: &[u8],
    ) -> AuthResult<AuthSession> {
        let session_id = session_token::parse(session_token, &self.config.session_secret)?;

        let mut session = self
            .repo
            .find_session(session_id, fingerprint_hash)
            .await?
            .ok_or(AuthError::SessionInvalid)?;

        if session.is_expired(Utc::now()) {
            self.repo.delete_session(session_id).await?;
            return Err(AuthError::SessionInvalid);
        }

        session.touch();
        session.extend_if_needed(chrono_duration(self.config.session_ttl_long));

        // Fire and forget
        let (session_id, last_activity_at, expires_at) =
            (session.session_id, session.last_activity_at, session.expires_at);
        let repo = self.repo.clone();
        tokio::spawn(async move {
            if let Err(e) = repo
                .touch_session(session_id, last_activity_at, expires_at)
                .await
            {
                tracing::warn!(error = %e, "Failed to update session activity");
            }
        });

        Ok(session)
    }
}
