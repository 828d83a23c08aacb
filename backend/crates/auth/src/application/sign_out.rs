//! Sign Out Use Case

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::domain::repository::AuthStore;
use crate::domain::value_object::session_token;
use crate::error::AuthResult;

pub struct SignOutUseCase<A>
where
    A: AuthStore,
{
    repo: Arc<A>,
    config: Arc<AuthConfig>,
}

impl<A> SignOutUseCase<A>
where
    A: AuthStore,
{
    pub fn new(repo: Arc<A>, config: Arc<AuthConfig>) -> Self {
        Self { repo, config }
    }

    /// Delete the session behind a cookie token
    pub async fn execute(&self, token: &str) -> AuthResult<()> {
        let session_id = session_token::parse(token, &self.config.session_secret)?;
        self.repo.delete_session(session_id).await?;

        tracing::info!(session_id = %session_id, "User signed out");
        Ok(())
    }
}
