//! Callers of code and statistics operations
//!
//! Console users act on their selected realm and need a permission there.
//! API keys act on their own realm and need the right key type.

use kernel::actor::SessionActor;
use kernel::id::RealmId;
use realm::RealmError;
use realm::application::{authorize, selected_realm};
use realm::models::{ApiKeyType, AuthorizedApp, Permissions};
use realm::store::MembershipRepository;

use crate::domain::value_objects::Issuer;
use crate::error::VerificationResult;

#[derive(Debug, Clone, Copy)]
pub enum Caller<'a> {
    Session(&'a SessionActor),
    App(&'a AuthorizedApp),
}

impl Caller<'_> {
    /// Realm the caller may act on with `permission` (sessions) or a key
    /// of `key_type` (apps)
    pub async fn realm<R>(
        &self,
        repo: &R,
        permission: Permissions,
        key_type: ApiKeyType,
    ) -> VerificationResult<RealmId>
    where
        R: MembershipRepository,
    {
        match self {
            Caller::Session(actor) => {
                let realm_id = selected_realm(actor)?;
                authorize(repo, actor, &realm_id, permission).await?;
                Ok(realm_id)
            }
            Caller::App(app) => {
                require_key_type(app, key_type)?;
                Ok(app.realm_id)
            }
        }
    }

    pub fn issuer(&self) -> Issuer {
        match self {
            Caller::Session(actor) => Issuer::User(actor.user_id),
            Caller::App(app) => Issuer::App(app.id),
        }
    }
}

pub fn require_key_type(app: &AuthorizedApp, key_type: ApiKeyType) -> VerificationResult<()> {
    if !app.is_active() {
        return Err(RealmError::ApiKeyDisabled.into());
    }
    if app.api_key_type != key_type {
        tracing::debug!(
            app_id = %app.id,
            expected = %key_type,
            actual = %app.api_key_type,
            "API key of the wrong type"
        );
        return Err(RealmError::WrongApiKeyType.into());
    }
    Ok(())
}
