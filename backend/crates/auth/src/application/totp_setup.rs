//! TOTP Setup Use Case
//!
//! Enroll, confirm and remove an authenticator app.

use std::sync::Arc;

use kernel::actor::SessionActor;
use realm::store::RealmStore;

use crate::application::config::AuthConfig;
use crate::application::realm_policy::UserRealms;
use crate::domain::entity::Credential;
use crate::domain::repository::AuthStore;
use crate::error::{AuthError, AuthResult};

#[cfg_attr(test, derive(Debug))]
pub struct TotpSetupOutput {
    /// QR code as base64-encoded PNG
    pub qr_code_base64: String,
    /// Secret for manual entry
    pub secret: String,
    pub otpauth_url: String,
}

pub struct TotpSetupUseCase<A, R>
where
    A: AuthStore,
    R: RealmStore,
{
    repo: Arc<A>,
    realms: Arc<R>,
    config: Arc<AuthConfig>,
}

impl<A, R> TotpSetupUseCase<A, R>
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

    async fn credential(&self, actor: &SessionActor) -> AuthResult<Credential> {
        self.repo
            .find_credential(&actor.user_id)
            .await?
            .ok_or_else(|| AuthError::Internal("credential missing for user".to_string()))
    }

    /// New secret; replaces any unconfirmed one
    pub async fn setup(&self, actor: &SessionActor) -> AuthResult<TotpSetupOutput> {
        let mut credential = self.credential(actor).await?;
        if credential.is_enrolled() {
            return Err(AuthError::TotpAlreadyEnabled);
        }

        let secret = credential.setup_totp();
        self.repo.update_credential(&credential).await?;

        let issuer = &self.config.totp_issuer;
        let output = TotpSetupOutput {
            qr_code_base64: secret.qr_code(issuer, &actor.email)?,
            otpauth_url: secret.otpauth_url(issuer, &actor.email)?,
            secret: secret.as_base32().to_string(),
        };

        tracing::info!(user_id = %actor.user_id, "TOTP setup initiated");
        Ok(output)
    }

    /// Confirm the pending secret; lifts the session's enrollment block
    pub async fn verify(&self, actor: &SessionActor, code: &str) -> AuthResult<()> {
        let mut credential = self.credential(actor).await?;
        let secret = credential.totp_secret.as_ref().ok_or(AuthError::TotpNotSetup)?;

        if !secret.verify(code, &self.config.totp_issuer, &actor.email)? {
            return Err(AuthError::InvalidTotpCode);
        }

        credential.enable_totp();
        self.repo.update_credential(&credential).await?;

        if let Some(mut session) = self.repo.load_session(actor.session_id).await? {
            if session.mfa_pending {
                session.mfa_pending = false;
                self.repo.update_session(&session).await?;
            }
        }

        tracing::info!(user_id = %actor.user_id, "TOTP enabled");
        Ok(())
    }

    /// Needs a current code, and no realm of the user may require MFA
    pub async fn disable(&self, actor: &SessionActor, code: &str) -> AuthResult<()> {
        let mut credential = self.credential(actor).await?;
        let secret = credential.totp_secret.as_ref().ok_or(AuthError::TotpNotSetup)?;

        if !secret.verify(code, &self.config.totp_issuer, &actor.email)? {
            return Err(AuthError::InvalidTotpCode);
        }

        let realms = UserRealms::load(self.realms.as_ref(), &actor.user_id).await?;
        if realms.requires_mfa() {
            return Err(AuthError::MfaRequiredByRealm);
        }

        credential.disable_totp();
        self.repo.update_credential(&credential).await?;

        tracing::info!(user_id = %actor.user_id, "TOTP disabled");
        Ok(())
    }
}
