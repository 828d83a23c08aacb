//! Sign In Use Case
//!
//! Authenticates a user, applies the realm MFA policy and creates a session.

use std::sync::Arc;

use chrono::Utc;
use kernel::id::RealmId;
use platform::password::ClearTextPassword;
use realm::store::RealmStore;

use crate::application::config::{AuthConfig, chrono_duration};
use crate::application::realm_policy::UserRealms;
use crate::domain::entity::{AuthSession, SessionClient, User};
use crate::domain::repository::AuthStore;
use crate::domain::value_object::{Email, MfaDecision, PasswordRotation, session_token};
use crate::error::{AuthError, AuthResult};

pub struct SignInInput {
    pub email: String,
    pub password: String,
    pub remember_me: bool,
    pub totp_code: Option<String>,
}

#[cfg_attr(test, derive(Debug))]
pub struct SignInOutput {
    /// `None` when a TOTP code is still needed
    pub session_token: Option<String>,
    pub user: User,
    pub mfa_decision: MfaDecision,
    pub mfa_pending: bool,
    pub realm_id: Option<RealmId>,
    pub password: PasswordRotation,
}

impl SignInOutput {
    pub fn totp_required(&self) -> bool {
        self.session_token.is_none()
    }
}

pub struct SignInUseCase<A, R>
where
    A: AuthStore,
    R: RealmStore,
{
    repo: Arc<A>,
    realms: Arc<R>,
    config: Arc<AuthConfig>,
}

impl<A, R> SignInUseCase<A, R>
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

    pub async fn execute(&self, input: SignInInput, client: SessionClient) -> AuthResult<SignInOutput> {
        let now = Utc::now();
        let email = Email::new(&input.email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .repo
            .find_user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let mut credential = self
            .repo
            .find_credential(&user.id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if credential.is_locked(now) {
            return Err(AuthError::AccountLocked);
        }

        let password = ClearTextPassword::for_verification(input.password);
        if !credential.password_hash.verify(&password, self.config.pepper()) {
            credential.record_failure(now);
            self.repo.update_credential(&credential).await?;
            if credential.is_locked(now) {
                tracing::warn!(user_id = %user.id, "Account locked after repeated failures");
            }
            return Err(AuthError::InvalidCredentials);
        }

        if !user.can_login() {
            return Err(AuthError::AccountDisabled);
        }

        let realms = UserRealms::load(self.realms.as_ref(), &user.id).await?;
        let mfa_decision = realms.mfa_decision(&user, &credential, now);

        if mfa_decision == MfaDecision::Verify {
            let Some(code) = input.totp_code.as_deref() else {
                return Ok(SignInOutput {
                    session_token: None,
                    user,
                    mfa_decision,
                    mfa_pending: false,
                    realm_id: None,
                    password: PasswordRotation::default(),
                });
            };

            let secret = credential.totp_secret.as_ref().ok_or(AuthError::TotpNotSetup)?;
            if !secret.verify(code, &self.config.totp_issuer, user.email.as_str())? {
                credential.record_failure(now);
                self.repo.update_credential(&credential).await?;
                return Err(AuthError::InvalidTotpCode);
            }
        }

        credential.reset_failures();
        self.repo.update_credential(&credential).await?;

        let mut user = user;
        user.record_login();
        self.repo.update_user(&user).await?;

        let ttl = chrono_duration(self.config.session_ttl(input.remember_me));
        let mut session = AuthSession::new(user.id, input.remember_me, client, ttl);
        session.mfa_pending = mfa_decision == MfaDecision::RequireEnrollment;
        session.realm_id = realms.single_realm().map(|r| r.id);
        self.repo.create_session(&session).await?;

        tracing::info!(
            user_id = %user.id,
            session_id = %session.session_id,
            remember_me = input.remember_me,
            mfa_decision = mfa_decision.as_str(),
            "User signed in"
        );

        Ok(SignInOutput {
            session_token: Some(session_token::sign(
                session.session_id,
                &self.config.session_secret,
            )),
            mfa_decision,
            mfa_pending: session.mfa_pending,
            realm_id: session.realm_id,
            password: realms.password_rotation(&credential, now),
            user,
        })
    }
}
