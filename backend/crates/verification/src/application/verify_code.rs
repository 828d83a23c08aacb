//! Verify Code Use Case
//!
//! A device trades a short or long code for a signed verification token.
//! The code is only claimed once every check passed, and is released
//! again when its token cannot be stored.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use realm::application::active_key;
use realm::models::{ApiKeyType, AuthorizedApp, TestType, TestTypes};
use realm::store::RealmStore;

use crate::application::caller::require_key_type;
use crate::application::config::VerificationConfig;
use crate::application::realm_stats::bump;
use crate::domain::entities::VerificationToken;
use crate::domain::repository::VerificationStore;
use crate::domain::services::{TOKEN_ISSUER, TokenClaims, code_hmac, normalize_code, sign_jws};
use crate::domain::value_objects::StatCounter;
use crate::error::{VerificationError, VerificationResult};

#[derive(Debug, Clone)]
pub struct VerifiedCode {
    /// Compact JWS
    pub token: String,
    pub test_type: TestType,
    pub symptom_date: Option<NaiveDate>,
    pub test_date: Option<NaiveDate>,
}

pub struct VerifyCodeUseCase<V, R>
where
    V: VerificationStore,
    R: RealmStore,
{
    repo: Arc<V>,
    realms: Arc<R>,
    config: Arc<VerificationConfig>,
}

impl<V, R> VerifyCodeUseCase<V, R>
where
    V: VerificationStore,
    R: RealmStore,
{
    pub fn new(repo: Arc<V>, realms: Arc<R>, config: Arc<VerificationConfig>) -> Self {
        Self {
            repo,
            realms,
            config,
        }
    }

    /// `accept` empty means `[confirmed]`
    pub async fn execute(
        &self,
        app: &AuthorizedApp,
        code: &str,
        accept: &[TestType],
    ) -> VerificationResult<VerifiedCode> {
        require_key_type(app, ApiKeyType::Device)?;
        let realm_id = app.realm_id;

        if normalize_code(code).is_empty() {
            return Err(VerificationError::CodeInvalid);
        }
        let hmac = code_hmac(self.config.code_secret(), code);
        let found = self
            .repo
            .find_code_by_hmac(&realm_id, &hmac)
            .await?
            .ok_or(VerificationError::CodeInvalid)?;
        let kind = found.kind_of(&hmac).ok_or(VerificationError::CodeInvalid)?;

        let now = Utc::now();
        if found.claimed {
            return Err(VerificationError::CodeUsed);
        }
        if found.is_expired(kind, now) {
            return Err(VerificationError::CodeExpired);
        }
        if !TestTypes::accepting(accept).contains(found.test_type) {
            return Err(VerificationError::UnsupportedTestType(
                found.test_type.to_string(),
            ));
        }

        // Everything that can fail before the token is stored runs ahead of the claim
        let key = active_key(self.realms.as_ref(), &realm_id).await?;
        let token = VerificationToken::for_code(&found, self.config.token_ttl(), now);
        let claims = TokenClaims {
            iss: TOKEN_ISSUER.to_string(),
            sub: realm_id.to_string(),
            jti: token.id.to_string(),
            iat: now.timestamp(),
            exp: token.expires_at.timestamp(),
        };
        let signed = sign_jws(&key.kid, key.key.as_bytes(), &claims)?;

        let claimed = self
            .repo
            .claim_code(&found.id, kind, now)
            .await?
            .ok_or(VerificationError::CodeUsed)?;
        if let Err(e) = self.repo.create_token(&token).await {
            if let Err(release) = self.repo.release_code(&claimed.id).await {
                tracing::error!(
                    code_id = %claimed.id,
                    error = %release,
                    "Failed to release code after token insert failed"
                );
            }
            return Err(e);
        }

        bump(self.repo.as_ref(), &realm_id, StatCounter::CodesClaimed).await;
        tracing::info!(
            realm_id = %realm_id,
            code_id = %claimed.id,
            token_id = %token.id,
            app_id = %app.id,
            "Verification code claimed"
        );

        Ok(VerifiedCode {
            token: signed,
            test_type: token.test_type,
            symptom_date: token.symptom_date,
            test_date: token.test_date,
        })
    }
}
