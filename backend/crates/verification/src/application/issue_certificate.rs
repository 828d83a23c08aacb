//! Issue Certificate Use Case
//!
//! Exchanges a verification token and the HMAC of the device's exposure
//! keys for a certificate the key server accepts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::{RealmId, VerificationTokenId};
use platform::crypto::{from_base64, to_base64};
use realm::RealmError;
use realm::application::{active_key, find_key};
use realm::models::{ApiKeyType, AuthorizedApp};
use realm::store::RealmStore;

use crate::application::caller::require_key_type;
use crate::application::realm_stats::bump;
use crate::domain::entities::VerificationToken;
use crate::domain::repository::VerificationStore;
use crate::domain::services::{
    CertificateClaims, TokenClaims, en_interval, jws_kid, sign_jws, token_validation, verify_jws,
};
use crate::domain::value_objects::StatCounter;
use crate::error::{VerificationError, VerificationResult};

const EKEY_HMAC_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct IssuedCertificate {
    /// Compact JWS
    pub certificate: String,
    pub expires_at: DateTime<Utc>,
}

pub struct IssueCertificateUseCase<V, R>
where
    V: VerificationStore,
    R: RealmStore,
{
    repo: Arc<V>,
    realms: Arc<R>,
}

impl<V, R> IssueCertificateUseCase<V, R>
where
    V: VerificationStore,
    R: RealmStore,
{
    pub fn new(repo: Arc<V>, realms: Arc<R>) -> Self {
        Self { repo, realms }
    }

    pub async fn execute(
        &self,
        app: &AuthorizedApp,
        token: &str,
        ekey_hmac: &str,
    ) -> VerificationResult<IssuedCertificate> {
        require_key_type(app, ApiKeyType::Device)?;
        let realm_id = app.realm_id;

        let mac = from_base64(ekey_hmac.trim())
            .map_err(|_| VerificationError::Validation("ekeyhmac must be base64".to_string()))?;
        if mac.len() != EKEY_HMAC_LEN {
            return Err(VerificationError::Validation(format!(
                "ekeyhmac must be {EKEY_HMAC_LEN} bytes"
            )));
        }

        let now = Utc::now();
        let token_id = self.check_token(&realm_id, token.trim(), now).await?;
        let used = self.use_token(&realm_id, &token_id, now).await?;

        let realm = self
            .realms
            .find_realm(&realm_id)
            .await?
            .ok_or(RealmError::NotFound("Realm"))?;
        let expires_at = now + realm.certificate_duration;
        let claims = CertificateClaims {
            iss: realm.certificate_issuer.clone(),
            aud: realm.certificate_audience.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            report_type: used.test_type.to_string(),
            symptom_onset_interval: used.symptom_date.map(en_interval),
            test_date_interval: used.test_date.map(en_interval),
            tekmac: to_base64(&mac),
        };
        let key = active_key(self.realms.as_ref(), &realm_id).await?;
        let certificate = sign_jws(&key.kid, key.key.as_bytes(), &claims)?;

        bump(self.repo.as_ref(), &realm_id, StatCounter::TokensClaimed).await;
        tracing::info!(
            realm_id = %realm_id,
            token_id = %used.id,
            app_id = %app.id,
            "Verification certificate issued"
        );
        Ok(IssuedCertificate {
            certificate,
            expires_at,
        })
    }

    /// Signature, kid, issuer, realm and expiry of a presented token
    async fn check_token(
        &self,
        realm_id: &RealmId,
        token: &str,
        now: DateTime<Utc>,
    ) -> VerificationResult<VerificationTokenId> {
        let kid = jws_kid(token).ok_or(VerificationError::TokenInvalid)?;
        let key = find_key(self.realms.as_ref(), realm_id, &kid)
            .await?
            .ok_or(VerificationError::TokenInvalid)?;

        let validation = token_validation(&realm_id.to_string());
        let claims: TokenClaims = verify_jws(token, key.key.as_bytes(), &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => VerificationError::TokenExpired,
                _ => VerificationError::TokenInvalid,
            })?;
        if claims.exp <= now.timestamp() {
            return Err(VerificationError::TokenExpired);
        }
        claims
            .jti
            .parse()
            .map_err(|_| VerificationError::TokenInvalid)
    }

    async fn use_token(
        &self,
        realm_id: &RealmId,
        token_id: &VerificationTokenId,
        now: DateTime<Utc>,
    ) -> VerificationResult<VerificationToken> {
        if let Some(used) = self.repo.use_token(realm_id, token_id, now).await? {
            return Ok(used);
        }
        match self.repo.find_token(realm_id, token_id).await? {
            None => Err(VerificationError::TokenInvalid),
            Some(t) if t.used => Err(VerificationError::TokenUsed),
            Some(_) => Err(VerificationError::TokenExpired),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::Fixture;
    use crate::application::verify_code::VerifyCodeUseCase;
    use crate::domain::entities::fixtures;
    use crate::domain::repository::{CodeRepository, StatsRepository, TokenRepository};
    use crate::domain::services::code_hmac;
    use chrono::NaiveDate;
    use jsonwebtoken::{Algorithm, Validation};
    use realm::models::TestType;
    use realm::store::{MemoryRealmRepository, SigningKeyRepository};
    use crate::infra::memory::MemoryVerificationRepository;

    const MAC: [u8; 32] = [9u8; 32];

    fn use_case(
        fx: &Fixture,
    ) -> IssueCertificateUseCase<MemoryVerificationRepository, MemoryRealmRepository> {
        IssueCertificateUseCase::new(fx.repo.clone(), fx.realms.clone())
    }

    /// Verified token for a fresh code with a symptom date
    async fn token(fx: &Fixture, code: &str) -> String {
        let secret = fx.config.code_secret();
        let mut stored = fixtures::code(fx.realm.id, &code_hmac(secret, code), &code_hmac(secret, &format!("{code}long")));
        stored.symptom_date = NaiveDate::from_ymd_opt(2020, 6, 1);
        fx.repo.create_code(&stored).await.unwrap();

        VerifyCodeUseCase::new(fx.repo.clone(), fx.realms.clone(), fx.config.clone())
            .execute(&fx.app(ApiKeyType::Device), code, &[])
            .await
            .unwrap()
            .token
    }

    #[tokio::test]
    async fn test_certificate_claims() {
        let fx = Fixture::new().await;
        let token = token(&fx, "12345678").await;
        let device = fx.app(ApiKeyType::Device);

        let issued = use_case(&fx)
            .execute(&device, &token, &to_base64(&MAC))
            .await
            .unwrap();

        let kid = jws_kid(&issued.certificate).unwrap();
        let key = find_key(fx.realms.as_ref(), &fx.realm.id, &kid)
            .await
            .unwrap()
            .unwrap();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&fx.realm.certificate_issuer]);
        validation.set_audience(&[&fx.realm.certificate_audience]);
        let claims: CertificateClaims =
            verify_jws(&issued.certificate, key.key.as_bytes(), &validation).unwrap();
        assert_eq!(claims.iss, fx.realm.certificate_issuer);
        assert_eq!(claims.aud, fx.realm.certificate_audience);
        assert_eq!(claims.report_type, TestType::Confirmed.as_str());
        assert_eq!(claims.symptom_onset_interval, Some(2_651_616));
        assert_eq!(claims.test_date_interval, None);
        assert_eq!(claims.tekmac, to_base64(&MAC));
        assert_eq!(
            claims.exp - claims.iat,
            fx.realm.certificate_duration.num_seconds()
        );

        let stats = fx
            .repo
            .list_stats(&fx.realm.id, Utc::now().date_naive())
            .await
            .unwrap();
        assert_eq!(stats[0].tokens_claimed, 1);

        assert!(matches!(
            use_case(&fx).execute(&device, &token, &to_base64(&MAC)).await,
            Err(VerificationError::TokenUsed)
        ));
    }

    #[tokio::test]
    async fn test_rejects_bad_ekeyhmac() {
        let fx = Fixture::new().await;
        let token = token(&fx, "12345678").await;
        let device = fx.app(ApiKeyType::Device);

        for bad in ["not base64!", &to_base64(&[1u8; 16])] {
            assert!(matches!(
                use_case(&fx).execute(&device, &token, bad).await,
                Err(VerificationError::Validation(_))
            ));
        }
        // Validation failures leave the token usable
        assert!(!fx.repo.tokens().await[0].used);
    }

    #[tokio::test]
    async fn test_rejects_foreign_or_forged_tokens() {
        let fx = Fixture::new().await;
        let token = token(&fx, "12345678").await;

        let foreign = crate::application::testing::app_with_type(
            kernel::id::RealmId::new(),
            ApiKeyType::Device,
        );
        assert!(matches!(
            use_case(&fx).execute(&foreign, &token, &to_base64(&MAC)).await,
            Err(VerificationError::TokenInvalid)
        ));

        let device = fx.app(ApiKeyType::Device);
        let mut forged = token.clone();
        forged.truncate(forged.len() - 2);
        assert!(matches!(
            use_case(&fx).execute(&device, &forged, &to_base64(&MAC)).await,
            Err(VerificationError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn test_token_survives_key_rotation() {
        let fx = Fixture::new().await;
        let token = token(&fx, "12345678").await;

        // A newer active key must not invalidate tokens signed with the old one
        let rotated = realm::models::SigningKey::generate(fx.realm.id, false);
        fx.realms.create_signing_key(&rotated).await.unwrap();
        fx.realms
            .activate_signing_key(&fx.realm.id, &rotated.id)
            .await
            .unwrap();

        let issued = use_case(&fx)
            .execute(&fx.app(ApiKeyType::Device), &token, &to_base64(&MAC))
            .await
            .unwrap();
        assert_eq!(jws_kid(&issued.certificate), Some(rotated.kid));
    }

    #[tokio::test]
    async fn test_expired_token() {
        let fx = Fixture::new().await;
        let token = token(&fx, "12345678").await;
        let stored = fx.repo.tokens().await.remove(0);
        let mut expired = stored.clone();
        expired.expires_at = Utc::now() - chrono::Duration::seconds(1);
        fx.repo.create_token(&expired).await.unwrap();

        assert!(matches!(
            use_case(&fx)
                .execute(&fx.app(ApiKeyType::Device), &token, &to_base64(&MAC))
                .await,
            Err(VerificationError::TokenExpired)
        ));
    }
}
