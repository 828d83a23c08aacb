//! Repository Traits
//!
//! Interfaces for data persistence. Implementation is in infrastructure layer.

use chrono::{DateTime, NaiveDate, Utc};
use kernel::id::{RealmId, VerificationCodeId, VerificationTokenId};
use uuid::Uuid;

use crate::domain::entities::{RealmStats, VerificationCode, VerificationToken};
use crate::domain::value_objects::{CodeKind, StatCounter};
use crate::error::VerificationResult;

/// Verification code repository trait
#[trait_variant::make(CodeRepository: Send)]
pub trait LocalCodeRepository {
    /// Fails with `DuplicateUuid` when the realm already has the uuid
    async fn create_code(&self, code: &VerificationCode) -> VerificationResult<()>;

    async fn find_code_by_uuid(
        &self,
        realm_id: &RealmId,
        uuid: &Uuid,
    ) -> VerificationResult<Option<VerificationCode>>;

    /// Matches either the short or the long code HMAC
    async fn find_code_by_hmac(
        &self,
        realm_id: &RealmId,
        hmac: &str,
    ) -> VerificationResult<Option<VerificationCode>>;

    /// Marks an unclaimed code claimed if `kind`'s expiry is after `now`
    async fn claim_code(
        &self,
        code_id: &VerificationCodeId,
        kind: CodeKind,
        now: DateTime<Utc>,
    ) -> VerificationResult<Option<VerificationCode>>;

    /// Undoes `claim_code` when no token could be stored for the claim
    async fn release_code(&self, code_id: &VerificationCodeId) -> VerificationResult<()>;

    /// Sets both expiries to `now` on an unclaimed code
    async fn expire_code(
        &self,
        code_id: &VerificationCodeId,
        now: DateTime<Utc>,
    ) -> VerificationResult<Option<VerificationCode>>;

    /// Deletes codes whose long expiry is before `before`
    async fn purge_codes(&self, before: DateTime<Utc>) -> VerificationResult<u64>;
}

/// Verification token repository trait
#[trait_variant::make(TokenRepository: Send)]
pub trait LocalTokenRepository {
    async fn create_token(&self, token: &VerificationToken) -> VerificationResult<()>;

    async fn find_token(
        &self,
        realm_id: &RealmId,
        token_id: &VerificationTokenId,
    ) -> VerificationResult<Option<VerificationToken>>;

    /// Marks an unused, unexpired token used
    async fn use_token(
        &self,
        realm_id: &RealmId,
        token_id: &VerificationTokenId,
        now: DateTime<Utc>,
    ) -> VerificationResult<Option<VerificationToken>>;

    async fn purge_tokens(&self, before: DateTime<Utc>) -> VerificationResult<u64>;
}

/// Realm statistics repository trait
#[trait_variant::make(StatsRepository: Send)]
pub trait LocalStatsRepository {
    async fn increment_stat(
        &self,
        realm_id: &RealmId,
        date: NaiveDate,
        counter: StatCounter,
    ) -> VerificationResult<()>;

    /// Rows on or after `since`, newest first; days without activity are absent
    async fn list_stats(
        &self,
        realm_id: &RealmId,
        since: NaiveDate,
    ) -> VerificationResult<Vec<RealmStats>>;
}

/// Everything the verification use cases need from one store
pub trait VerificationStore:
    CodeRepository + TokenRepository + StatsRepository + Clone + Send + Sync + 'static
{
}

impl<T> VerificationStore for T where
    T: CodeRepository + TokenRepository + StatsRepository + Clone + Send + Sync + 'static
{
}
