//! Repository Traits
//!
//! Interfaces for data persistence. Implementations live in the
//! infrastructure layer. Method names are unique across traits so a single
//! store type can implement all of them without ambiguity.

use chrono::{DateTime, Utc};
use kernel::id::{AuthorizedAppId, MobileAppId, RealmId, SigningKeyId, UserId};

use crate::domain::entity::{
    AuditEntry, AuthorizedApp, EmailConfig, Membership, MobileApp, Realm, SigningKey, SmsConfig,
    SmsFromNumber,
};
use crate::error::RealmResult;

#[trait_variant::make(RealmRepository: Send)]
pub trait LocalRealmRepository {
    /// Insert a realm; a taken name is a conflict
    async fn create_realm(&self, realm: &Realm) -> RealmResult<()>;

    async fn find_realm(&self, realm_id: &RealmId) -> RealmResult<Option<Realm>>;

    async fn list_realms(&self) -> RealmResult<Vec<Realm>>;

    async fn update_realm(&self, realm: &Realm) -> RealmResult<()>;
}

#[trait_variant::make(MembershipRepository: Send)]
pub trait LocalMembershipRepository {
    async fn find_membership(
        &self,
        realm_id: &RealmId,
        user_id: &UserId,
    ) -> RealmResult<Option<Membership>>;

    async fn list_memberships_for_user(&self, user_id: &UserId) -> RealmResult<Vec<Membership>>;

    async fn list_memberships_for_realm(&self, realm_id: &RealmId) -> RealmResult<Vec<Membership>>;

    /// Insert or replace the permissions of a membership
    async fn upsert_membership(&self, membership: &Membership) -> RealmResult<()>;

    /// Returns false when there was no such membership
    async fn delete_membership(&self, realm_id: &RealmId, user_id: &UserId) -> RealmResult<bool>;
}

#[trait_variant::make(AuthorizedAppRepository: Send)]
pub trait LocalAuthorizedAppRepository {
    /// Insert an app; a name taken within the realm is a conflict
    async fn create_app(&self, app: &AuthorizedApp) -> RealmResult<()>;

    async fn find_app(
        &self,
        realm_id: &RealmId,
        app_id: &AuthorizedAppId,
    ) -> RealmResult<Option<AuthorizedApp>>;

    /// Lookup by stored key HMAC, including disabled apps
    async fn find_app_by_hmac(&self, api_key_hmac: &str) -> RealmResult<Option<AuthorizedApp>>;

    async fn list_apps(&self, realm_id: &RealmId) -> RealmResult<Vec<AuthorizedApp>>;

    async fn update_app(&self, app: &AuthorizedApp) -> RealmResult<()>;
}

#[trait_variant::make(MobileAppRepository: Send)]
pub trait LocalMobileAppRepository {
    async fn create_mobile_app(&self, app: &MobileApp) -> RealmResult<()>;

    async fn find_mobile_app(
        &self,
        realm_id: &RealmId,
        app_id: &MobileAppId,
    ) -> RealmResult<Option<MobileApp>>;

    async fn list_mobile_apps(&self, realm_id: &RealmId) -> RealmResult<Vec<MobileApp>>;

    async fn update_mobile_app(&self, app: &MobileApp) -> RealmResult<()>;
}

#[trait_variant::make(ProviderConfigRepository: Send)]
pub trait LocalProviderConfigRepository {
    /// `None` reads the system configuration
    async fn find_sms_config(&self, realm_id: Option<&RealmId>) -> RealmResult<Option<SmsConfig>>;

    async fn upsert_sms_config(&self, config: &SmsConfig) -> RealmResult<()>;

    async fn find_email_config(
        &self,
        realm_id: Option<&RealmId>,
    ) -> RealmResult<Option<EmailConfig>>;

    async fn upsert_email_config(&self, config: &EmailConfig) -> RealmResult<()>;

    async fn list_sms_from_numbers(&self) -> RealmResult<Vec<SmsFromNumber>>;

    /// Replace the whole system list
    async fn replace_sms_from_numbers(&self, numbers: &[SmsFromNumber]) -> RealmResult<()>;
}

#[trait_variant::make(AuditRepository: Send)]
pub trait LocalAuditRepository {
    async fn record_audit(&self, entry: &AuditEntry) -> RealmResult<()>;

    /// Newest first; `None` lists system entries
    async fn list_audit(
        &self,
        realm_id: Option<&RealmId>,
        limit: u32,
        offset: u32,
    ) -> RealmResult<Vec<AuditEntry>>;

    async fn purge_audit_before(&self, before: DateTime<Utc>) -> RealmResult<u64>;
}

#[trait_variant::make(SigningKeyRepository: Send)]
pub trait LocalSigningKeyRepository {
    /// Undeleted keys, oldest first
    async fn list_signing_keys(&self, realm_id: &RealmId) -> RealmResult<Vec<SigningKey>>;

    async fn create_signing_key(&self, key: &SigningKey) -> RealmResult<()>;

    /// Make `key_id` the only active key of the realm; false if it is not a
    /// live key of the realm
    async fn activate_signing_key(
        &self,
        realm_id: &RealmId,
        key_id: &SigningKeyId,
    ) -> RealmResult<bool>;

    /// Soft delete; false if it is not a live key of the realm
    async fn delete_signing_key(
        &self,
        realm_id: &RealmId,
        key_id: &SigningKeyId,
    ) -> RealmResult<bool>;
}

/// Everything the realm use cases need from one store
pub trait RealmStore:
    RealmRepository
    + MembershipRepository
    + AuthorizedAppRepository
    + MobileAppRepository
    + ProviderConfigRepository
    + AuditRepository
    + SigningKeyRepository
    + Clone
    + Send
    + Sync
    + 'static
{
}

impl<T> RealmStore for T where
    T: RealmRepository
        + MembershipRepository
        + AuthorizedAppRepository
        + MobileAppRepository
        + ProviderConfigRepository
        + AuditRepository
        + SigningKeyRepository
        + Clone
        + Send
        + Sync
        + 'static
{
}
