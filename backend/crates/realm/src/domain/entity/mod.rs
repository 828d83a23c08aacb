//! Entity Module

pub mod audit_entry;
pub mod authorized_app;
pub mod membership;
pub mod mobile_app;
pub mod provider_config;
pub mod realm;
pub mod signing_key;

pub use audit_entry::{AuditActor, AuditEntry};
pub use authorized_app::AuthorizedApp;
pub use membership::Membership;
pub use mobile_app::{MobileApp, MobileOs};
pub use provider_config::{EmailConfig, ProviderKind, SmsConfig, SmsFromNumber};
pub use realm::{Realm, RealmSettingsPatch};
pub use signing_key::SigningKey;
