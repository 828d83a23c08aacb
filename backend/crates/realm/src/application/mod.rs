//! Application Layer
//!
//! Use cases and application services.

pub mod api_keys;
pub mod audit;
pub mod authorize;
pub mod config;
pub mod mobile_apps;
pub mod provider_config;
pub mod realm_admin;
pub mod realm_settings;
pub mod signing_keys;

// Re-exports
pub use api_keys::{ApiKeyCache, ApiKeyUseCase, CreatedApiKey};
pub use audit::{AuditUseCase, Page};
pub use authorize::{actor_permissions, authorize, require_system_admin, selected_realm};
pub use config::RealmConfig;
pub use mobile_apps::{MobileAppInput, MobileAppUseCase};
pub use provider_config::{
    EmailConfigInput, FromNumberInput, ProviderConfigUseCase, ResolvedEmail, ResolvedSms,
    SmsConfigInput, resolve_email_provider, resolve_sms_provider,
};
pub use realm_admin::RealmAdminUseCase;
pub use realm_settings::RealmSettingsUseCase;
pub use signing_keys::{SigningKeyUseCase, active_key, find_key};
