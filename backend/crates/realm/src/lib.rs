//! Realm (Tenant) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits
//! - `application/` - Use cases and application services
//! - `infra/` - Database implementations
//! - `presentation/` - HTTP handlers, DTOs, routers
//!
//! ## Features
//! - Realm creation and settings (code lengths and lifetimes, SMS template,
//!   MFA mode, password policy, certificate parameters)
//! - Memberships with permission bitsets and grant rules
//! - API keys for admin, device and stats clients
//! - Mobile apps, SMS and email provider configuration
//! - Audit log and token signing key rotation

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::RealmConfig;
pub use error::{RealmError, RealmResult};
pub use infra::postgres::PgRealmRepository;
pub use presentation::handlers::RealmAppState;
pub use presentation::router::{admin_router, console_router, pg_realm_state};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod store {
    pub use crate::domain::repository::*;
    #[cfg(any(test, feature = "test-util"))]
    pub use crate::infra::memory::MemoryRealmRepository;
}
