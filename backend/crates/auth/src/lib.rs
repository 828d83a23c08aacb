//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Business logic, entities, repository traits
//! - `application/` - Use cases and application services
//! - `infra/` - Database implementations
//! - `presentation/` - HTTP handlers, DTOs, routers, middleware
//!
//! ## Features
//! - Console sign-in with email + password and realm-driven MFA
//! - TOTP enrollment (Google Authenticator compatible)
//! - Server-side sessions with signed cookie tokens and realm selection
//! - Password change, emailed reset links and rotation warnings
//! - Realm membership and system user administration
//!
//! ## Security Model
//! - Passwords hashed with Argon2id, complexity from the strictest realm
//! - Sessions bound to client fingerprint (User-Agent)
//! - Lockout for 15 minutes after 5 failed sign-ins

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::bootstrap::bootstrap_admin;
pub use application::config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use infra::postgres::PgAuthRepository;
pub use presentation::handlers::AuthAppState;
pub use presentation::router::{auth_router, pg_auth_state, realm_users_router, system_users_router};

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
    pub use crate::infra::memory::MemoryAuthRepository;
}

pub mod middleware {
    pub use crate::presentation::middleware::*;
}
