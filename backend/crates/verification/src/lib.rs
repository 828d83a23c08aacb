//! Verification Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Codes, tokens, statistics, repository traits
//! - `application/` - Use cases
//! - `infra/` - Database implementations
//! - `presentation/` - HTTP handlers, API key middleware, routers
//!
//! ## Flow
//! - A health authority issues a short and a long code (console or admin API)
//! - The device exchanges one of them for a signed verification token
//! - The token and an HMAC of the device's exposure keys become a certificate
//!
//! ## Security Model
//! - Only HMACs of codes are stored; plain codes are returned once
//! - Claiming a code and using a token are atomic (no double-spend)
//! - API keys are bound to a realm and a key type, and rate limited per key

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::VerificationConfig;
pub use error::{VerificationError, VerificationResult};
pub use infra::postgres::PgVerificationRepository;
pub use presentation::handlers::VerificationAppState;
pub use presentation::router::{api_router, pg_verification_state, verification_console_router};

pub mod models {
    pub use crate::domain::entities::*;
    pub use crate::domain::value_objects::*;
    pub use crate::presentation::dto::*;
}

pub mod store {
    pub use crate::domain::repository::*;
    #[cfg(any(test, feature = "test-util"))]
    pub use crate::infra::memory::MemoryVerificationRepository;
}

#[cfg(test)]
mod tests;
