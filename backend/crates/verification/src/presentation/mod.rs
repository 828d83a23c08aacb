//! Presentation Layer
//!
//! HTTP handlers, DTOs, the API key middleware and routers.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use handlers::VerificationAppState;
pub use router::{api_router, pg_verification_state, verification_console_router};
