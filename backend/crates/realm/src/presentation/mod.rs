//! Presentation Layer
//!
//! HTTP handlers, DTOs and routers.

pub mod dto;
pub mod handlers;
pub mod router;

pub use handlers::RealmAppState;
pub use router::{admin_router, console_router, pg_realm_state};
