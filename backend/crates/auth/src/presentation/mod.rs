//! Presentation Layer
//!
//! HTTP handlers, DTOs, routers, and middleware.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use handlers::AuthAppState;
pub use middleware::{
    AuthMiddlewareState, Client, require_session, require_session_allow_pending,
    require_system_admin,
};
pub use router::{auth_router, pg_auth_state, realm_users_router, system_users_router};
