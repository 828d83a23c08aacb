//! Shared Kernel - vocabulary used by every crate of the verification server
//!
//! - Unified error type ([`error::app_error::AppError`]) and HTTP mapping
//! - Typed UUID identifiers for realm-scoped records
//! - The authenticated actor handed from the session layer to feature crates
//!
//! Only things whose meaning is identical across realms, auth and
//! verification belong here.

pub mod actor;
pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
