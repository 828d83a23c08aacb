//! Infrastructure Layer
//!
//! Repository implementations.

#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod postgres;

#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryRealmRepository;
pub use postgres::PgRealmRepository;
