//! Infrastructure Layer
//!
//! Database implementations.

#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod postgres;

pub use postgres::PgAuthRepository;
