//! Domain Layer
//!
//! Contains entities, value objects, and repository traits.

pub mod entity;
pub mod repository;
pub mod value_object;

pub use entity::{AuthSession, Credential, PasswordResetToken, User};
pub use repository::AuthStore;
