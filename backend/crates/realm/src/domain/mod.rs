//! Domain Layer
//!
//! Entities, value objects, domain services and repository traits.

pub mod entity;
pub mod repository;
pub mod service;
pub mod value_object;

pub use entity::{AuthorizedApp, Membership, Realm, SigningKey};
pub use repository::RealmStore;
