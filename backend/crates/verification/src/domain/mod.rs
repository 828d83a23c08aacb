//! Domain Layer - Business logic and entities
//!
//! This layer contains:
//! - Domain entities (VerificationCode, VerificationToken, RealmStats)
//! - Domain value objects (CodeKind, Issuer, DateWindow)
//! - Domain services (code hashing, JWS signing)
//! - Repository traits (interfaces)

pub mod entities;
pub mod repository;
pub mod services;
pub mod value_objects;
