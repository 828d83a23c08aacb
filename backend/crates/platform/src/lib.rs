//! Platform Crate - Technical Infrastructure
//!
//! Shared technical foundations for the verification server:
//! - Cryptographic utilities (SHA-256, HMAC, Base64, random codes)
//! - Secret key material handling
//! - Password hashing (Argon2id) and realm password complexity rules
//! - Cookie and client fingerprint helpers
//! - Keyed rate limiting and TTL caching
//! - SMS / email provider adapters
//! - Named locks for background jobs
//! - Environment configuration helpers

pub mod cache;
pub mod client;
pub mod config;
pub mod cookie;
pub mod crypto;
pub mod lock;
pub mod notify;
pub mod password;
pub mod rate_limit;
pub mod secret;
