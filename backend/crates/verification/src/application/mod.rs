//! Application Layer - Use Cases
//!
//! This layer contains:
//! - Use cases (issue, status, expire, verify, certificate, statistics)
//! - Application configuration

pub mod caller;
pub mod config;
pub mod issue_certificate;
pub mod issue_code;
pub mod manage_code;
pub mod realm_stats;
pub mod verify_code;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use caller::Caller;
pub use config::VerificationConfig;
pub use issue_certificate::{IssueCertificateUseCase, IssuedCertificate};
pub use issue_code::{IssueCodeInput, IssueCodeUseCase, IssuedCode};
pub use manage_code::ManageCodeUseCase;
pub use realm_stats::RealmStatsUseCase;
pub use verify_code::{VerifiedCode, VerifyCodeUseCase};
