//! Value Object Module

pub mod email;
pub mod mfa;
pub mod password_rotation;
pub mod session_token;
pub mod totp_secret;
pub mod user_status;

pub use email::Email;
pub use mfa::{MfaDecision, resolve_mfa, strictest_mfa};
pub use password_rotation::{PasswordRotation, rotation_status};
pub use totp_secret::TotpSecret;
pub use user_status::UserStatus;
