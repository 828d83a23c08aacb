//! Value Object Module

pub mod api_key;
pub mod mfa_mode;
pub mod permission;
pub mod region_code;
pub mod test_type;

pub use api_key::ApiKeyType;
pub use mfa_mode::MfaMode;
pub use permission::Permissions;
pub use test_type::{TestType, TestTypes};
