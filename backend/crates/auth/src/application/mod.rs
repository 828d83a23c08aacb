//! Application Layer
//!
//! Use cases and application services.

pub mod bootstrap;
pub mod change_password;
pub mod check_session;
pub mod config;
pub mod password_reset;
pub mod realm_policy;
pub mod realm_selection;
pub mod realm_users;
pub mod session_status;
pub mod sign_in;
pub mod sign_out;
pub mod system_users;
pub mod totp_setup;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use bootstrap::bootstrap_admin;
pub use change_password::ChangePasswordUseCase;
pub use check_session::{Authenticated, CheckSessionUseCase};
pub use config::AuthConfig;
pub use password_reset::PasswordResetUseCase;
pub use realm_policy::UserRealms;
pub use realm_selection::{RealmChoice, RealmSelectionUseCase};
pub use realm_users::{RealmMember, RealmUsersUseCase};
pub use session_status::{SessionStatus, SessionStatusUseCase};
pub use sign_in::{SignInInput, SignInOutput, SignInUseCase};
pub use sign_out::SignOutUseCase;
pub use system_users::SystemUsersUseCase;
pub use totp_setup::{TotpSetupOutput, TotpSetupUseCase};
