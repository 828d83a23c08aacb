//! Entity Module

pub mod auth_session;
pub mod credential;
pub mod password_reset;
pub mod user;

pub use auth_session::{AuthSession, SessionClient};
pub use credential::Credential;
pub use password_reset::PasswordResetToken;
pub use user::User;
