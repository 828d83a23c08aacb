//! MFA Decision
//!
//! What a sign-in must do about two-factor authentication, given the realm
//! policy and whether the user has an authenticator enrolled.

use chrono::{DateTime, Duration, Utc};
use realm::models::MfaMode;
use serde::Serialize;

/// Ordered from most to least permissive, so `max` is the strictest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MfaDecision {
    Allow,
    PromptEnrollment,
    RequireEnrollment,
    /// Enrolled; a TOTP code must accompany the password
    Verify,
}

impl MfaDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            MfaDecision::Allow => "allow",
            MfaDecision::PromptEnrollment => "promptEnrollment",
            MfaDecision::RequireEnrollment => "requireEnrollment",
            MfaDecision::Verify => "verify",
        }
    }
}

pub fn resolve_mfa(
    mode: MfaMode,
    enrolled: bool,
    user_created_at: DateTime<Utc>,
    grace: Duration,
    now: DateTime<Utc>,
) -> MfaDecision {
    if enrolled {
        return MfaDecision::Verify;
    }
    match mode {
        MfaMode::Required if now >= user_created_at + grace => MfaDecision::RequireEnrollment,
        MfaMode::Required | MfaMode::Prompt => MfaDecision::PromptEnrollment,
        MfaMode::Optional => MfaDecision::Allow,
    }
}

/// Strictest decision across every realm of a user
///
/// Users without realms (system admins) are only asked for a code when
/// enrolled.
pub fn strictest_mfa<I>(
    policies: I,
    enrolled: bool,
    user_created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> MfaDecision
where
    I: IntoIterator<Item = (MfaMode, Duration)>,
{
    if enrolled {
        return MfaDecision::Verify;
    }
    policies
        .into_iter()
        .map(|(mode, grace)| resolve_mfa(mode, false, user_created_at, grace, now))
        .max()
        .unwrap_or(MfaDecision::Allow)
}
