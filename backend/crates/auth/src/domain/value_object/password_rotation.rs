//! Password Rotation Status

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordRotation {
    pub expired: bool,
    /// Set while inside a realm's warning window
    pub expires_in_days: Option<i64>,
}

/// Rotation status against every `(period_days, warning_days)` policy
///
/// A period of 0 disables rotation for that realm. The earliest deadline
/// wins.
pub fn rotation_status<I>(
    password_changed_at: DateTime<Utc>,
    policies: I,
    now: DateTime<Utc>,
) -> PasswordRotation
where
    I: IntoIterator<Item = (u32, u32)>,
{
    let mut status = PasswordRotation::default();

    for (period_days, warning_days) in policies {
        if period_days == 0 {
            continue;
        }
        let deadline = password_changed_at + Duration::days(i64::from(period_days));
        if now >= deadline {
            return PasswordRotation {
                expired: true,
                expires_in_days: Some(0),
            };
        }

        let remaining = (deadline - now).num_days();
        if remaining < i64::from(warning_days) {
            status.expires_in_days = Some(
                status
                    .expires_in_days
                    .map_or(remaining, |current| current.min(remaining)),
            );
        }
    }

    status
}
