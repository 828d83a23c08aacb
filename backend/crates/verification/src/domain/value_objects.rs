//! Domain Value Objects

use chrono::{Duration, NaiveDate};
use kernel::id::{AuthorizedAppId, UserId};

/// Earliest accepted test or symptom date, in days before today
pub const MAX_DATE_AGE_DAYS: i64 = 14;

/// Bound on the client supplied timezone offset, in minutes
pub const MAX_TZ_OFFSET_MINUTES: i64 = 14 * 60;

/// Which of the two codes a device presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    Short,
    Long,
}

/// Who issued a code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Issuer {
    User(UserId),
    App(AuthorizedAppId),
}

impl Issuer {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Issuer::User(id) => Some(*id),
            Issuer::App(_) => None,
        }
    }

    pub fn app_id(&self) -> Option<AuthorizedAppId> {
        match self {
            Issuer::App(id) => Some(*id),
            Issuer::User(_) => None,
        }
    }

    pub fn from_ids(user_id: Option<UserId>, app_id: Option<AuthorizedAppId>) -> Option<Self> {
        user_id.map(Issuer::User).or(app_id.map(Issuer::App))
    }
}

/// Daily per-realm counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatCounter {
    CodesIssued,
    CodesClaimed,
    TokensClaimed,
}

impl StatCounter {
    pub const fn column(&self) -> &'static str {
        match self {
            StatCounter::CodesIssued => "codes_issued",
            StatCounter::CodesClaimed => "codes_claimed",
            StatCounter::TokensClaimed => "tokens_claimed",
        }
    }
}

/// Range of dates a code may carry, from the issuer's local day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub earliest: NaiveDate,
    pub latest: NaiveDate,
}

impl DateWindow {
    /// `utc_today` shifted by `tz_offset_minutes`, clamped to ±14 hours
    pub fn around(now: chrono::DateTime<chrono::Utc>, tz_offset_minutes: i64) -> Self {
        let offset = tz_offset_minutes.clamp(-MAX_TZ_OFFSET_MINUTES, MAX_TZ_OFFSET_MINUTES);
        let latest = (now + Duration::minutes(offset)).date_naive();
        Self {
            earliest: latest - Duration::days(MAX_DATE_AGE_DAYS),
            latest,
        }
    }

    /// Parses a `YYYY-MM-DD` date and checks it lies in the window
    pub fn parse(&self, field: &str, raw: &str) -> Result<NaiveDate, String> {
        let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|_| format!("{field} must be formatted as YYYY-MM-DD"))?;
        if date < self.earliest {
            return Err(format!("{field} must be on or after {}", self.earliest));
        }
        if date > self.latest {
            return Err(format!("{field} cannot be in the future"));
        }
        Ok(date)
    }
}
