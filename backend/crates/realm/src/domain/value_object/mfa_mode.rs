use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Realm policy for MFA enrollment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum MfaMode {
    /// Users are reminded to enroll but never forced
    #[default]
    Prompt = 0,
    Optional = 1,
    /// Enrollment is enforced once the grace period has elapsed
    Required = 2,
}

impl MfaMode {
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MfaMode::Prompt => "prompt",
            MfaMode::Optional => "optional",
            MfaMode::Required => "required",
        }
    }

    pub fn from_id(id: i16) -> Self {
        match id {
            1 => MfaMode::Optional,
            2 => MfaMode::Required,
            _ => MfaMode::Prompt,
        }
    }
}

impl fmt::Display for MfaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MfaMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prompt" => Ok(MfaMode::Prompt),
            "optional" => Ok(MfaMode::Optional),
            "required" => Ok(MfaMode::Required),
            other => Err(format!("unknown MFA mode: {other}")),
        }
    }
}
