//! User Status Value Object

use serde::{Deserialize, Serialize};
use std::fmt;

/// Console account status
///
/// Disabled users keep their memberships but cannot sign in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum UserStatus {
    #[default]
    Active = 0,
    Disabled = 1,
}

impl UserStatus {
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disabled => "disabled",
        }
    }

    #[inline]
    pub const fn can_login(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Unknown ids read back from the database are treated as disabled
    pub fn from_id(id: i16) -> Self {
        match id {
            0 => Self::Active,
            _ => Self::Disabled,
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
