//! Realm permissions
//!
//! A membership carries a bitset of permissions. Write permissions imply
//! their read counterpart, bulk issue implies issue and expiring codes
//! implies reading them; implications are applied on every grant.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Permissions(u32);

impl Permissions {
    pub const NONE: Self = Self(0);
    pub const AUDIT_READ: Self = Self(1 << 0);
    pub const API_KEY_READ: Self = Self(1 << 1);
    pub const API_KEY_WRITE: Self = Self(1 << 2);
    pub const CODE_ISSUE: Self = Self(1 << 3);
    pub const CODE_BULK_ISSUE: Self = Self(1 << 4);
    pub const CODE_READ: Self = Self(1 << 5);
    pub const CODE_EXPIRE: Self = Self(1 << 6);
    pub const SETTINGS_READ: Self = Self(1 << 7);
    pub const SETTINGS_WRITE: Self = Self(1 << 8);
    pub const STATS_READ: Self = Self(1 << 9);
    pub const MOBILE_APP_READ: Self = Self(1 << 10);
    pub const MOBILE_APP_WRITE: Self = Self(1 << 11);
    pub const USER_READ: Self = Self(1 << 12);
    pub const USER_WRITE: Self = Self(1 << 13);

    const NAMED: [(Permissions, &'static str); 14] = [
        (Self::AUDIT_READ, "AuditRead"),
        (Self::API_KEY_READ, "ApiKeyRead"),
        (Self::API_KEY_WRITE, "ApiKeyWrite"),
        (Self::CODE_ISSUE, "CodeIssue"),
        (Self::CODE_BULK_ISSUE, "CodeBulkIssue"),
        (Self::CODE_READ, "CodeRead"),
        (Self::CODE_EXPIRE, "CodeExpire"),
        (Self::SETTINGS_READ, "SettingsRead"),
        (Self::SETTINGS_WRITE, "SettingsWrite"),
        (Self::STATS_READ, "StatsRead"),
        (Self::MOBILE_APP_READ, "MobileAppRead"),
        (Self::MOBILE_APP_WRITE, "MobileAppWrite"),
        (Self::USER_READ, "UserRead"),
        (Self::USER_WRITE, "UserWrite"),
    ];

    /// (granted, implied) pairs
    const IMPLICATIONS: [(Permissions, Permissions); 6] = [
        (Self::API_KEY_WRITE, Self::API_KEY_READ),
        (Self::SETTINGS_WRITE, Self::SETTINGS_READ),
        (Self::MOBILE_APP_WRITE, Self::MOBILE_APP_READ),
        (Self::USER_WRITE, Self::USER_READ),
        (Self::CODE_BULK_ISSUE, Self::CODE_ISSUE),
        (Self::CODE_EXPIRE, Self::CODE_READ),
    ];

    const ALL_BITS: u32 = (1 << 14) - 1;

    #[inline]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Unknown bits are dropped
    #[inline]
    pub const fn from_bits_truncate(bits: i64) -> Self {
        Self((bits as u32) & Self::ALL_BITS)
    }

    #[inline]
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn all() -> Self {
        Self(Self::ALL_BITS)
    }

    /// Every permission
    pub fn admin() -> Self {
        Self::all()
    }

    /// Day-to-day code issuing
    pub fn operator() -> Self {
        (Self::CODE_ISSUE
            | Self::CODE_BULK_ISSUE
            | Self::CODE_READ
            | Self::CODE_EXPIRE
            | Self::SETTINGS_READ
            | Self::MOBILE_APP_READ
            | Self::STATS_READ)
            .implied()
    }

    /// All read permissions
    pub fn viewer() -> Self {
        Self::AUDIT_READ
            | Self::API_KEY_READ
            | Self::CODE_READ
            | Self::SETTINGS_READ
            | Self::STATS_READ
            | Self::MOBILE_APP_READ
            | Self::USER_READ
    }

    /// Closure over the implication table
    pub fn implied(self) -> Self {
        Self::IMPLICATIONS
            .iter()
            .filter(|(granted, _)| self.contains(*granted))
            .fold(self, |acc, (_, implied)| acc | *implied)
    }

    /// Whether a holder of `self` may hand out `requested`
    pub fn can_grant(self, requested: Self) -> bool {
        self.implied().contains(requested.implied())
    }

    pub fn names(&self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|(perm, _)| self.contains(*perm))
            .map(|(_, name)| *name)
            .collect()
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMED
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(perm, _)| *perm)
    }

    /// Parse a list of names; the first unknown name is returned as the error
    pub fn from_names<'a, I>(names: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names.into_iter().try_fold(Self::NONE, |acc, name| {
            Self::from_name(name)
                .map(|perm| acc | perm)
                .ok_or_else(|| name.to_string())
        })
    }
}

impl BitOr for Permissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Permissions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Permissions({})", self.names().join(" | "))
    }
}

impl Serialize for Permissions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let names = self.names();
        let mut seq = serializer.serialize_seq(Some(names.len()))?;
        for name in names {
            seq.serialize_element(name)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        Permissions::from_names(names.iter().map(String::as_str))
            .map_err(|name| de::Error::custom(format!("unknown permission: {name}")))
    }
}
