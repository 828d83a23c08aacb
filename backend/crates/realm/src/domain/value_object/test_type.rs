//! Diagnosis test types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum TestType {
    Confirmed = 1,
    Likely = 2,
    Negative = 4,
}

impl TestType {
    pub const ALL: [TestType; 3] = [TestType::Confirmed, TestType::Likely, TestType::Negative];

    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TestType::Confirmed => "confirmed",
            TestType::Likely => "likely",
            TestType::Negative => "negative",
        }
    }

    pub fn from_id(id: i16) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id() == id)
    }

    /// Test types a device accepts when it asks for `self`
    ///
    /// Accepting a weaker diagnosis implies accepting the stronger ones:
    /// confirmed ⊂ likely ⊂ negative.
    pub fn accepted_set(self) -> TestTypes {
        match self {
            TestType::Confirmed => TestTypes::from(TestType::Confirmed),
            TestType::Likely => TestType::Confirmed | TestType::Likely,
            TestType::Negative => TestTypes::all(),
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "confirmed" => Ok(TestType::Confirmed),
            "likely" => Ok(TestType::Likely),
            "negative" => Ok(TestType::Negative),
            other => Err(format!("unknown test type: {other}")),
        }
    }
}

impl std::ops::BitOr for TestType {
    type Output = TestTypes;

    fn bitor(self, rhs: Self) -> TestTypes {
        TestTypes::from(self) | TestTypes::from(rhs)
    }
}

/// Set of test types stored as a bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TestTypes(i16);

impl TestTypes {
    pub const fn all() -> Self {
        Self(1 | 2 | 4)
    }

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(&self) -> i16 {
        self.0
    }

    pub const fn from_bits_truncate(bits: i16) -> Self {
        Self(bits & Self::all().0)
    }

    pub const fn contains(&self, test_type: TestType) -> bool {
        self.0 & test_type.id() != 0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Union of the accepted sets of every requested type; `[confirmed]`
    /// when nothing was requested
    pub fn accepting(requested: &[TestType]) -> Self {
        if requested.is_empty() {
            return TestType::Confirmed.accepted_set();
        }
        requested
            .iter()
            .fold(Self::empty(), |acc, t| acc | t.accepted_set())
    }

    pub fn iter(&self) -> impl Iterator<Item = TestType> + '_ {
        TestType::ALL.into_iter().filter(|t| self.contains(*t))
    }
}

impl From<TestType> for TestTypes {
    fn from(t: TestType) -> Self {
        Self(t.id())
    }
}

impl FromIterator<TestType> for TestTypes {
    fn from_iter<I: IntoIterator<Item = TestType>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), |acc, t| acc | Self::from(t))
    }
}

impl std::ops::BitOr for TestTypes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl Serialize for TestTypes {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for TestTypes {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Vec::<TestType>::deserialize(deserializer)?.into_iter().collect())
    }
}
