//! Domain Entities

use chrono::{DateTime, Duration, NaiveDate, Utc};
use kernel::id::{RealmId, VerificationCodeId, VerificationTokenId};
use realm::models::TestType;
use uuid::Uuid;

use crate::domain::value_objects::{CodeKind, Issuer};

/// Verification code entity
///
/// Only HMACs of the short and long code are kept. A code can be claimed
/// once, through either of them.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationCode {
    pub id: VerificationCodeId,
    pub realm_id: RealmId,
    /// Public handle for status and expiry lookups
    pub uuid: Uuid,
    pub code_hmac: String,
    pub long_code_hmac: String,
    pub test_type: TestType,
    pub symptom_date: Option<NaiveDate>,
    pub test_date: Option<NaiveDate>,
    pub issuer: Option<Issuer>,
    pub phone_provided: bool,
    pub claimed: bool,
    pub expires_at: DateTime<Utc>,
    pub long_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl VerificationCode {
    /// Which code an HMAC refers to
    pub fn kind_of(&self, hmac: &str) -> Option<CodeKind> {
        if self.code_hmac == hmac {
            Some(CodeKind::Short)
        } else if self.long_code_hmac == hmac {
            Some(CodeKind::Long)
        } else {
            None
        }
    }

    pub fn expires_for(&self, kind: CodeKind) -> DateTime<Utc> {
        match kind {
            CodeKind::Short => self.expires_at,
            CodeKind::Long => self.long_expires_at,
        }
    }

    pub fn is_expired(&self, kind: CodeKind, now: DateTime<Utc>) -> bool {
        self.expires_for(kind) <= now
    }

    /// Neither code can be redeemed anymore
    pub fn is_fully_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_expired(CodeKind::Short, now) && self.is_expired(CodeKind::Long, now)
    }
}

/// Verification token entity
///
/// Handed to a device in exchange for a code; one certificate per token.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationToken {
    pub id: VerificationTokenId,
    pub realm_id: RealmId,
    pub code_id: VerificationCodeId,
    pub test_type: TestType,
    pub symptom_date: Option<NaiveDate>,
    pub test_date: Option<NaiveDate>,
    pub used: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl VerificationToken {
    pub fn for_code(code: &VerificationCode, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            id: VerificationTokenId::new(),
            realm_id: code.realm_id,
            code_id: code.id,
            test_type: code.test_type,
            symptom_date: code.symptom_date,
            test_date: code.test_date,
            used: false,
            expires_at: now + ttl,
            created_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Counters of one realm for one UTC day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealmStats {
    pub realm_id: RealmId,
    pub date: NaiveDate,
    pub codes_issued: i64,
    pub codes_claimed: i64,
    pub tokens_claimed: i64,
}

impl RealmStats {
    pub fn empty(realm_id: RealmId, date: NaiveDate) -> Self {
        Self {
            realm_id,
            date,
            codes_issued: 0,
            codes_claimed: 0,
            tokens_claimed: 0,
        }
    }
}
