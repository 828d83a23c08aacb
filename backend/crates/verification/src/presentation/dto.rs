//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, NaiveDate, Utc};
use realm::models::TestType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::{IssueCodeInput, IssuedCertificate, IssuedCode, VerifiedCode};
use crate::domain::entities::{RealmStats, VerificationCode};

// ============================================================================
// Issue
// ============================================================================

/// Request for issuing a code (console and admin API)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCodeRequest {
    pub test_type: Option<TestType>,
    pub symptom_date: Option<String>,
    pub test_date: Option<String>,
    /// Minutes east of UTC; fractional offsets are rounded
    #[serde(default)]
    pub tz_offset: f64,
    pub phone: Option<String>,
    pub uuid: Option<Uuid>,
}

impl From<IssueCodeRequest> for IssueCodeInput {
    fn from(req: IssueCodeRequest) -> Self {
        Self {
            test_type: req.test_type,
            symptom_date: req.symptom_date,
            test_date: req.test_date,
            tz_offset_minutes: req.tz_offset.round() as i64,
            phone: req.phone,
            uuid: req.uuid,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCodeResponse {
    pub uuid: Uuid,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub expires_at_timestamp: i64,
    pub long_expires_at: DateTime<Utc>,
    pub long_expires_at_timestamp: i64,
}

impl From<IssuedCode> for IssueCodeResponse {
    fn from(issued: IssuedCode) -> Self {
        Self {
            uuid: issued.code.uuid,
            code: issued.plain.code,
            expires_at: issued.code.expires_at,
            expires_at_timestamp: issued.code.expires_at.timestamp(),
            long_expires_at: issued.code.long_expires_at,
            long_expires_at_timestamp: issued.code.long_expires_at.timestamp(),
        }
    }
}

// ============================================================================
// Status / Expire
// ============================================================================

/// Admin API body naming a code
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeUuidRequest {
    pub uuid: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeStatusResponse {
    pub uuid: Uuid,
    pub test_type: TestType,
    pub claimed: bool,
    pub expires_at_timestamp: i64,
    pub long_expires_at_timestamp: i64,
    pub created_at: DateTime<Utc>,
}

impl From<VerificationCode> for CodeStatusResponse {
    fn from(code: VerificationCode) -> Self {
        Self {
            uuid: code.uuid,
            test_type: code.test_type,
            claimed: code.claimed,
            expires_at_timestamp: code.expires_at.timestamp(),
            long_expires_at_timestamp: code.long_expires_at.timestamp(),
            created_at: code.created_at,
        }
    }
}

// ============================================================================
// Device API
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    pub code: String,
    #[serde(default)]
    pub accept: Vec<TestType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyResponse {
    #[serde(rename = "testtype")]
    pub test_type: TestType,
    #[serde(rename = "symptomDate", skip_serializing_if = "Option::is_none")]
    pub symptom_date: Option<NaiveDate>,
    #[serde(rename = "testDate", skip_serializing_if = "Option::is_none")]
    pub test_date: Option<NaiveDate>,
    pub token: String,
}

impl From<VerifiedCode> for VerifyResponse {
    fn from(v: VerifiedCode) -> Self {
        Self {
            test_type: v.test_type,
            symptom_date: v.symptom_date,
            test_date: v.test_date,
            token: v.token,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CertificateRequest {
    pub token: String,
    pub ekeyhmac: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateResponse {
    pub certificate: String,
    pub expires_at: DateTime<Utc>,
}

impl From<IssuedCertificate> for CertificateResponse {
    fn from(c: IssuedCertificate) -> Self {
        Self {
            certificate: c.certificate,
            expires_at: c.expires_at,
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct StatsQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmStatsResponse {
    pub date: NaiveDate,
    pub codes_issued: i64,
    pub codes_claimed: i64,
    pub tokens_claimed: i64,
}

impl From<RealmStats> for RealmStatsResponse {
    fn from(s: RealmStats) -> Self {
        Self {
            date: s.date,
            codes_issued: s.codes_issued,
            codes_claimed: s.codes_claimed,
            tokens_claimed: s.tokens_claimed,
        }
    }
}
