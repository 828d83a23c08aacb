//! Realm Entity
//!
//! A tenant of the verification server (typically one health authority)
//! with its code issuing, SMS, MFA, password and certificate policies.

use chrono::{DateTime, Duration, Utc};
use kernel::id::RealmId;
use platform::password::PasswordRequirements;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::service::sms_template::{DEFAULT_SMS_TEMPLATE, check_template};
use crate::domain::value_object::{MfaMode, TestTypes, region_code::normalize_region_code};

pub const NAME_MAX_LEN: usize = 100;

pub const CODE_LENGTH_RANGE: (u32, u32) = (6, 20);
pub const DEFAULT_CODE_LENGTH: u32 = 8;
pub const CODE_DURATION_MINUTES_RANGE: (i64, i64) = (5, 60);
pub const DEFAULT_CODE_DURATION_MINUTES: i64 = 15;

pub const LONG_CODE_LENGTH_RANGE: (u32, u32) = (12, 24);
pub const DEFAULT_LONG_CODE_LENGTH: u32 = 16;
pub const LONG_CODE_DURATION_HOURS_RANGE: (i64, i64) = (1, 24);
pub const DEFAULT_LONG_CODE_DURATION_HOURS: i64 = 24;

pub const MFA_GRACE_DAYS_MAX: i64 = 30;
pub const PASSWORD_ROTATION_DAYS_MAX: u32 = 365;

pub const CERTIFICATE_DURATION_MINUTES_RANGE: (i64, i64) = (1, 60);
pub const DEFAULT_CERTIFICATE_DURATION_MINUTES: i64 = 15;
pub const DEFAULT_CERTIFICATE_ISSUER: &str = "diagnosis-verification";
pub const DEFAULT_CERTIFICATE_AUDIENCE: &str = "exposure-notifications-server";

#[derive(Debug, Clone, PartialEq)]
pub struct Realm {
    pub id: RealmId,
    pub name: String,
    pub region_code: String,
    pub allowed_test_types: TestTypes,
    pub require_date: bool,

    pub code_length: u32,
    pub code_duration: Duration,
    pub long_code_length: u32,
    pub long_code_duration: Duration,
    pub sms_text_template: String,

    pub mfa_mode: MfaMode,
    pub mfa_required_grace_period: Duration,

    pub password_requirements: PasswordRequirements,
    /// 0 disables rotation
    pub password_rotation_period_days: u32,
    pub password_rotation_warning_days: u32,

    pub certificate_issuer: String,
    pub certificate_audience: String,
    pub certificate_duration: Duration,

    pub use_system_sms_config: bool,
    pub sms_from_number_id: Option<Uuid>,
    pub use_system_email_config: bool,
    /// Only system admins may flip these two
    pub can_use_system_sms_config: bool,
    pub can_use_system_email_config: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Realm {
    /// New realm with default settings
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: RealmId::new(),
            name: name.into().trim().to_string(),
            region_code: String::new(),
            allowed_test_types: TestTypes::all(),
            require_date: false,
            code_length: DEFAULT_CODE_LENGTH,
            code_duration: Duration::minutes(DEFAULT_CODE_DURATION_MINUTES),
            long_code_length: DEFAULT_LONG_CODE_LENGTH,
            long_code_duration: Duration::hours(DEFAULT_LONG_CODE_DURATION_HOURS),
            sms_text_template: DEFAULT_SMS_TEMPLATE.to_string(),
            mfa_mode: MfaMode::default(),
            mfa_required_grace_period: Duration::zero(),
            password_requirements: PasswordRequirements::default(),
            password_rotation_period_days: 0,
            password_rotation_warning_days: 0,
            certificate_issuer: DEFAULT_CERTIFICATE_ISSUER.to_string(),
            certificate_audience: DEFAULT_CERTIFICATE_AUDIENCE.to_string(),
            certificate_duration: Duration::minutes(DEFAULT_CERTIFICATE_DURATION_MINUTES),
            use_system_sms_config: false,
            sms_from_number_id: None,
            use_system_email_config: false,
            can_use_system_sms_config: false,
            can_use_system_email_config: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// First failing rule, if any
    pub fn validate(&self) -> Result<(), String> {
        let name_len = self.name.chars().count();
        if name_len == 0 || name_len > NAME_MAX_LEN {
            return Err(format!("name must be 1 to {} characters", NAME_MAX_LEN));
        }
        normalize_region_code(&self.region_code)?;
        if self.allowed_test_types.is_empty() {
            return Err("at least one test type must be allowed".to_string());
        }

        in_range("code length", self.code_length, CODE_LENGTH_RANGE)?;
        in_range(
            "code duration (minutes)",
            self.code_duration.num_minutes(),
            CODE_DURATION_MINUTES_RANGE,
        )?;
        in_range("long code length", self.long_code_length, LONG_CODE_LENGTH_RANGE)?;
        in_range(
            "long code duration (hours)",
            self.long_code_duration.num_hours(),
            LONG_CODE_DURATION_HOURS_RANGE,
        )?;
        if self.long_code_duration < self.code_duration {
            return Err("long code duration cannot be shorter than code duration".to_string());
        }
        check_template(
            &self.sms_text_template,
            &self.region_code,
            self.code_length,
            self.long_code_length,
        )?;

        in_range(
            "MFA grace period (days)",
            self.mfa_required_grace_period.num_days(),
            (0, MFA_GRACE_DAYS_MAX),
        )?;

        in_range(
            "password rotation period (days)",
            self.password_rotation_period_days,
            (0, PASSWORD_ROTATION_DAYS_MAX),
        )?;
        if self.password_rotation_period_days > 0
            && self.password_rotation_warning_days >= self.password_rotation_period_days
        {
            return Err("password rotation warning must be shorter than the period".to_string());
        }

        if self.certificate_issuer.trim().is_empty() || self.certificate_audience.trim().is_empty()
        {
            return Err("certificate issuer and audience are required".to_string());
        }
        in_range(
            "certificate duration (minutes)",
            self.certificate_duration.num_minutes(),
            CERTIFICATE_DURATION_MINUTES_RANGE,
        )?;

        if self.use_system_sms_config && !self.can_use_system_sms_config {
            return Err("realm is not allowed to use the system SMS configuration".to_string());
        }
        if self.use_system_email_config && !self.can_use_system_email_config {
            return Err("realm is not allowed to use the system email configuration".to_string());
        }
        Ok(())
    }

    /// Apply a patch, returning the names of the fields that changed
    ///
    /// The realm is left untouched when the patched settings do not validate.
    pub fn apply(&mut self, patch: &RealmSettingsPatch) -> Result<Vec<&'static str>, String> {
        let mut next = self.clone();
        let mut changed = Vec::new();

        macro_rules! set {
            ($field:ident, $value:expr, $label:literal) => {
                let value = $value;
                if next.$field != value {
                    next.$field = value;
                    changed.push($label);
                }
            };
        }

        if let Some(name) = &patch.name {
            set!(name, name.trim().to_string(), "name");
        }
        if let Some(region) = &patch.region_code {
            set!(region_code, normalize_region_code(region)?, "region code");
        }
        if let Some(types) = patch.allowed_test_types {
            set!(allowed_test_types, types, "allowed test types");
        }
        if let Some(v) = patch.require_date {
            set!(require_date, v, "require date");
        }
        if let Some(v) = patch.code_length {
            set!(code_length, v, "code length");
        }
        if let Some(v) = patch.code_duration_minutes {
            set!(
                code_duration,
                duration("code duration", v, Duration::try_minutes)?,
                "code duration"
            );
        }
        if let Some(v) = patch.long_code_length {
            set!(long_code_length, v, "long code length");
        }
        if let Some(v) = patch.long_code_duration_hours {
            set!(
                long_code_duration,
                duration("long code duration", v, Duration::try_hours)?,
                "long code duration"
            );
        }
        if let Some(v) = &patch.sms_text_template {
            set!(sms_text_template, v.clone(), "SMS text template");
        }
        if let Some(v) = patch.mfa_mode {
            set!(mfa_mode, v, "MFA mode");
        }
        if let Some(v) = patch.mfa_grace_period_days {
            set!(
                mfa_required_grace_period,
                duration("MFA grace period", v, Duration::try_days)?,
                "MFA grace period"
            );
        }
        if let Some(v) = patch.password_requirements {
            set!(password_requirements, v, "password requirements");
        }
        if let Some(v) = patch.password_rotation_period_days {
            set!(password_rotation_period_days, v, "password rotation period");
        }
        if let Some(v) = patch.password_rotation_warning_days {
            set!(password_rotation_warning_days, v, "password rotation warning");
        }
        if let Some(v) = &patch.certificate_issuer {
            set!(certificate_issuer, v.trim().to_string(), "certificate issuer");
        }
        if let Some(v) = &patch.certificate_audience {
            set!(certificate_audience, v.trim().to_string(), "certificate audience");
        }
        if let Some(v) = patch.certificate_duration_minutes {
            set!(
                certificate_duration,
                duration("certificate duration", v, Duration::try_minutes)?,
                "certificate duration"
            );
        }
        if let Some(v) = patch.can_use_system_sms_config {
            set!(can_use_system_sms_config, v, "can use system SMS config");
            if !v {
                next.use_system_sms_config = false;
            }
        }
        if let Some(v) = patch.can_use_system_email_config {
            set!(can_use_system_email_config, v, "can use system email config");
            if !v {
                next.use_system_email_config = false;
            }
        }
        if let Some(v) = patch.use_system_sms_config {
            set!(use_system_sms_config, v, "use system SMS config");
        }
        if let Some(v) = patch.sms_from_number_id {
            set!(sms_from_number_id, Some(v), "SMS from number");
        }
        if let Some(v) = patch.use_system_email_config {
            set!(use_system_email_config, v, "use system email config");
        }

        next.validate()?;
        if !changed.is_empty() {
            next.updated_at = Utc::now();
            *self = next;
        }
        Ok(changed)
    }

    /// Whether SMS goes through the system-wide provider
    pub fn sends_sms_through_system(&self) -> bool {
        self.use_system_sms_config && self.can_use_system_sms_config
    }

    pub fn sends_email_through_system(&self) -> bool {
        self.use_system_email_config && self.can_use_system_email_config
    }
}

/// Client-supplied amount converted to a duration without overflowing
fn duration(
    label: &str,
    amount: i64,
    unit: fn(i64) -> Option<Duration>,
) -> Result<Duration, String> {
    unit(amount).ok_or_else(|| format!("{} is out of range", label))
}

fn in_range<T>(label: &str, value: T, (min, max): (T, T)) -> Result<(), String>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        Err(format!("{} must be between {} and {}", label, min, max))
    } else {
        Ok(())
    }
}

/// Partial update of realm settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmSettingsPatch {
    pub name: Option<String>,
    pub region_code: Option<String>,
    pub allowed_test_types: Option<TestTypes>,
    pub require_date: Option<bool>,
    pub code_length: Option<u32>,
    pub code_duration_minutes: Option<i64>,
    pub long_code_length: Option<u32>,
    pub long_code_duration_hours: Option<i64>,
    pub sms_text_template: Option<String>,
    pub mfa_mode: Option<MfaMode>,
    pub mfa_grace_period_days: Option<i64>,
    pub password_requirements: Option<PasswordRequirements>,
    pub password_rotation_period_days: Option<u32>,
    pub password_rotation_warning_days: Option<u32>,
    pub certificate_issuer: Option<String>,
    pub certificate_audience: Option<String>,
    pub certificate_duration_minutes: Option<i64>,
    pub use_system_sms_config: Option<bool>,
    pub sms_from_number_id: Option<Uuid>,
    pub use_system_email_config: Option<bool>,
    pub can_use_system_sms_config: Option<bool>,
    pub can_use_system_email_config: Option<bool>,
}

impl RealmSettingsPatch {
    /// Touches settings only system admins may change
    pub fn touches_system_settings(&self) -> bool {
        self.can_use_system_sms_config.is_some() || self.can_use_system_email_config.is_some()
    }
}
