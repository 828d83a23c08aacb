//! Mobile App Entity
//!
//! Apps that may open realm SMS links (app links / universal links).

use chrono::{DateTime, Utc};
use kernel::id::{MobileAppId, RealmId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum MobileOs {
    Ios = 1,
    Android = 2,
}

impl MobileOs {
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(MobileOs::Ios),
            2 => Some(MobileOs::Android),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MobileApp {
    pub id: MobileAppId,
    pub realm_id: RealmId,
    pub name: String,
    pub os: MobileOs,
    /// Bundle id (iOS) or package name (Android)
    pub app_id: String,
    /// Store or landing page URL
    pub url: String,
    /// Android signing certificate fingerprints, comma separated
    pub sha: String,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MobileApp {
    pub fn new(
        realm_id: RealmId,
        name: String,
        os: MobileOs,
        app_id: String,
        url: String,
        sha: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: MobileAppId::new(),
            realm_id,
            name: name.trim().to_string(),
            os,
            app_id: app_id.trim().to_string(),
            url: url.trim().to_string(),
            sha: normalize_sha(&sha),
            disabled: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() || self.name.chars().count() > 100 {
            return Err("name must be 1 to 100 characters".to_string());
        }
        let app_id_ok = !self.app_id.is_empty()
            && self.app_id.contains('.')
            && self
                .app_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !app_id_ok {
            return Err("app id must be a reverse-DNS identifier".to_string());
        }
        if !self.url.is_empty() && !self.url.starts_with("https://") {
            return Err("url must use https".to_string());
        }
        match self.os {
            MobileOs::Android if self.sha.is_empty() => {
                Err("Android apps need at least one SHA-256 fingerprint".to_string())
            }
            MobileOs::Android => self.sha.split(',').try_for_each(check_fingerprint),
            MobileOs::Ios => Ok(()),
        }
    }
}

fn normalize_sha(raw: &str) -> String {
    raw.split([',', '\n'])
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// `AA:BB:...` with 32 hex pairs
fn check_fingerprint(fp: &str) -> Result<(), String> {
    let pairs: Vec<&str> = fp.split(':').collect();
    let ok = pairs.len() == 32
        && pairs
            .iter()
            .all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_hexdigit()));
    if ok {
        Ok(())
    } else {
        Err(format!("invalid SHA-256 fingerprint: {fp}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fingerprint() -> String {
        vec!["ab"; 32].join(":")
    }

    #[test]
    fn test_android_app_validation() {
        let app = MobileApp::new(
            RealmId::new(),
            "Exposure App".into(),
            MobileOs::Android,
            "gov.wa.exposure".into(),
            "https://play.google.com/store/apps/details?id=gov.wa.exposure".into(),
            format!(" {} ,", fingerprint()),
        );
        assert!(app.validate().is_ok());
        assert_eq!(app.sha, fingerprint().to_ascii_uppercase());

        let mut no_sha = app.clone();
        no_sha.sha.clear();
        assert!(no_sha.validate().is_err());

        let mut bad_sha = app.clone();
        bad_sha.sha = "AB:CD".into();
        assert!(bad_sha.validate().is_err());
    }

    #[test]
    fn test_ios_app_validation() {
        let mut app = MobileApp::new(
            RealmId::new(),
            "Exposure".into(),
            MobileOs::Ios,
            "gov.wa.exposure".into(),
            "http://apps.apple.com/app".into(),
            String::new(),
        );
        assert!(app.validate().is_err());

        app.url = "https://apps.apple.com/app".into();
        assert!(app.validate().is_ok());

        app.app_id = "no spaces allowed".into();
        assert!(app.validate().is_err());
    }
}
