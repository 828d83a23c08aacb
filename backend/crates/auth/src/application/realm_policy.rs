//! Realm policies that apply to a user
//!
//! MFA mode, password complexity and rotation are realm settings; a user in
//! several realms is held to the strictest of them.

use chrono::{DateTime, Utc};
use kernel::id::UserId;
use platform::password::PasswordRequirements;
use realm::models::{Membership, MfaMode, Realm};
use realm::store::{MembershipRepository, RealmRepository};

use crate::domain::entity::{Credential, User};
use crate::domain::value_object::{MfaDecision, PasswordRotation, rotation_status, strictest_mfa};
use crate::error::AuthResult;

/// Memberships of a user together with their realms
pub struct UserRealms {
    pub memberships: Vec<Membership>,
    pub realms: Vec<Realm>,
}

impl UserRealms {
    pub async fn load<R>(repo: &R, user_id: &UserId) -> AuthResult<Self>
    where
        R: MembershipRepository + RealmRepository,
    {
        let memberships = repo.list_memberships_for_user(user_id).await?;
        let mut realms = Vec::with_capacity(memberships.len());
        for membership in &memberships {
            if let Some(realm) = repo.find_realm(&membership.realm_id).await? {
                realms.push(realm);
            }
        }
        Ok(Self { memberships, realms })
    }

    pub fn mfa_decision(&self, user: &User, credential: &Credential, now: DateTime<Utc>) -> MfaDecision {
        strictest_mfa(
            self.realms
                .iter()
                .map(|r| (r.mfa_mode, r.mfa_required_grace_period)),
            credential.is_enrolled(),
            user.created_at,
            now,
        )
    }

    pub fn requires_mfa(&self) -> bool {
        self.realms.iter().any(|r| r.mfa_mode == MfaMode::Required)
    }

    pub fn password_requirements(&self) -> PasswordRequirements {
        PasswordRequirements::strictest(self.realms.iter().map(|r| r.password_requirements))
    }

    pub fn password_rotation(&self, credential: &Credential, now: DateTime<Utc>) -> PasswordRotation {
        rotation_status(
            credential.password_changed_at,
            self.realms.iter().map(|r| {
                (
                    r.password_rotation_period_days,
                    r.password_rotation_warning_days,
                )
            }),
            now,
        )
    }

    /// The realm to select automatically at sign-in
    pub fn single_realm(&self) -> Option<&Realm> {
        match self.realms.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}
