use chrono::{DateTime, Utc};
use kernel::id::{RealmId, UserId};

use crate::domain::value_object::Permissions;

/// A user's access to one realm
#[derive(Debug, Clone, PartialEq)]
pub struct Membership {
    pub realm_id: RealmId,
    pub user_id: UserId,
    /// Always stored with implications applied
    pub permissions: Permissions,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(realm_id: RealmId, user_id: UserId, permissions: Permissions) -> Self {
        let now = Utc::now();
        Self {
            realm_id,
            user_id,
            permissions: permissions.implied(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_permissions(&mut self, permissions: Permissions) {
        self.permissions = permissions.implied();
        self.updated_at = Utc::now();
    }

    pub fn can(&self, permission: Permissions) -> bool {
        self.permissions.contains(permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_stores_implied_permissions() {
        let mut m = Membership::new(RealmId::new(), UserId::new(), Permissions::USER_WRITE);
        assert!(m.can(Permissions::USER_READ));

        m.set_permissions(Permissions::CODE_BULK_ISSUE);
        assert!(m.can(Permissions::CODE_ISSUE));
        assert!(!m.can(Permissions::USER_READ));
    }
}
