//! Session Actor
//!
//! The authenticated principal behind a console request. The auth session
//! middleware inserts it into request extensions; realm and verification
//! handlers read it with `Extension<SessionActor>`.

use serde::Serialize;
use uuid::Uuid;

use crate::id::{RealmId, UserId};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionActor {
    pub user_id: UserId,
    pub session_id: Uuid,
    pub email: String,
    pub name: String,
    /// System administrators manage realms and system-wide provider config
    pub system_admin: bool,
    /// Realm currently selected in this session
    pub realm_id: Option<RealmId>,
}

impl SessionActor {
    /// Display string used in audit entries
    pub fn display(&self) -> String {
        format!("{} ({})", self.name, self.email)
    }
}
