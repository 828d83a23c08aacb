use chrono::{DateTime, Utc};
use kernel::actor::SessionActor;
use kernel::id::{AuditEntryId, RealmId};

/// Who performed an audited action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditActor {
    pub id: String,
    pub display: String,
}

impl From<&SessionActor> for AuditActor {
    fn from(actor: &SessionActor) -> Self {
        Self {
            id: actor.user_id.to_string(),
            display: actor.display(),
        }
    }
}

/// An administrative change. `realm_id == None` marks system-level events.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub realm_id: Option<RealmId>,
    pub actor_id: String,
    pub actor_display: String,
    pub action: String,
    pub target_id: String,
    pub target_display: String,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        realm_id: Option<RealmId>,
        actor: &AuditActor,
        action: impl Into<String>,
        target_id: impl ToString,
        target_display: impl Into<String>,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            realm_id,
            actor_id: actor.id.clone(),
            actor_display: actor.display.clone(),
            action: action.into(),
            target_id: target_id.to_string(),
            target_display: target_display.into(),
            created_at: Utc::now(),
        }
    }
}
