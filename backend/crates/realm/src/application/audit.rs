//! Audit Log Use Case
//!
//! Records administrative changes and lists them per realm or system wide.

use std::sync::Arc;

use kernel::actor::SessionActor;
use kernel::id::RealmId;

use crate::application::authorize::{authorize, require_system_admin, selected_realm};
use crate::domain::entity::{AuditActor, AuditEntry};
use crate::domain::repository::{AuditRepository, MembershipRepository};
use crate::domain::value_object::Permissions;
use crate::error::RealmResult;

pub const DEFAULT_PAGE_SIZE: u32 = 25;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Store an audit entry for an action performed by `actor`
pub async fn record<R>(
    repo: &R,
    realm_id: Option<RealmId>,
    actor: &SessionActor,
    action: &str,
    target_id: impl ToString,
    target_display: impl Into<String>,
) -> RealmResult<()>
where
    R: AuditRepository,
{
    let entry = AuditEntry::new(
        realm_id,
        &AuditActor::from(actor),
        action,
        target_id,
        target_display,
    );
    repo.record_audit(&entry).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    /// Clamp a requested page to `1..=MAX_PAGE_SIZE`
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

pub struct AuditUseCase<R>
where
    R: AuditRepository + MembershipRepository,
{
    repo: Arc<R>,
}

impl<R> AuditUseCase<R>
where
    R: AuditRepository + MembershipRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Entries of the actor's selected realm, newest first
    pub async fn list_realm(&self, actor: &SessionActor, page: Page) -> RealmResult<Vec<AuditEntry>> {
        let realm_id = selected_realm(actor)?;
        authorize(self.repo.as_ref(), actor, &realm_id, Permissions::AUDIT_READ).await?;
        self.repo
            .list_audit(Some(&realm_id), page.limit, page.offset)
            .await
    }

    /// System-level entries
    pub async fn list_system(&self, actor: &SessionActor, page: Page) -> RealmResult<Vec<AuditEntry>> {
        require_system_admin(actor)?;
        self.repo.list_audit(None, page.limit, page.offset).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Membership;
    use crate::infra::memory::MemoryRealmRepository;
    use kernel::id::UserId;
    use uuid::Uuid;

    fn actor(realm_id: RealmId) -> SessionActor {
        SessionActor {
            user_id: UserId::new(),
            session_id: Uuid::new_v4(),
            email: "auditor@example.com".into(),
            name: "Auditor".into(),
            system_admin: false,
            realm_id: Some(realm_id),
        }
    }

    #[test]
    fn test_page_clamp() {
        assert_eq!(Page::default().limit, DEFAULT_PAGE_SIZE);
        assert_eq!(Page::new(Some(1000), Some(5)).limit, MAX_PAGE_SIZE);
        assert_eq!(Page::new(Some(0), None).limit, 1);
    }

    #[tokio::test]
    async fn test_list_newest_first_and_paginated() {
        let repo = Arc::new(MemoryRealmRepository::new());
        let realm_id = RealmId::new();
        let actor = actor(realm_id);
        repo.upsert_membership(&Membership::new(realm_id, actor.user_id, Permissions::AUDIT_READ))
            .await
            .unwrap();

        for i in 0..5 {
            record(repo.as_ref(), Some(realm_id), &actor, "updated setting", i, format!("#{i}"))
                .await
                .unwrap();
        }
        record(repo.as_ref(), None, &actor, "created realm", "x", "x")
            .await
            .unwrap();

        let use_case = AuditUseCase::new(repo.clone());
        let entries = use_case
            .list_realm(&actor, Page::new(Some(2), Some(1)))
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].target_id, "3");
        assert_eq!(entries[1].target_id, "2");

        assert!(use_case.list_system(&actor, Page::default()).await.is_err());
    }
}
