//! Realm authorization
//!
//! System admins pass every realm check. Everyone else needs a membership
//! holding the permission.

use kernel::actor::SessionActor;
use kernel::id::RealmId;

use crate::domain::repository::MembershipRepository;
use crate::domain::value_object::Permissions;
use crate::error::{RealmError, RealmResult};

/// Realm selected in the actor's session
pub fn selected_realm(actor: &SessionActor) -> RealmResult<RealmId> {
    actor.realm_id.ok_or(RealmError::NoRealmSelected)
}

pub fn require_system_admin(actor: &SessionActor) -> RealmResult<()> {
    if actor.system_admin {
        Ok(())
    } else {
        Err(RealmError::SystemAdminRequired)
    }
}

/// Effective permissions of the actor in a realm
pub async fn actor_permissions<R>(
    repo: &R,
    actor: &SessionActor,
    realm_id: &RealmId,
) -> RealmResult<Permissions>
where
    R: MembershipRepository,
{
    if actor.system_admin {
        return Ok(Permissions::all());
    }
    let membership = repo.find_membership(realm_id, &actor.user_id).await?;
    Ok(membership
        .map(|m| m.permissions.implied())
        .unwrap_or_default())
}

/// Fails with `PermissionDenied` unless the actor holds `permission`
pub async fn authorize<R>(
    repo: &R,
    actor: &SessionActor,
    realm_id: &RealmId,
    permission: Permissions,
) -> RealmResult<()>
where
    R: MembershipRepository,
{
    if actor_permissions(repo, actor, realm_id)
        .await?
        .contains(permission)
    {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %actor.user_id,
            realm_id = %realm_id,
            permission = ?permission,
            "Permission denied"
        );
        Err(RealmError::PermissionDenied(permission.names().join(", ")))
    }
}

/// Fails unless every permission in `requested` may be granted by the actor
pub async fn authorize_grant<R>(
    repo: &R,
    actor: &SessionActor,
    realm_id: &RealmId,
    requested: Permissions,
) -> RealmResult<()>
where
    R: MembershipRepository,
{
    let own = actor_permissions(repo, actor, realm_id).await?;
    if own.can_grant(requested) {
        Ok(())
    } else {
        Err(RealmError::PermissionDenied(
            "cannot grant permissions you do not hold".to_string(),
        ))
    }
}
