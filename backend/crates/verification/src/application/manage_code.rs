//! Code status and expiry by uuid

use std::sync::Arc;

use chrono::Utc;
use realm::models::{ApiKeyType, Permissions};
use realm::store::MembershipRepository;
use uuid::Uuid;

use crate::application::caller::Caller;
use crate::domain::entities::VerificationCode;
use crate::domain::repository::CodeRepository;
use crate::error::{VerificationError, VerificationResult};

pub struct ManageCodeUseCase<V, R>
where
    V: CodeRepository,
    R: MembershipRepository,
{
    repo: Arc<V>,
    realms: Arc<R>,
}

impl<V, R> ManageCodeUseCase<V, R>
where
    V: CodeRepository,
    R: MembershipRepository,
{
    pub fn new(repo: Arc<V>, realms: Arc<R>) -> Self {
        Self { repo, realms }
    }

    pub async fn status(&self, caller: Caller<'_>, uuid: &Uuid) -> VerificationResult<VerificationCode> {
        let realm_id = caller
            .realm(self.realms.as_ref(), Permissions::CODE_READ, ApiKeyType::Admin)
            .await?;
        self.repo
            .find_code_by_uuid(&realm_id, uuid)
            .await?
            .ok_or(VerificationError::CodeNotFound)
    }

    /// Ends both expiries now; a claimed code cannot be expired
    pub async fn expire(&self, caller: Caller<'_>, uuid: &Uuid) -> VerificationResult<VerificationCode> {
        let realm_id = caller
            .realm(self.realms.as_ref(), Permissions::CODE_EXPIRE, ApiKeyType::Admin)
            .await?;
        let code = self
            .repo
            .find_code_by_uuid(&realm_id, uuid)
            .await?
            .ok_or(VerificationError::CodeNotFound)?;
        if code.claimed {
            return Err(VerificationError::CodeAlreadyClaimed);
        }

        let expired = self
            .repo
            .expire_code(&code.id, Utc::now())
            .await?
            .ok_or(VerificationError::CodeAlreadyClaimed)?;
        tracing::info!(realm_id = %realm_id, code_id = %code.id, "Verification code expired");
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{Fixture, member_actor};
    use crate::domain::entities::fixtures;
    use crate::domain::value_objects::CodeKind;
    use realm::RealmError;

    #[tokio::test]
    async fn test_status_is_realm_scoped() {
        let fx = Fixture::new().await;
        let code = fixtures::code(fx.realm.id, "s", "l");
        fx.repo.create_code(&code).await.unwrap();
        let use_case = ManageCodeUseCase::new(fx.repo.clone(), fx.realms.clone());

        let reader = member_actor(&fx.realms, fx.realm.id, Permissions::CODE_READ).await;
        let found = use_case.status(Caller::Session(&reader), &code.uuid).await.unwrap();
        assert_eq!(found.id, code.id);

        let other = crate::application::testing::app_with_type(
            kernel::id::RealmId::new(),
            ApiKeyType::Admin,
        );
        assert!(matches!(
            use_case.status(Caller::App(&other), &code.uuid).await,
            Err(VerificationError::CodeNotFound)
        ));
    }

    #[tokio::test]
    async fn test_expire_needs_permission() {
        let fx = Fixture::new().await;
        let code = fixtures::code(fx.realm.id, "s", "l");
        fx.repo.create_code(&code).await.unwrap();
        let reader = member_actor(&fx.realms, fx.realm.id, Permissions::CODE_READ).await;

        let result = ManageCodeUseCase::new(fx.repo.clone(), fx.realms.clone())
            .expire(Caller::Session(&reader), &code.uuid)
            .await;
        assert!(matches!(
            result,
            Err(VerificationError::Realm(RealmError::PermissionDenied(_)))
        ));
    }

    #[tokio::test]
    async fn test_expire_then_claimed_conflict() {
        let fx = Fixture::new().await;
        let app = fx.app(ApiKeyType::Admin);
        let use_case = ManageCodeUseCase::new(fx.repo.clone(), fx.realms.clone());

        let code = fixtures::code(fx.realm.id, "s1", "l1");
        fx.repo.create_code(&code).await.unwrap();
        let expired = use_case.expire(Caller::App(&app), &code.uuid).await.unwrap();
        assert!(expired.is_fully_expired(Utc::now()));

        let claimed = fixtures::code(fx.realm.id, "s2", "l2");
        fx.repo.create_code(&claimed).await.unwrap();
        fx.repo
            .claim_code(&claimed.id, CodeKind::Short, Utc::now())
            .await
            .unwrap();
        assert!(matches!(
            use_case.expire(Caller::App(&app), &claimed.uuid).await,
            Err(VerificationError::CodeAlreadyClaimed)
        ));
    }
}
