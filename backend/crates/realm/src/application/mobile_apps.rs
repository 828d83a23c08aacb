//! Mobile App Use Case

use std::sync::Arc;

use chrono::Utc;
use kernel::actor::SessionActor;
use kernel::id::{MobileAppId, RealmId};
use serde::Deserialize;

use crate::application::audit::record;
use crate::application::authorize::{authorize, selected_realm};
use crate::domain::entity::{MobileApp, MobileOs};
use crate::domain::repository::{AuditRepository, MembershipRepository, MobileAppRepository};
use crate::domain::value_object::Permissions;
use crate::error::{RealmError, RealmResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileAppInput {
    pub name: String,
    pub os: MobileOs,
    pub app_id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub sha: String,
}

pub struct MobileAppUseCase<R>
where
    R: MobileAppRepository + MembershipRepository + AuditRepository,
{
    repo: Arc<R>,
}

impl<R> MobileAppUseCase<R>
where
    R: MobileAppRepository + MembershipRepository + AuditRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, actor: &SessionActor, input: MobileAppInput) -> RealmResult<MobileApp> {
        let realm_id = selected_realm(actor)?;
        authorize(self.repo.as_ref(), actor, &realm_id, Permissions::MOBILE_APP_WRITE).await?;

        let app = MobileApp::new(
            realm_id,
            input.name,
            input.os,
            input.app_id,
            input.url,
            input.sha,
        );
        app.validate().map_err(RealmError::Validation)?;
        self.repo.create_mobile_app(&app).await?;

        record(
            self.repo.as_ref(),
            Some(realm_id),
            actor,
            "created mobile app",
            app.id,
            &app.name,
        )
        .await?;
        tracing::info!(realm_id = %realm_id, mobile_app_id = %app.id, "Mobile app created");
        Ok(app)
    }

    pub async fn list(&self, actor: &SessionActor) -> RealmResult<Vec<MobileApp>> {
        let realm_id = selected_realm(actor)?;
        authorize(self.repo.as_ref(), actor, &realm_id, Permissions::MOBILE_APP_READ).await?;
        self.repo.list_mobile_apps(&realm_id).await
    }

    /// Replace every editable field
    pub async fn update(
        &self,
        actor: &SessionActor,
        app_id: &MobileAppId,
        input: MobileAppInput,
    ) -> RealmResult<MobileApp> {
        let realm_id = selected_realm(actor)?;
        authorize(self.repo.as_ref(), actor, &realm_id, Permissions::MOBILE_APP_WRITE).await?;

        let existing = self.find(&realm_id, app_id).await?;
        let replacement = MobileApp::new(
            realm_id,
            input.name,
            input.os,
            input.app_id,
            input.url,
            input.sha,
        );
        let app = MobileApp {
            id: existing.id,
            disabled: existing.disabled,
            created_at: existing.created_at,
            updated_at: Utc::now(),
            ..replacement
        };
        app.validate().map_err(RealmError::Validation)?;
        self.repo.update_mobile_app(&app).await?;

        record(
            self.repo.as_ref(),
            Some(realm_id),
            actor,
            "updated mobile app",
            app.id,
            &app.name,
        )
        .await?;
        Ok(app)
    }

    pub async fn set_disabled(
        &self,
        actor: &SessionActor,
        app_id: &MobileAppId,
        disabled: bool,
    ) -> RealmResult<MobileApp> {
        let realm_id = selected_realm(actor)?;
        authorize(self.repo.as_ref(), actor, &realm_id, Permissions::MOBILE_APP_WRITE).await?;

        let mut app = self.find(&realm_id, app_id).await?;
        if app.disabled == disabled {
            return Ok(app);
        }
        app.disabled = disabled;
        app.updated_at = Utc::now();
        self.repo.update_mobile_app(&app).await?;

        let action = if disabled {
            "disabled mobile app"
        } else {
            "enabled mobile app"
        };
        record(self.repo.as_ref(), Some(realm_id), actor, action, app.id, &app.name).await?;
        Ok(app)
    }

    async fn find(&self, realm_id: &RealmId, app_id: &MobileAppId) -> RealmResult<MobileApp> {
        self.repo
            .find_mobile_app(realm_id, app_id)
            .await?
            .ok_or(RealmError::NotFound("Mobile app"))
    }
}
