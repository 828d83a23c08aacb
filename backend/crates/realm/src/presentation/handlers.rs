//! HTTP Handlers
//!
//! Console handlers read the signed-in actor from request extensions; the
//! auth middleware puts it there.

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use kernel::actor::SessionActor;
use kernel::id::{AuthorizedAppId, MobileAppId, RealmId, SigningKeyId};
use std::sync::Arc;

use crate::application::{
    ApiKeyCache, ApiKeyUseCase, AuditUseCase, EmailConfigInput, FromNumberInput, MobileAppInput,
    MobileAppUseCase, Page, ProviderConfigUseCase, RealmAdminUseCase, RealmConfig,
    RealmSettingsUseCase, SigningKeyUseCase, SmsConfigInput,
};
use crate::domain::entity::{RealmSettingsPatch, SmsFromNumber};
use crate::domain::repository::RealmStore;
use crate::error::RealmResult;
use crate::presentation::dto::{
    ApiKeyResponse, AuditEntryResponse, AuditQuery, CreateApiKeyRequest, CreateRealmRequest,
    CreatedApiKeyResponse, EmailConfigResponse, MobileAppResponse, RealmResponse,
    SigningKeyResponse, SmsConfigResponse, SystemSmsResponse,
};

/// Shared state for realm handlers
#[derive(Clone)]
pub struct RealmAppState<R>
where
    R: RealmStore,
{
    pub repo: Arc<R>,
    pub config: Arc<RealmConfig>,
    pub api_key_cache: Arc<ApiKeyCache>,
}

impl<R> RealmAppState<R>
where
    R: RealmStore,
{
    pub fn new(repo: R, config: RealmConfig) -> Self {
        let api_key_cache = Arc::new(ApiKeyCache::new(config.api_key_cache_ttl));
        Self {
            repo: Arc::new(repo),
            config: Arc::new(config),
            api_key_cache,
        }
    }

    /// API key lookups share this state's cache
    pub fn api_keys(&self) -> ApiKeyUseCase<R> {
        ApiKeyUseCase::new(
            self.repo.clone(),
            self.config.clone(),
            self.api_key_cache.clone(),
        )
    }

    pub fn provider_config(&self) -> ProviderConfigUseCase<R> {
        ProviderConfigUseCase::new(self.repo.clone(), self.config.clone())
    }
}

// ============================================================================
// Realm Administration (system admin)
// ============================================================================

/// GET /api/admin/realms
pub async fn list_realms<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
) -> RealmResult<Json<Vec<RealmResponse>>> {
    let realms = RealmAdminUseCase::new(state.repo.clone()).list(&actor).await?;
    Ok(Json(realms.into_iter().map(Into::into).collect()))
}

/// POST /api/admin/realms
pub async fn create_realm<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
    Json(req): Json<CreateRealmRequest>,
) -> RealmResult<(StatusCode, Json<RealmResponse>)> {
    let realm = RealmAdminUseCase::new(state.repo.clone())
        .create(&actor, &req.name)
        .await?;
    Ok((StatusCode::CREATED, Json(realm.into())))
}

/// GET /api/admin/realms/{realm_id}
pub async fn get_realm<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
    Path(realm_id): Path<RealmId>,
) -> RealmResult<Json<RealmResponse>> {
    let realm = RealmAdminUseCase::new(state.repo.clone())
        .get(&actor, &realm_id)
        .await?;
    Ok(Json(realm.into()))
}

/// PATCH /api/admin/realms/{realm_id}
pub async fn update_realm<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
    Path(realm_id): Path<RealmId>,
    Json(patch): Json<RealmSettingsPatch>,
) -> RealmResult<Json<RealmResponse>> {
    let realm = RealmSettingsUseCase::new(state.repo.clone())
        .update_realm(&actor, &realm_id, &patch)
        .await?;
    Ok(Json(realm.into()))
}

/// GET /api/admin/sms
pub async fn get_system_sms<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
) -> RealmResult<Json<SystemSmsResponse>> {
    let (config, from_numbers) = state.provider_config().system_sms(&actor).await?;
    Ok(Json(SystemSmsResponse {
        config: config.map(Into::into),
        from_numbers,
    }))
}

/// PUT /api/admin/sms
pub async fn put_system_sms<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
    Json(input): Json<SmsConfigInput>,
) -> RealmResult<Json<SmsConfigResponse>> {
    let config = state
        .provider_config()
        .update_system_sms(&actor, input)
        .await?;
    Ok(Json(config.into()))
}

/// PUT /api/admin/sms/from-numbers
pub async fn put_sms_from_numbers<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
    Json(input): Json<Vec<FromNumberInput>>,
) -> RealmResult<Json<Vec<SmsFromNumber>>> {
    let numbers = state
        .provider_config()
        .set_sms_from_numbers(&actor, input)
        .await?;
    Ok(Json(numbers))
}

/// GET /api/admin/email
pub async fn get_system_email<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
) -> RealmResult<Json<Option<EmailConfigResponse>>> {
    let config = state.provider_config().system_email(&actor).await?;
    Ok(Json(config.map(Into::into)))
}

/// PUT /api/admin/email
pub async fn put_system_email<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
    Json(input): Json<EmailConfigInput>,
) -> RealmResult<Json<EmailConfigResponse>> {
    let config = state
        .provider_config()
        .update_system_email(&actor, input)
        .await?;
    Ok(Json(config.into()))
}

/// GET /api/admin/audit
pub async fn list_system_audit<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
    Query(query): Query<AuditQuery>,
) -> RealmResult<Json<Vec<AuditEntryResponse>>> {
    let entries = AuditUseCase::new(state.repo.clone())
        .list_system(&actor, Page::new(query.limit, query.offset))
        .await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

// ============================================================================
// Realm Settings
// ============================================================================

/// GET /api/realm/settings
pub async fn get_settings<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
) -> RealmResult<Json<RealmResponse>> {
    let realm = RealmSettingsUseCase::new(state.repo.clone())
        .get(&actor)
        .await?;
    Ok(Json(realm.into()))
}

/// PATCH /api/realm/settings
pub async fn update_settings<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
    Json(patch): Json<RealmSettingsPatch>,
) -> RealmResult<Json<RealmResponse>> {
    let realm = RealmSettingsUseCase::new(state.repo.clone())
        .update(&actor, &patch)
        .await?;
    Ok(Json(realm.into()))
}

// ============================================================================
// API Keys
// ============================================================================

/// GET /api/realm/api-keys
pub async fn list_api_keys<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
) -> RealmResult<Json<Vec<ApiKeyResponse>>> {
    let apps = state.api_keys().list(&actor).await?;
    Ok(Json(apps.into_iter().map(Into::into).collect()))
}

/// POST /api/realm/api-keys
pub async fn create_api_key<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
    Json(req): Json<CreateApiKeyRequest>,
) -> RealmResult<(StatusCode, Json<CreatedApiKeyResponse>)> {
    let created = state
        .api_keys()
        .create(&actor, &req.name, req.api_key_type)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedApiKeyResponse {
            app: created.app.into(),
            api_key: created.api_key,
        }),
    ))
}

/// GET /api/realm/api-keys/{app_id}
pub async fn get_api_key<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
    Path(app_id): Path<AuthorizedAppId>,
) -> RealmResult<Json<ApiKeyResponse>> {
    let app = state.api_keys().get(&actor, &app_id).await?;
    Ok(Json(app.into()))
}

/// POST /api/realm/api-keys/{app_id}/disable
pub async fn disable_api_key<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
    Path(app_id): Path<AuthorizedAppId>,
) -> RealmResult<Json<ApiKeyResponse>> {
    let app = state.api_keys().disable(&actor, &app_id).await?;
    Ok(Json(app.into()))
}

/// POST /api/realm/api-keys/{app_id}/enable
pub async fn enable_api_key<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
    Path(app_id): Path<AuthorizedAppId>,
) -> RealmResult<Json<ApiKeyResponse>> {
    let app = state.api_keys().enable(&actor, &app_id).await?;
    Ok(Json(app.into()))
}

// ============================================================================
// Mobile Apps
// ============================================================================

/// GET /api/realm/mobile-apps
pub async fn list_mobile_apps<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
) -> RealmResult<Json<Vec<MobileAppResponse>>> {
    let apps = MobileAppUseCase::new(state.repo.clone()).list(&actor).await?;
    Ok(Json(apps.into_iter().map(Into::into).collect()))
}

/// POST /api/realm/mobile-apps
pub async fn create_mobile_app<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
    Json(input): Json<MobileAppInput>,
) -> RealmResult<(StatusCode, Json<MobileAppResponse>)> {
    let app = MobileAppUseCase::new(state.repo.clone())
        .create(&actor, input)
        .await?;
    Ok((StatusCode::CREATED, Json(app.into())))
}

/// PUT /api/realm/mobile-apps/{mobile_app_id}
pub async fn update_mobile_app<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
    Path(app_id): Path<MobileAppId>,
    Json(input): Json<MobileAppInput>,
) -> RealmResult<Json<MobileAppResponse>> {
    let app = MobileAppUseCase::new(state.repo.clone())
        .update(&actor, &app_id, input)
        .await?;
    Ok(Json(app.into()))
}

/// POST /api/realm/mobile-apps/{mobile_app_id}/disable
pub async fn disable_mobile_app<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
    Path(app_id): Path<MobileAppId>,
) -> RealmResult<Json<MobileAppResponse>> {
    let app = MobileAppUseCase::new(state.repo.clone())
        .set_disabled(&actor, &app_id, true)
        .await?;
    Ok(Json(app.into()))
}

/// POST /api/realm/mobile-apps/{mobile_app_id}/enable
pub async fn enable_mobile_app<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
    Path(app_id): Path<MobileAppId>,
) -> RealmResult<Json<MobileAppResponse>> {
    let app = MobileAppUseCase::new(state.repo.clone())
        .set_disabled(&actor, &app_id, false)
        .await?;
    Ok(Json(app.into()))
}

// ============================================================================
// Realm Provider Configuration
// ============================================================================

/// GET /api/realm/sms
pub async fn get_realm_sms<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
) -> RealmResult<Json<Option<SmsConfigResponse>>> {
    let config = state.provider_config().realm_sms(&actor).await?;
    Ok(Json(config.map(Into::into)))
}

/// PUT /api/realm/sms
pub async fn put_realm_sms<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
    Json(input): Json<SmsConfigInput>,
) -> RealmResult<Json<SmsConfigResponse>> {
    let config = state
        .provider_config()
        .update_realm_sms(&actor, input)
        .await?;
    Ok(Json(config.into()))
}

/// GET /api/realm/email
pub async fn get_realm_email<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
) -> RealmResult<Json<Option<EmailConfigResponse>>> {
    let config = state.provider_config().realm_email(&actor).await?;
    Ok(Json(config.map(Into::into)))
}

/// PUT /api/realm/email
pub async fn put_realm_email<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
    Json(input): Json<EmailConfigInput>,
) -> RealmResult<Json<EmailConfigResponse>> {
    let config = state
        .provider_config()
        .update_realm_email(&actor, input)
        .await?;
    Ok(Json(config.into()))
}

// ============================================================================
// Audit
// ============================================================================

/// GET /api/realm/audit
pub async fn list_realm_audit<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
    Query(query): Query<AuditQuery>,
) -> RealmResult<Json<Vec<AuditEntryResponse>>> {
    let entries = AuditUseCase::new(state.repo.clone())
        .list_realm(&actor, Page::new(query.limit, query.offset))
        .await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

// ============================================================================
// Signing Keys
// ============================================================================

/// GET /api/realm/signing-keys
pub async fn list_signing_keys<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
) -> RealmResult<Json<Vec<SigningKeyResponse>>> {
    let keys = SigningKeyUseCase::new(state.repo.clone())
        .list(&actor)
        .await?;
    Ok(Json(keys.into_iter().map(Into::into).collect()))
}

/// POST /api/realm/signing-keys
pub async fn create_signing_key<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
) -> RealmResult<(StatusCode, Json<SigningKeyResponse>)> {
    let key = SigningKeyUseCase::new(state.repo.clone())
        .create(&actor)
        .await?;
    Ok((StatusCode::CREATED, Json(key.into())))
}

/// POST /api/realm/signing-keys/{key_id}/activate
pub async fn activate_signing_key<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
    Path(key_id): Path<SigningKeyId>,
) -> RealmResult<StatusCode> {
    SigningKeyUseCase::new(state.repo.clone())
        .activate(&actor, &key_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/realm/signing-keys/{key_id}
pub async fn delete_signing_key<R: RealmStore>(
    State(state): State<RealmAppState<R>>,
    Extension(actor): Extension<SessionActor>,
    Path(key_id): Path<SigningKeyId>,
) -> RealmResult<StatusCode> {
    SigningKeyUseCase::new(state.repo.clone())
        .delete(&actor, &key_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
