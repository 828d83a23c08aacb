//! HTTP Handlers
//!
//! Console handlers act for the signed-in [`SessionActor`]; `/api/v1`
//! handlers act for the [`AuthorizedApp`] the API key middleware resolved.

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use kernel::actor::SessionActor;
use platform::rate_limit::GovernorRateLimitStore;
use realm::RealmAppState;
use realm::models::{ApiKeyType, AuthorizedApp};
use realm::store::RealmStore;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::{
    Caller, IssueCertificateUseCase, IssueCodeUseCase, ManageCodeUseCase, RealmStatsUseCase,
    VerificationConfig, VerifyCodeUseCase,
};
use crate::domain::repository::VerificationStore;
use crate::error::VerificationResult;
use crate::presentation::dto::{
    CertificateRequest, CertificateResponse, CodeStatusResponse, CodeUuidRequest,
    IssueCodeRequest, IssueCodeResponse, RealmStatsResponse, StatsQuery, VerifyRequest,
    VerifyResponse,
};
use crate::presentation::middleware::ApiKeyGuard;

/// Shared state for verification handlers
#[derive(Clone)]
pub struct VerificationAppState<V, R>
where
    V: VerificationStore,
    R: RealmStore,
{
    pub repo: Arc<V>,
    /// Shared with the realm console so disabled keys leave the cache
    pub realms: RealmAppState<R>,
    pub config: Arc<VerificationConfig>,
    pub limiter: Arc<GovernorRateLimitStore>,
}

impl<V, R> VerificationAppState<V, R>
where
    V: VerificationStore,
    R: RealmStore,
{
    pub fn new(repo: V, realms: RealmAppState<R>, config: VerificationConfig) -> Self {
        Self {
            repo: Arc::new(repo),
            realms,
            config: Arc::new(config),
            limiter: Arc::new(GovernorRateLimitStore::new()),
        }
    }

    /// Guard admitting API keys of `key_type`
    pub fn api_key_guard(&self, key_type: ApiKeyType) -> ApiKeyGuard<R> {
        ApiKeyGuard {
            realms: self.realms.clone(),
            key_type,
            limiter: self.limiter.clone(),
            quota: self.config.api_rate_limit.clone(),
        }
    }

    fn issue(&self) -> IssueCodeUseCase<V, R> {
        IssueCodeUseCase::new(
            self.repo.clone(),
            self.realms.repo.clone(),
            self.config.clone(),
            self.realms.config.clone(),
        )
    }

    fn manage(&self) -> ManageCodeUseCase<V, R> {
        ManageCodeUseCase::new(self.repo.clone(), self.realms.repo.clone())
    }

    fn stats(&self) -> RealmStatsUseCase<V, R> {
        RealmStatsUseCase::new(self.repo.clone(), self.realms.repo.clone())
    }
}

// ============================================================================
// Console
// ============================================================================

/// POST /api/realm/codes
pub async fn issue_code<V: VerificationStore, R: RealmStore>(
    State(state): State<VerificationAppState<V, R>>,
    Extension(actor): Extension<SessionActor>,
    Json(req): Json<IssueCodeRequest>,
) -> VerificationResult<Json<IssueCodeResponse>> {
    let issued = state
        .issue()
        .execute(Caller::Session(&actor), req.into())
        .await?;
    Ok(Json(issued.into()))
}

/// GET /api/realm/codes/{uuid}
pub async fn code_status<V: VerificationStore, R: RealmStore>(
    State(state): State<VerificationAppState<V, R>>,
    Extension(actor): Extension<SessionActor>,
    Path(uuid): Path<Uuid>,
) -> VerificationResult<Json<CodeStatusResponse>> {
    let code = state.manage().status(Caller::Session(&actor), &uuid).await?;
    Ok(Json(code.into()))
}

/// POST /api/realm/codes/{uuid}/expire
pub async fn expire_code<V: VerificationStore, R: RealmStore>(
    State(state): State<VerificationAppState<V, R>>,
    Extension(actor): Extension<SessionActor>,
    Path(uuid): Path<Uuid>,
) -> VerificationResult<Json<CodeStatusResponse>> {
    let code = state.manage().expire(Caller::Session(&actor), &uuid).await?;
    Ok(Json(code.into()))
}

/// GET /api/realm/stats
pub async fn realm_stats<V: VerificationStore, R: RealmStore>(
    State(state): State<VerificationAppState<V, R>>,
    Extension(actor): Extension<SessionActor>,
    Query(query): Query<StatsQuery>,
) -> VerificationResult<Json<Vec<RealmStatsResponse>>> {
    let stats = state
        .stats()
        .execute(Caller::Session(&actor), query.days)
        .await?;
    Ok(Json(stats.into_iter().map(Into::into).collect()))
}

// ============================================================================
// Admin API
// ============================================================================

/// POST /api/v1/issue
pub async fn api_issue_code<V: VerificationStore, R: RealmStore>(
    State(state): State<VerificationAppState<V, R>>,
    Extension(app): Extension<AuthorizedApp>,
    Json(req): Json<IssueCodeRequest>,
) -> VerificationResult<Json<IssueCodeResponse>> {
    let issued = state.issue().execute(Caller::App(&app), req.into()).await?;
    Ok(Json(issued.into()))
}

/// POST /api/v1/checkcodestatus
pub async fn api_code_status<V: VerificationStore, R: RealmStore>(
    State(state): State<VerificationAppState<V, R>>,
    Extension(app): Extension<AuthorizedApp>,
    Json(req): Json<CodeUuidRequest>,
) -> VerificationResult<Json<CodeStatusResponse>> {
    let code = state.manage().status(Caller::App(&app), &req.uuid).await?;
    Ok(Json(code.into()))
}

/// POST /api/v1/expirecode
pub async fn api_expire_code<V: VerificationStore, R: RealmStore>(
    State(state): State<VerificationAppState<V, R>>,
    Extension(app): Extension<AuthorizedApp>,
    Json(req): Json<CodeUuidRequest>,
) -> VerificationResult<Json<CodeStatusResponse>> {
    let code = state.manage().expire(Caller::App(&app), &req.uuid).await?;
    Ok(Json(code.into()))
}

// ============================================================================
// Device API
// ============================================================================

/// POST /api/v1/verify
pub async fn verify<V: VerificationStore, R: RealmStore>(
    State(state): State<VerificationAppState<V, R>>,
    Extension(app): Extension<AuthorizedApp>,
    Json(req): Json<VerifyRequest>,
) -> VerificationResult<Json<VerifyResponse>> {
    let verified = VerifyCodeUseCase::new(
        state.repo.clone(),
        state.realms.repo.clone(),
        state.config.clone(),
    )
    .execute(&app, &req.code, &req.accept)
    .await?;
    Ok(Json(verified.into()))
}

/// POST /api/v1/certificate
pub async fn certificate<V: VerificationStore, R: RealmStore>(
    State(state): State<VerificationAppState<V, R>>,
    Extension(app): Extension<AuthorizedApp>,
    Json(req): Json<CertificateRequest>,
) -> VerificationResult<Json<CertificateResponse>> {
    let issued = IssueCertificateUseCase::new(state.repo.clone(), state.realms.repo.clone())
        .execute(&app, &req.token, &req.ekeyhmac)
        .await?;
    Ok(Json(issued.into()))
}

// ============================================================================
// Stats API
// ============================================================================

/// GET /api/v1/stats/realm
pub async fn api_realm_stats<V: VerificationStore, R: RealmStore>(
    State(state): State<VerificationAppState<V, R>>,
    Extension(app): Extension<AuthorizedApp>,
    Query(query): Query<StatsQuery>,
) -> VerificationResult<Json<Vec<RealmStatsResponse>>> {
    let stats = state.stats().execute(Caller::App(&app), query.days).await?;
    Ok(Json(stats.into_iter().map(Into::into).collect()))
}
