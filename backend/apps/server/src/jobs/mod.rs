//! Background jobs, triggered by an external scheduler over HTTP
//!
//! `POST /api/jobs/cleanup` and `POST /api/jobs/backup` require
//! `Authorization: Bearer <JOB_TOKEN>`.

pub mod backup;
pub mod cleanup;
pub mod lock;

use std::sync::Arc;

use auth::AuthError;
use auth::store::AuthStore;
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::{Next, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::crypto::constant_time_eq;
use platform::lock::LockStore;
use realm::RealmError;
use realm::store::RealmStore;
use thiserror::Error;
use verification::VerificationError;
use verification::store::VerificationStore;

use crate::config::JobConfig;
use backup::{BackupReport, run_backup};
use cleanup::{CleanupReport, run_cleanup};

pub type JobResult<T> = Result<T, JobError>;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job token is missing or invalid")]
    Unauthorized,

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Job {0} is locked")]
    Locked(&'static str),

    #[error("Lock store error: {0}")]
    Lock(String),

    #[error("Export request failed: {0}")]
    Export(#[from] reqwest::Error),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Realm(#[from] RealmError),

    #[error(transparent)]
    Verification(#[from] VerificationError),
}

impl JobError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            JobError::Unauthorized => ErrorKind::Unauthorized,
            JobError::NotConfigured(_) => ErrorKind::ServiceUnavailable,
            JobError::Locked(_) => ErrorKind::Conflict,
            JobError::Lock(_) => ErrorKind::InternalServerError,
            JobError::Export(_) => ErrorKind::BadGateway,
            JobError::Auth(e) => e.kind(),
            JobError::Realm(e) => e.kind(),
            JobError::Verification(e) => e.kind(),
        }
    }

    pub fn to_app_error(&self) -> AppError {
        match self {
            JobError::Auth(e) => e.to_app_error(),
            JobError::Realm(e) => e.to_app_error(),
            JobError::Verification(e) => e.to_app_error(),
            JobError::Lock(_) => AppError::new(self.kind(), "Internal server error"),
            JobError::Export(_) => AppError::new(self.kind(), "Export request failed"),
            JobError::Locked(_) => AppError::new(self.kind(), self.to_string())
                .with_action("Retry after the minimum interval"),
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    pub fn log(&self) {
        match self {
            JobError::Auth(e) => e.log(),
            JobError::Realm(e) => e.log(),
            JobError::Verification(e) => e.log(),
            JobError::Lock(_) | JobError::Export(_) => {
                tracing::error!(error = %self, "Job failed");
            }
            JobError::Unauthorized => tracing::warn!("Job request with a bad token"),
            _ => tracing::info!(error = %self, "Job skipped"),
        }
    }
}

impl IntoResponse for JobError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

/// Stores and settings the job handlers run against
pub struct JobState<A, R, V, L> {
    pub auth: Arc<A>,
    pub realms: Arc<R>,
    pub verification: Arc<V>,
    pub locks: Arc<L>,
    pub config: Arc<JobConfig>,
}

impl<A, R, V, L> Clone for JobState<A, R, V, L> {
    fn clone(&self) -> Self {
        Self {
            auth: self.auth.clone(),
            realms: self.realms.clone(),
            verification: self.verification.clone(),
            locks: self.locks.clone(),
            config: self.config.clone(),
        }
    }
}

pub fn jobs_router<A, R, V, L>(state: JobState<A, R, V, L>) -> Router
where
    A: AuthStore,
    R: RealmStore,
    V: VerificationStore,
    L: LockStore + Sync + 'static,
    L::Error: std::fmt::Display,
{
    Router::new()
        .route("/cleanup", post(cleanup_handler::<A, R, V, L>))
        .route("/backup", post(backup_handler::<A, R, V, L>))
        .route_layer(from_fn_with_state(state.config.clone(), require_job_token))
        .with_state(state)
}

async fn require_job_token(
    State(config): State<Arc<JobConfig>>,
    req: Request,
    next: Next,
) -> Result<Response, JobError> {
    let expected = config
        .job_token
        .as_deref()
        .ok_or(JobError::NotConfigured("JOB_TOKEN"))?;

    let presented = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(JobError::Unauthorized)?;

    if !constant_time_eq(presented.trim().as_bytes(), expected.as_bytes()) {
        return Err(JobError::Unauthorized);
    }
    Ok(next.run(req).await)
}

async fn cleanup_handler<A, R, V, L>(
    State(state): State<JobState<A, R, V, L>>,
) -> JobResult<Json<CleanupReport>>
where
    A: AuthStore,
    R: RealmStore,
    V: VerificationStore,
    L: LockStore + Sync + 'static,
{
    let report = run_cleanup(
        state.auth.as_ref(),
        state.realms.as_ref(),
        state.verification.as_ref(),
        Utc::now(),
    )
    .await?;
    Ok(Json(report))
}

async fn backup_handler<A, R, V, L>(
    State(state): State<JobState<A, R, V, L>>,
) -> JobResult<Json<BackupReport>>
where
    A: AuthStore,
    R: RealmStore,
    V: VerificationStore,
    L: LockStore + Sync + 'static,
    L::Error: std::fmt::Display,
{
    let report = run_backup(state.locks.as_ref(), &state.config).await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth::store::MemoryAuthRepository;
    use axum::body::Body;
    use axum::http::StatusCode;
    use platform::lock::MemoryLockStore;
    use realm::store::MemoryRealmRepository;
    use tower::ServiceExt;
    use verification::store::MemoryVerificationRepository;

    type TestState = JobState<
        MemoryAuthRepository,
        MemoryRealmRepository,
        MemoryVerificationRepository,
        MemoryLockStore,
    >;

    fn state(job_token: Option<&str>) -> TestState {
        JobState {
            auth: Arc::new(MemoryAuthRepository::new()),
            realms: Arc::new(MemoryRealmRepository::new()),
            verification: Arc::new(MemoryVerificationRepository::new()),
            locks: Arc::new(MemoryLockStore::new()),
            config: Arc::new(JobConfig {
                job_token: job_token.map(str::to_string),
                ..JobConfig::default()
            }),
        }
    }

    fn post_job(path: &str, token: Option<&str>) -> axum::http::Request<Body> {
        let mut builder = axum::http::Request::post(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_job_token_required() {
        let app = jobs_router(state(Some("s3cret")));

        let response = app.clone().oneshot(post_job("/cleanup", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.clone().oneshot(post_job("/cleanup", Some("wrong"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.oneshot(post_job("/cleanup", Some("s3cret"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_jobs_disabled_without_token() {
        let app = jobs_router(state(None));
        let response = app.oneshot(post_job("/cleanup", Some("anything"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_backup_unconfigured() {
        let app = jobs_router(state(Some("s3cret")));
        let response = app.oneshot(post_job("/backup", Some("s3cret"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
