//! Verification Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

mod config;
mod jobs;

use std::net::SocketAddr;
use std::sync::Arc;

use auth::middleware::{require_session, require_system_admin};
use auth::{
    PgAuthRepository, auth_router, bootstrap_admin, pg_auth_state, realm_users_router,
    system_users_router,
};
use axum::extract::State;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use axum::{
    Json, Router, http,
    http::{Method, StatusCode, header},
};
use chrono::Utc;
use realm::{PgRealmRepository, admin_router, console_router, pg_realm_state};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use verification::{PgVerificationRepository, api_router, pg_verification_state, verification_console_router};

use crate::config::ServerConfig;
use crate::jobs::cleanup::run_cleanup;
use crate::jobs::lock::PgLockStore;
use crate::jobs::{JobState, jobs_router};

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "verification_server=info,auth=info,realm=info,verification=info,tower_http=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    if config.dev_mode {
        tracing::warn!("Running in development mode");
    }

    // Database connection
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    let realm_state = pg_realm_state(PgRealmRepository::new(pool.clone()), config.realm.clone());
    let auth_state = pg_auth_state(
        PgAuthRepository::new(pool.clone()),
        realm_state.repo.clone(),
        config.auth.clone(),
    );
    let verification_state = pg_verification_state(
        PgVerificationRepository::new(pool.clone()),
        realm_state.clone(),
        config.verification.clone(),
    );

    if let Some(admin) = &config.bootstrap_admin {
        bootstrap_admin(
            auth_state.repo.as_ref(),
            &config.auth,
            &admin.email,
            admin.password.clone(),
            "Administrator",
        )
        .await?;
    }

    // Startup cleanup
    // Errors here should not prevent server startup
    if let Err(e) = run_cleanup(
        auth_state.repo.as_ref(),
        realm_state.repo.as_ref(),
        verification_state.repo.as_ref(),
        Utc::now(),
    )
    .await
    {
        tracing::warn!(error = %e, "Startup cleanup failed, continuing anyway");
    }

    let job_state = JobState {
        auth: auth_state.repo.clone(),
        realms: realm_state.repo.clone(),
        verification: verification_state.repo.clone(),
        locks: Arc::new(PgLockStore::new(pool.clone())),
        config: Arc::new(config.jobs.clone()),
    };

    // CORS configuration
    let allowed_origins: Vec<http::HeaderValue> = config
        .frontend_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            http::HeaderName::from_static("x-api-key"),
        ]))
        .allow_credentials(true);

    let session_guard = from_fn_with_state(
        auth_state.middleware_state(),
        require_session::<PgAuthRepository>,
    );

    // Session guard is added last so it runs before the admin check
    let admin = Router::new()
        .merge(admin_router(realm_state.clone()))
        .nest("/users", system_users_router(auth_state.clone()))
        .route_layer(from_fn(require_system_admin))
        .route_layer(session_guard.clone());

    let console = Router::new()
        .merge(console_router(realm_state.clone()))
        .merge(verification_console_router(verification_state.clone()))
        .nest("/users", realm_users_router(auth_state.clone()))
        .route_layer(session_guard);

    // Build router
    let app = Router::new()
        .nest("/api/auth", auth_router(auth_state))
        .nest("/api/admin", admin)
        .nest("/api/realm", console)
        .nest("/api/v1", api_router(verification_state))
        .nest("/api/jobs", jobs_router(job_state))
        .route("/health", get(health).with_state(pool))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    tracing::info!("Listening on {}", config.bind_addr);

    let listener = TcpListener::bind(config.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// GET /health
async fn health(State(pool): State<PgPool>) -> (StatusCode, Json<serde_json::Value>) {
    match sqlx::query("SELECT 1").execute(&pool).await {
        Ok(_) => (StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "unavailable" })),
            )
        }
    }
}
