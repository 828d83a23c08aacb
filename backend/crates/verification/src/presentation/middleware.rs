//! API Key Middleware
//!
//! Resolves `X-API-Key` to an [`AuthorizedApp`], checks the key type of the
//! route group and applies the per-key rate limit. Requests without a valid
//! key are limited by the connection's peer address; forwarded-for headers
//! are client controlled and never pick the bucket.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use platform::rate_limit::{GovernorRateLimitStore, RateLimitConfig, RateLimitResult, RateLimitStore};
use realm::RealmAppState;
use realm::models::{ApiKeyType, AuthorizedApp};
use realm::store::RealmStore;

use crate::application::caller::require_key_type;
use crate::error::{VerificationError, VerificationResult};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Middleware state
#[derive(Clone)]
pub struct ApiKeyGuard<R>
where
    R: RealmStore,
{
    pub realms: RealmAppState<R>,
    pub key_type: ApiKeyType,
    pub limiter: Arc<GovernorRateLimitStore>,
    pub quota: RateLimitConfig,
}

/// Middleware that requires an active API key of the guard's type
pub async fn require_api_key<R>(
    State(guard): State<ApiKeyGuard<R>>,
    mut req: Request,
    next: Next,
) -> Response
where
    R: RealmStore,
{
    let presented = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned);

    let lookup = match presented {
        Some(key) => Some(guard.realms.api_keys().lookup(&key).await),
        None => None,
    };

    let bucket = match &lookup {
        Some(Ok(app)) => format!("app:{}", app.id),
        _ => match req.extensions().get::<ConnectInfo<SocketAddr>>() {
            Some(ConnectInfo(peer)) => format!("ip:{}", peer.ip()),
            None => "ip:unknown".to_string(),
        },
    };

    let limit = match guard.limiter.check_and_increment(&bucket, &guard.quota).await {
        Ok(limit) => limit,
        Err(e) => return VerificationError::Internal(e.to_string()).into_response(),
    };
    if !limit.allowed {
        tracing::debug!(bucket = %bucket, "API request over quota");
        return with_rate_headers(VerificationError::RateLimited.into_response(), &limit);
    }

    let response = match admit(lookup, guard.key_type) {
        Ok(app) => {
            req.extensions_mut().insert(app);
            next.run(req).await
        }
        Err(e) => e.into_response(),
    };
    with_rate_headers(response, &limit)
}

fn admit(
    lookup: Option<realm::RealmResult<AuthorizedApp>>,
    key_type: ApiKeyType,
) -> VerificationResult<AuthorizedApp> {
    let app = lookup.ok_or(VerificationError::MissingApiKey)??;
    require_key_type(&app, key_type)?;
    Ok(app)
}

fn with_rate_headers(mut response: Response, limit: &RateLimitResult) -> Response {
    let reset = limit.reset_after_secs(Utc::now().timestamp_millis());
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(limit.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(limit.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(reset));
    response
}
