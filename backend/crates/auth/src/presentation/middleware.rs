//! Auth Middleware
//!
//! Session guards for console routes. A passing request carries the
//! signed-in [`SessionActor`] in its extensions.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use kernel::actor::SessionActor;
use platform::client::ClientFingerprint;
use platform::cookie::extract_cookie;
use realm::RealmError;

use crate::application::CheckSessionUseCase;
use crate::application::config::AuthConfig;
use crate::domain::entity::SessionClient;
use crate::domain::repository::AuthStore;
use crate::error::{AuthError, AuthResult};

/// Requesting client, from headers and the socket address when available
pub struct Client(pub ClientFingerprint);

impl Client {
    pub fn session_client(&self) -> SessionClient {
        SessionClient::from(&self.0)
    }
}

impl<S> FromRequestParts<S> for Client
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let direct_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip());
        Ok(Client(ClientFingerprint::from_headers(&parts.headers, direct_ip)))
    }
}

/// Middleware state
#[derive(Clone)]
pub struct AuthMiddlewareState<A>
where
    A: AuthStore,
{
    pub repo: Arc<A>,
    pub config: Arc<AuthConfig>,
}

async fn authenticate<A>(
    state: &AuthMiddlewareState<A>,
    client: &Client,
    req: &mut Request,
    allow_mfa_pending: bool,
) -> AuthResult<()>
where
    A: AuthStore,
{
    let token = extract_cookie(req.headers(), &state.config.cookie.name)
        .ok_or(AuthError::SessionInvalid)?;

    let current = CheckSessionUseCase::new(state.repo.clone(), state.config.clone())
        .authenticate(&token, &client.0.hash)
        .await?;

    if current.session.mfa_pending && !allow_mfa_pending {
        return Err(AuthError::MfaEnrollmentRequired);
    }

    req.extensions_mut().insert(current.actor());
    Ok(())
}

/// Requires a valid session that finished any required MFA enrollment
pub async fn require_session<A>(
    State(state): State<AuthMiddlewareState<A>>,
    client: Client,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError>
where
    A: AuthStore,
{
    authenticate(&state, &client, &mut req, false).await?;
    Ok(next.run(req).await)
}

/// Like [`require_session`], but lets `mfa_pending` sessions through
///
/// Only for the TOTP enrollment routes.
pub async fn require_session_allow_pending<A>(
    State(state): State<AuthMiddlewareState<A>>,
    client: Client,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError>
where
    A: AuthStore,
{
    authenticate(&state, &client, &mut req, true).await?;
    Ok(next.run(req).await)
}

/// Must be layered inside a session guard
pub async fn require_system_admin(req: Request, next: Next) -> Result<Response, AuthError> {
    let actor = req
        .extensions()
        .get::<SessionActor>()
        .ok_or(AuthError::SessionInvalid)?;

    if !actor.system_admin {
        tracing::debug!(user_id = %actor.user_id, "System admin route refused");
        return Err(RealmError::SystemAdminRequired.into());
    }
    Ok(next.run(req).await)
}
