//! HTTP Handlers

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use kernel::actor::SessionActor;
use kernel::id::{RealmId, UserId};
use platform::cookie::{extract_cookie, set_cookie_header};
use realm::store::RealmStore;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::config::AuthConfig;
use crate::application::{
    ChangePasswordUseCase, PasswordResetUseCase, RealmSelectionUseCase, RealmUsersUseCase,
    SessionStatusUseCase, SignInInput, SignInUseCase, SignOutUseCase, SystemUsersUseCase,
    TotpSetupUseCase,
};
use crate::domain::repository::AuthStore;
use crate::error::AuthResult;
use crate::presentation::dto::{
    AddMemberRequest, ChangePasswordRequest, CompletePasswordResetRequest, MemberResponse,
    PasswordResetRequest, RealmChoiceResponse, SelectRealmRequest, SessionStatusResponse,
    SignInRequest, SignInResponse, SystemAdminRequest, TotpCodeRequest, TotpSetupResponse,
    UpdateMemberRequest, UserResponse, UserStatusRequest,
};
use crate::presentation::middleware::{AuthMiddlewareState, Client};

/// Shared state for auth handlers
#[derive(Clone)]
pub struct AuthAppState<A, R>
where
    A: AuthStore,
    R: RealmStore,
{
    pub repo: Arc<A>,
    /// Shared with the realm handlers
    pub realms: Arc<R>,
    pub config: Arc<AuthConfig>,
}

impl<A, R> AuthAppState<A, R>
where
    A: AuthStore,
    R: RealmStore,
{
    pub fn new(repo: A, realms: Arc<R>, config: AuthConfig) -> Self {
        Self {
            repo: Arc::new(repo),
            realms,
            config: Arc::new(config),
        }
    }

    /// State for the session guards
    pub fn middleware_state(&self) -> AuthMiddlewareState<A> {
        AuthMiddlewareState {
            repo: self.repo.clone(),
            config: self.config.clone(),
        }
    }
}

// ============================================================================
// Sign In / Sign Out / Status
// ============================================================================

/// POST /api/auth/signin
pub async fn sign_in<A: AuthStore, R: RealmStore>(
    State(state): State<AuthAppState<A, R>>,
    client: Client,
    Json(req): Json<SignInRequest>,
) -> AuthResult<impl IntoResponse> {
    let use_case = SignInUseCase::new(state.repo.clone(), state.realms.clone(), state.config.clone());

    let remember_me = req.remember_me;
    let input = SignInInput {
        email: req.email,
        password: req.password,
        remember_me,
        totp_code: req.totp_code,
    };

    let output = use_case.execute(input, client.session_client()).await?;

    // No cookie while a TOTP code is outstanding
    let mut headers = HeaderMap::new();
    if let Some(token) = &output.session_token {
        let cookie = state.config.session_cookie(token, remember_me);
        headers.insert(header::SET_COOKIE, set_cookie_header(&cookie));
    }

    Ok((headers, Json(SignInResponse::from(output))))
}

/// POST /api/auth/signout
pub async fn sign_out<A: AuthStore, R: RealmStore>(
    State(state): State<AuthAppState<A, R>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(token) = extract_cookie(&headers, &state.config.cookie.name) {
        let use_case = SignOutUseCase::new(state.repo.clone(), state.config.clone());
        if let Err(e) = use_case.execute(&token).await {
            tracing::debug!(error = %e, "Sign out without a valid session");
        }
    }

    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, set_cookie_header(&state.config.clear_cookie()))],
    )
}

/// GET /api/auth/status
pub async fn session_status<A: AuthStore, R: RealmStore>(
    State(state): State<AuthAppState<A, R>>,
    client: Client,
    headers: HeaderMap,
) -> AuthResult<Json<SessionStatusResponse>> {
    let token = extract_cookie(&headers, &state.config.cookie.name);
    let status = SessionStatusUseCase::new(state.repo.clone(), state.realms.clone(), state.config.clone())
        .execute(token.as_deref(), &client.0.hash)
        .await?;

    Ok(Json(
        status.map_or_else(SessionStatusResponse::anonymous, Into::into),
    ))
}

// ============================================================================
// Realm Selection
// ============================================================================

/// GET /api/auth/realms
pub async fn list_realm_choices<A: AuthStore, R: RealmStore>(
    State(state): State<AuthAppState<A, R>>,
    Extension(actor): Extension<SessionActor>,
) -> AuthResult<Json<Vec<RealmChoiceResponse>>> {
    let choices = RealmSelectionUseCase::new(state.repo.clone(), state.realms.clone())
        .choices(&actor.user_id, actor.system_admin)
        .await?;
    Ok(Json(choices.into_iter().map(Into::into).collect()))
}

/// POST /api/auth/realms/select
pub async fn select_realm<A: AuthStore, R: RealmStore>(
    State(state): State<AuthAppState<A, R>>,
    Extension(actor): Extension<SessionActor>,
    Json(req): Json<SelectRealmRequest>,
) -> AuthResult<StatusCode> {
    RealmSelectionUseCase::new(state.repo.clone(), state.realms.clone())
        .select(&actor, RealmId::from_uuid(req.realm_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// TOTP
// ============================================================================

fn totp<A: AuthStore, R: RealmStore>(state: &AuthAppState<A, R>) -> TotpSetupUseCase<A, R> {
    TotpSetupUseCase::new(state.repo.clone(), state.realms.clone(), state.config.clone())
}

/// POST /api/auth/totp/setup
pub async fn totp_setup<A: AuthStore, R: RealmStore>(
    State(state): State<AuthAppState<A, R>>,
    Extension(actor): Extension<SessionActor>,
) -> AuthResult<Json<TotpSetupResponse>> {
    let output = totp(&state).setup(&actor).await?;
    Ok(Json(output.into()))
}

/// POST /api/auth/totp/verify
pub async fn totp_verify<A: AuthStore, R: RealmStore>(
    State(state): State<AuthAppState<A, R>>,
    Extension(actor): Extension<SessionActor>,
    Json(req): Json<TotpCodeRequest>,
) -> AuthResult<StatusCode> {
    totp(&state).verify(&actor, &req.code).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/totp/disable
pub async fn totp_disable<A: AuthStore, R: RealmStore>(
    State(state): State<AuthAppState<A, R>>,
    Extension(actor): Extension<SessionActor>,
    Json(req): Json<TotpCodeRequest>,
) -> AuthResult<StatusCode> {
    totp(&state).disable(&actor, &req.code).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Passwords
// ============================================================================

/// POST /api/auth/password
pub async fn change_password<A: AuthStore, R: RealmStore>(
    State(state): State<AuthAppState<A, R>>,
    Extension(actor): Extension<SessionActor>,
    Json(req): Json<ChangePasswordRequest>,
) -> AuthResult<StatusCode> {
    ChangePasswordUseCase::new(state.repo.clone(), state.realms.clone(), state.config.clone())
        .execute(&actor, req.current_password, req.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/password/reset
pub async fn request_password_reset<A: AuthStore, R: RealmStore>(
    State(state): State<AuthAppState<A, R>>,
    Json(req): Json<PasswordResetRequest>,
) -> AuthResult<StatusCode> {
    PasswordResetUseCase::new(state.repo.clone(), state.realms.clone(), state.config.clone())
        .request(&req.email)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/password/reset/complete
pub async fn complete_password_reset<A: AuthStore, R: RealmStore>(
    State(state): State<AuthAppState<A, R>>,
    Json(req): Json<CompletePasswordResetRequest>,
) -> AuthResult<StatusCode> {
    PasswordResetUseCase::new(state.repo.clone(), state.realms.clone(), state.config.clone())
        .complete(&req.token, req.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Realm Users
// ============================================================================

fn realm_users<A: AuthStore, R: RealmStore>(state: &AuthAppState<A, R>) -> RealmUsersUseCase<A, R> {
    RealmUsersUseCase::new(state.repo.clone(), state.realms.clone(), state.config.clone())
}

/// GET /api/realm/users
pub async fn list_members<A: AuthStore, R: RealmStore>(
    State(state): State<AuthAppState<A, R>>,
    Extension(actor): Extension<SessionActor>,
) -> AuthResult<Json<Vec<MemberResponse>>> {
    let members = realm_users(&state).list(&actor).await?;
    Ok(Json(members.into_iter().map(Into::into).collect()))
}

/// POST /api/realm/users
pub async fn add_member<A: AuthStore, R: RealmStore>(
    State(state): State<AuthAppState<A, R>>,
    Extension(actor): Extension<SessionActor>,
    Json(req): Json<AddMemberRequest>,
) -> AuthResult<(StatusCode, Json<MemberResponse>)> {
    let member = realm_users(&state)
        .add(&actor, &req.email, &req.name, req.permissions)
        .await?;
    Ok((StatusCode::CREATED, Json(member.into())))
}

/// PUT /api/realm/users/{user_id}
pub async fn update_member<A: AuthStore, R: RealmStore>(
    State(state): State<AuthAppState<A, R>>,
    Extension(actor): Extension<SessionActor>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateMemberRequest>,
) -> AuthResult<Json<MemberResponse>> {
    let member = realm_users(&state)
        .update(&actor, &UserId::from_uuid(user_id), req.permissions)
        .await?;
    Ok(Json(member.into()))
}

/// DELETE /api/realm/users/{user_id}
pub async fn remove_member<A: AuthStore, R: RealmStore>(
    State(state): State<AuthAppState<A, R>>,
    Extension(actor): Extension<SessionActor>,
    Path(user_id): Path<Uuid>,
) -> AuthResult<StatusCode> {
    realm_users(&state)
        .remove(&actor, &UserId::from_uuid(user_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// System Users
// ============================================================================

/// GET /api/admin/users
pub async fn list_users<A: AuthStore, R: RealmStore>(
    State(state): State<AuthAppState<A, R>>,
    Extension(actor): Extension<SessionActor>,
) -> AuthResult<Json<Vec<UserResponse>>> {
    let users = SystemUsersUseCase::new(state.repo.clone(), state.realms.clone())
        .list(&actor)
        .await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// PUT /api/admin/users/{user_id}/system-admin
pub async fn set_system_admin<A: AuthStore, R: RealmStore>(
    State(state): State<AuthAppState<A, R>>,
    Extension(actor): Extension<SessionActor>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<SystemAdminRequest>,
) -> AuthResult<Json<UserResponse>> {
    let user = SystemUsersUseCase::new(state.repo.clone(), state.realms.clone())
        .set_system_admin(&actor, &UserId::from_uuid(user_id), req.system_admin)
        .await?;
    Ok(Json(user.into()))
}

/// PUT /api/admin/users/{user_id}/status
pub async fn set_user_status<A: AuthStore, R: RealmStore>(
    State(state): State<AuthAppState<A, R>>,
    Extension(actor): Extension<SessionActor>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UserStatusRequest>,
) -> AuthResult<Json<UserResponse>> {
    let user = SystemUsersUseCase::new(state.repo.clone(), state.realms.clone())
        .set_disabled(&actor, &UserId::from_uuid(user_id), req.disabled)
        .await?;
    Ok(Json(user.into()))
}
