//! Auth Routers

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use realm::store::RealmStore;
use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::domain::repository::AuthStore;
use crate::infra::postgres::PgAuthRepository;
use crate::presentation::handlers::{self, AuthAppState};
use crate::presentation::middleware::{require_session, require_session_allow_pending};

/// Shared auth state backed by PostgreSQL
pub fn pg_auth_state<R>(repo: PgAuthRepository, realms: Arc<R>, config: AuthConfig) -> AuthAppState<PgAuthRepository, R>
where
    R: RealmStore,
{
    AuthAppState::new(repo, realms, config)
}

/// Sign-in, session, TOTP and password routes, mounted under `/api/auth`
///
/// Guards its own protected routes.
pub fn auth_router<A, R>(state: AuthAppState<A, R>) -> Router
where
    A: AuthStore,
    R: RealmStore,
{
    let enrollment = Router::new()
        .route("/totp/setup", post(handlers::totp_setup::<A, R>))
        .route("/totp/verify", post(handlers::totp_verify::<A, R>))
        .route_layer(from_fn_with_state(
            state.middleware_state(),
            require_session_allow_pending::<A>,
        ));

    let protected = Router::new()
        .route("/totp/disable", post(handlers::totp_disable::<A, R>))
        .route("/password", post(handlers::change_password::<A, R>))
        .route("/realms", get(handlers::list_realm_choices::<A, R>))
        .route("/realms/select", post(handlers::select_realm::<A, R>))
        .route_layer(from_fn_with_state(
            state.middleware_state(),
            require_session::<A>,
        ));

    Router::new()
        .route("/signin", post(handlers::sign_in::<A, R>))
        .route("/signout", post(handlers::sign_out::<A, R>))
        .route("/status", get(handlers::session_status::<A, R>))
        .route("/password/reset", post(handlers::request_password_reset::<A, R>))
        .route(
            "/password/reset/complete",
            post(handlers::complete_password_reset::<A, R>),
        )
        .merge(enrollment)
        .merge(protected)
        .with_state(state)
}

/// Realm membership routes, mounted under `/api/realm/users`
///
/// Expects a `SessionActor` extension like the other realm console routes.
pub fn realm_users_router<A, R>(state: AuthAppState<A, R>) -> Router
where
    A: AuthStore,
    R: RealmStore,
{
    Router::new()
        .route(
            "/",
            get(handlers::list_members::<A, R>).post(handlers::add_member::<A, R>),
        )
        .route(
            "/{user_id}",
            put(handlers::update_member::<A, R>).delete(handlers::remove_member::<A, R>),
        )
        .with_state(state)
}

/// User administration routes, mounted under `/api/admin/users`
pub fn system_users_router<A, R>(state: AuthAppState<A, R>) -> Router
where
    A: AuthStore,
    R: RealmStore,
{
    Router::new()
        .route("/", get(handlers::list_users::<A, R>))
        .route(
            "/{user_id}/system-admin",
            put(handlers::set_system_admin::<A, R>),
        )
        .route("/{user_id}/status", put(handlers::set_user_status::<A, R>))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{AuthSession, Credential, SessionClient, User};
    use crate::domain::repository::{CredentialRepository, SessionRepository, UserRepository};
    use crate::domain::value_object::{Email, session_token};
    use crate::infra::memory::MemoryAuthRepository;
    use crate::presentation::middleware::require_system_admin;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use platform::password::ClearTextPassword;
    use realm::models::{Membership, Permissions, Realm};
    use realm::store::{MemoryRealmRepository, MembershipRepository, RealmRepository};
    use tower::ServiceExt;

    const AGENT: &str = "router-test";
    const PASSWORD: &str = "Sup3r-Secret!";

    type State = AuthAppState<MemoryAuthRepository, MemoryRealmRepository>;

    async fn setup() -> (State, User, Realm) {
        let auth = MemoryAuthRepository::new();
        let realms = Arc::new(MemoryRealmRepository::new());

        let realm = Realm::new("Example Health");
        realms.create_realm(&realm).await.unwrap();

        let user = User::new(Email::new("tracer@example.com").unwrap(), "Tracer");
        auth.create_user(&user).await.unwrap();
        let hash = ClearTextPassword::new(PASSWORD.into()).unwrap().hash(None).unwrap();
        auth.create_credential(&Credential::new(user.id, hash)).await.unwrap();
        realms
            .upsert_membership(&Membership::new(realm.id, user.id, Permissions::admin()))
            .await
            .unwrap();

        (
            AuthAppState::new(auth, realms, AuthConfig::development()),
            user,
            realm,
        )
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::USER_AGENT, AGENT)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn with_cookie(mut req: Request<Body>, state: &State, token: &str) -> Request<Body> {
        let cookie = format!("{}={}", state.config.cookie.name, token);
        req.headers_mut()
            .insert(header::COOKIE, cookie.parse().unwrap());
        req
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn session_for(state: &State, user: &User, mfa_pending: bool) -> String {
        let client = SessionClient {
            fingerprint_hash: platform::crypto::sha256(AGENT.as_bytes()).to_vec(),
            ..SessionClient::default()
        };
        let mut session = AuthSession::new(user.id, false, client, chrono::Duration::hours(1));
        session.mfa_pending = mfa_pending;
        state.repo.create_session(&session).await.unwrap();
        session_token::sign(session.session_id, &state.config.session_secret)
    }

    #[tokio::test]
    async fn test_sign_in_sets_cookie_and_selects_single_realm() {
        let (state, _, realm) = setup().await;
        let app = auth_router(state.clone());

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/signin",
                &format!(r#"{{"email":"tracer@example.com","password":"{PASSWORD}"}}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("verification_session="));

        let body = body_json(response).await;
        assert_eq!(body["mfaDecision"], "promptEnrollment");
        assert_eq!(body["totpRequired"], false);
        assert_eq!(body["realmId"], realm.id.to_string());

        let token = cookie
            .split(';')
            .next()
            .and_then(|kv| kv.split_once('='))
            .map(|(_, v)| v.to_string())
            .unwrap();
        let response = app
            .oneshot(with_cookie(json_request("GET", "/status", ""), &state, &token))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["authenticated"], true);
        assert_eq!(body["user"]["email"], "tracer@example.com");
    }

    #[tokio::test]
    async fn test_bad_password_is_unauthorized() {
        let (state, _, _) = setup().await;
        let response = auth_router(state)
            .oneshot(json_request(
                "POST",
                "/signin",
                r#"{"email":"tracer@example.com","password":"nope-nope"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_protected_routes_need_session() {
        let (state, user, _) = setup().await;
        let app = auth_router(state.clone());

        let response = app
            .clone()
            .oneshot(json_request("GET", "/realms", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let token = session_for(&state, &user, false).await;
        let response = app
            .oneshot(with_cookie(json_request("GET", "/realms", ""), &state, &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await[0]["name"], "Example Health");
    }

    #[tokio::test]
    async fn test_mfa_pending_session_only_reaches_enrollment() {
        let (state, user, _) = setup().await;
        let app = auth_router(state.clone());
        let token = session_for(&state, &user, true).await;

        let response = app
            .clone()
            .oneshot(with_cookie(json_request("GET", "/realms", ""), &state, &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .oneshot(with_cookie(json_request("POST", "/totp/setup", ""), &state, &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_json(response).await["otpauthUrl"].is_string());
    }

    #[tokio::test]
    async fn test_sign_out_clears_cookie() {
        let (state, user, _) = setup().await;
        let token = session_for(&state, &user, false).await;

        let response = auth_router(state.clone())
            .oneshot(with_cookie(json_request("POST", "/signout", ""), &state, &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(state.repo.sessions_for(&user.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_password_reset_request_never_reveals_accounts() {
        let (state, _, _) = setup().await;
        let app = auth_router(state);
        for email in ["tracer@example.com", "ghost@example.com"] {
            let response = app
                .clone()
                .oneshot(json_request(
                    "POST",
                    "/password/reset",
                    &format!(r#"{{"email":"{email}"}}"#),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
        }
    }

    #[tokio::test]
    async fn test_realm_users_behind_session_guard() {
        let (state, user, realm) = setup().await;
        let token = session_for(&state, &user, false).await;
        let mut session = state
            .repo
            .sessions_for(&user.id)
            .await
            .pop()
            .unwrap();
        session.realm_id = Some(realm.id);
        state.repo.update_session(&session).await.unwrap();

        let app = realm_users_router(state.clone()).layer(from_fn_with_state(
            state.middleware_state(),
            require_session::<MemoryAuthRepository>,
        ));

        let response = app
            .clone()
            .oneshot(with_cookie(
                json_request(
                    "POST",
                    "/",
                    r#"{"email":"analyst@example.com","permissions":["CodeRead"]}"#,
                ),
                &state,
                &token,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["email"], "analyst@example.com");

        let response = app
            .oneshot(with_cookie(json_request("GET", "/", ""), &state, &token))
            .await
            .unwrap();
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_system_users_need_system_admin() {
        let (state, user, _) = setup().await;
        let token = session_for(&state, &user, false).await;

        let app = system_users_router(state.clone())
            .layer(axum::middleware::from_fn(require_system_admin))
            .layer(from_fn_with_state(
                state.middleware_state(),
                require_session::<MemoryAuthRepository>,
            ));

        let response = app
            .oneshot(with_cookie(json_request("GET", "/", ""), &state, &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let mut admin = state.repo.find_user(&user.id).await.unwrap().unwrap();
        admin.set_system_admin(true);
        state.repo.update_user(&admin).await.unwrap();
        let app = system_users_router(state.clone())
            .layer(axum::middleware::from_fn(require_system_admin))
            .layer(from_fn_with_state(
                state.middleware_state(),
                require_session::<MemoryAuthRepository>,
            ));
        let response = app
            .oneshot(with_cookie(json_request("GET", "/", ""), &state, &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
