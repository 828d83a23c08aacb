//! Verification Routers

use axum::{
    Router, middleware,
    routing::{get, post},
};
use realm::models::ApiKeyType;
use realm::store::RealmStore;
use realm::{PgRealmRepository, RealmAppState};

use crate::application::config::VerificationConfig;
use crate::domain::repository::VerificationStore;
use crate::infra::postgres::PgVerificationRepository;
use crate::presentation::handlers::{self, VerificationAppState};
use crate::presentation::middleware::require_api_key;

/// Verification state backed by PostgreSQL
pub fn pg_verification_state(
    repo: PgVerificationRepository,
    realms: RealmAppState<PgRealmRepository>,
    config: VerificationConfig,
) -> VerificationAppState<PgVerificationRepository, PgRealmRepository> {
    VerificationAppState::new(repo, realms, config)
}

/// Code and statistics routes for the selected realm, mounted under
/// `/api/realm`; expects a `SessionActor` extension
pub fn verification_console_router<V, R>(state: VerificationAppState<V, R>) -> Router
where
    V: VerificationStore,
    R: RealmStore,
{
    Router::new()
        .route("/codes", post(handlers::issue_code::<V, R>))
        .route("/codes/{uuid}", get(handlers::code_status::<V, R>))
        .route("/codes/{uuid}/expire", post(handlers::expire_code::<V, R>))
        .route("/stats", get(handlers::realm_stats::<V, R>))
        .with_state(state)
}

/// API-key routes, mounted under `/api/v1`
pub fn api_router<V, R>(state: VerificationAppState<V, R>) -> Router
where
    V: VerificationStore,
    R: RealmStore,
{
    let admin = Router::new()
        .route("/issue", post(handlers::api_issue_code::<V, R>))
        .route("/checkcodestatus", post(handlers::api_code_status::<V, R>))
        .route("/expirecode", post(handlers::api_expire_code::<V, R>))
        .route_layer(middleware::from_fn_with_state(
            state.api_key_guard(ApiKeyType::Admin),
            require_api_key::<R>,
        ));

    let device = Router::new()
        .route("/verify", post(handlers::verify::<V, R>))
        .route("/certificate", post(handlers::certificate::<V, R>))
        .route_layer(middleware::from_fn_with_state(
            state.api_key_guard(ApiKeyType::Device),
            require_api_key::<R>,
        ));

    let stats = Router::new()
        .route("/stats/realm", get(handlers::api_realm_stats::<V, R>))
        .route_layer(middleware::from_fn_with_state(
            state.api_key_guard(ApiKeyType::Stats),
            require_api_key::<R>,
        ));

    Router::new()
        .merge(admin)
        .merge(device)
        .merge(stats)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::MemoryVerificationRepository;
    use axum::Extension;
    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::{Request, StatusCode};
    use crate::application::testing::member_actor;
    use kernel::actor::SessionActor;
    use platform::rate_limit::RateLimitConfig;
    use realm::RealmConfig;
    use realm::models::{Permissions, Realm};
    use realm::store::{MemoryRealmRepository, RealmRepository};
    use std::net::SocketAddr;
    use tower::ServiceExt;
    use uuid::Uuid;

    struct TestApp {
        state: VerificationAppState<MemoryVerificationRepository, MemoryRealmRepository>,
        realm: Realm,
        actor: SessionActor,
    }

    impl TestApp {
        async fn new(config: VerificationConfig) -> Self {
            let realms = MemoryRealmRepository::new();
            let realm = Realm::new("Example Health");
            realms.create_realm(&realm).await.unwrap();

            let actor = member_actor(&realms, realm.id, Permissions::admin()).await;

            let realm_state = RealmAppState::new(realms, RealmConfig::with_random_secret());
            let state =
                VerificationAppState::new(MemoryVerificationRepository::new(), realm_state, config);
            Self {
                state,
                realm,
                actor,
            }
        }

        async fn api_key(&self, api_key_type: ApiKeyType) -> String {
            self.state
                .realms
                .api_keys()
                .create(&self.actor, "Test app", api_key_type)
                .await
                .unwrap()
                .api_key
        }

        fn console(&self) -> Router {
            verification_console_router(self.state.clone()).layer(Extension(self.actor.clone()))
        }

        fn api(&self) -> Router {
            api_router(self.state.clone())
        }
    }

    fn json_request(uri: &str, api_key: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(key) = api_key {
            builder = builder.header(API_KEY_HEADER_NAME, key);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    const API_KEY_HEADER_NAME: &str = crate::presentation::middleware::API_KEY_HEADER;

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_full_device_flow() {
        let app = TestApp::new(VerificationConfig::with_random_secret()).await;
        let admin_key = app.api_key(ApiKeyType::Admin).await;
        let device_key = app.api_key(ApiKeyType::Device).await;

        let response = app
            .api()
            .oneshot(json_request(
                "/issue",
                Some(&admin_key),
                r#"{"testType":"confirmed"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-ratelimit-remaining"));
        let issued = body_json(response).await;
        let code = issued["code"].as_str().unwrap().to_string();
        let uuid = issued["uuid"].as_str().unwrap().to_string();

        let response = app
            .api()
            .oneshot(json_request(
                "/verify",
                Some(&device_key),
                &format!(r#"{{"code":"{code}","accept":["confirmed"]}}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let verified = body_json(response).await;
        assert_eq!(verified["testtype"], "confirmed");
        let token = verified["token"].as_str().unwrap().to_string();

        let mac = platform::crypto::to_base64(&[3u8; 32]);
        let response = app
            .api()
            .oneshot(json_request(
                "/certificate",
                Some(&device_key),
                &format!(r#"{{"token":"{token}","ekeyhmac":"{mac}"}}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_json(response).await["certificate"].is_string());

        let response = app
            .api()
            .oneshot(json_request(
                "/checkcodestatus",
                Some(&admin_key),
                &format!(r#"{{"uuid":"{uuid}"}}"#),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["claimed"], true);

        let response = app
            .api()
            .oneshot(json_request(
                "/expirecode",
                Some(&admin_key),
                &format!(r#"{{"uuid":"{uuid}"}}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_key_type_per_route_group() {
        let app = TestApp::new(VerificationConfig::with_random_secret()).await;
        let device_key = app.api_key(ApiKeyType::Device).await;

        let response = app
            .api()
            .oneshot(json_request(
                "/issue",
                Some(&device_key),
                r#"{"testType":"confirmed"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .api()
            .oneshot(json_request("/verify", None, r#"{"code":"12345678"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .api()
            .oneshot(json_request("/verify", Some("garbage"), r#"{"code":"12345678"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_rate_limit_exhausted() {
        let config = VerificationConfig {
            api_rate_limit: RateLimitConfig::per_minute(2),
            ..VerificationConfig::with_random_secret()
        };
        let app = TestApp::new(config).await;
        let stats_key = app.api_key(ApiKeyType::Stats).await;
        let router = app.api();

        let get = || {
            Request::get("/stats/realm?days=3")
                .header(API_KEY_HEADER_NAME, stats_key.as_str())
                .body(Body::empty())
                .unwrap()
        };

        let first = router.clone().oneshot(get()).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()["x-ratelimit-limit"], "2");
        assert_eq!(body_json(first).await.as_array().unwrap().len(), 3);

        router.clone().oneshot(get()).await.unwrap();
        let limited = router.oneshot(get()).await.unwrap();
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(limited.headers()["x-ratelimit-remaining"], "0");
        assert!(limited.headers().contains_key("x-ratelimit-reset"));
    }

    #[tokio::test]
    async fn test_forwarded_for_does_not_reset_anonymous_quota() {
        let config = VerificationConfig {
            api_rate_limit: RateLimitConfig::per_minute(1),
            ..VerificationConfig::with_random_secret()
        };
        let app = TestApp::new(config).await;
        let router = app.api();
        let peer = ConnectInfo(SocketAddr::from(([203, 0, 113, 7], 40_000)));

        let guess = |i: u8| {
            let mut request = json_request("/verify", Some("guessed-key"), r#"{"code":"12345678"}"#);
            request.headers_mut().insert(
                "x-forwarded-for",
                format!("198.51.100.{i}").parse().unwrap(),
            );
            request.extensions_mut().insert(peer);
            request
        };

        let first = router.clone().oneshot(guess(1)).await.unwrap();
        assert_eq!(first.status(), StatusCode::UNAUTHORIZED);
        for i in 2..6 {
            let response = router.clone().oneshot(guess(i)).await.unwrap();
            assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        }

        // Another peer address has its own bucket
        let mut other = json_request("/verify", Some("guessed-key"), r#"{"code":"12345678"}"#);
        other
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([203, 0, 113, 8], 40_000))));
        let response = router.oneshot(other).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_console_issue_and_expire() {
        let app = TestApp::new(VerificationConfig::with_random_secret()).await;

        let response = app
            .console()
            .oneshot(json_request("/codes", None, r#"{"testType":"likely","tzOffset":-300}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let uuid = body_json(response).await["uuid"].as_str().unwrap().to_string();

        let response = app
            .console()
            .oneshot(
                Request::get(format!("/codes/{uuid}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = body_json(response).await;
        assert_eq!(status["testType"], "likely");
        assert_eq!(status["claimed"], false);

        let response = app
            .console()
            .oneshot(json_request(&format!("/codes/{uuid}/expire"), None, ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .console()
            .oneshot(
                Request::get(format!("/codes/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(app.realm.name, "Example Health");
    }
}
