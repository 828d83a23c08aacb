//! Realm Routers
//!
//! Both routers expect a `SessionActor` extension; the server mounts them
//! behind the auth session middleware.

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::application::config::RealmConfig;
use crate::domain::repository::RealmStore;
use crate::infra::postgres::PgRealmRepository;
use crate::presentation::handlers::{self, RealmAppState};

/// Shared realm state backed by PostgreSQL
pub fn pg_realm_state(repo: PgRealmRepository, config: RealmConfig) -> RealmAppState<PgRealmRepository> {
    RealmAppState::new(repo, config)
}

/// System administration routes, mounted under `/api/admin`
pub fn admin_router<R>(state: RealmAppState<R>) -> Router
where
    R: RealmStore,
{
    Router::new()
        .route(
            "/realms",
            get(handlers::list_realms::<R>).post(handlers::create_realm::<R>),
        )
        .route(
            "/realms/{realm_id}",
            get(handlers::get_realm::<R>).patch(handlers::update_realm::<R>),
        )
        .route(
            "/sms",
            get(handlers::get_system_sms::<R>).put(handlers::put_system_sms::<R>),
        )
        .route("/sms/from-numbers", put(handlers::put_sms_from_numbers::<R>))
        .route(
            "/email",
            get(handlers::get_system_email::<R>).put(handlers::put_system_email::<R>),
        )
        .route("/audit", get(handlers::list_system_audit::<R>))
        .with_state(state)
}

/// Realm console routes for the selected realm, mounted under `/api/realm`
pub fn console_router<R>(state: RealmAppState<R>) -> Router
where
    R: RealmStore,
{
    Router::new()
        .route(
            "/settings",
            get(handlers::get_settings::<R>).patch(handlers::update_settings::<R>),
        )
        .route(
            "/api-keys",
            get(handlers::list_api_keys::<R>).post(handlers::create_api_key::<R>),
        )
        .route("/api-keys/{app_id}", get(handlers::get_api_key::<R>))
        .route("/api-keys/{app_id}/disable", post(handlers::disable_api_key::<R>))
        .route("/api-keys/{app_id}/enable", post(handlers::enable_api_key::<R>))
        .route(
            "/mobile-apps",
            get(handlers::list_mobile_apps::<R>).post(handlers::create_mobile_app::<R>),
        )
        .route("/mobile-apps/{mobile_app_id}", put(handlers::update_mobile_app::<R>))
        .route(
            "/mobile-apps/{mobile_app_id}/disable",
            post(handlers::disable_mobile_app::<R>),
        )
        .route(
            "/mobile-apps/{mobile_app_id}/enable",
            post(handlers::enable_mobile_app::<R>),
        )
        .route(
            "/sms",
            get(handlers::get_realm_sms::<R>).put(handlers::put_realm_sms::<R>),
        )
        .route(
            "/email",
            get(handlers::get_realm_email::<R>).put(handlers::put_realm_email::<R>),
        )
        .route("/audit", get(handlers::list_realm_audit::<R>))
        .route(
            "/signing-keys",
            get(handlers::list_signing_keys::<R>).post(handlers::create_signing_key::<R>),
        )
        .route(
            "/signing-keys/{key_id}/activate",
            post(handlers::activate_signing_key::<R>),
        )
        .route(
            "/signing-keys/{key_id}",
            axum::routing::delete(handlers::delete_signing_key::<R>),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Membership;
    use crate::domain::repository::MembershipRepository;
    use crate::domain::value_object::Permissions;
    use crate::infra::memory::MemoryRealmRepository;
    use axum::Extension;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use kernel::actor::SessionActor;
    use kernel::id::{RealmId, UserId};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn actor(system_admin: bool, realm_id: Option<RealmId>) -> SessionActor {
        SessionActor {
            user_id: UserId::new(),
            session_id: Uuid::new_v4(),
            email: "admin@example.com".into(),
            name: "Admin".into(),
            system_admin,
            realm_id,
        }
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_admin_creates_realm() {
        let state = RealmAppState::new(MemoryRealmRepository::new(), RealmConfig::default());
        let app = admin_router(state).layer(Extension(actor(true, None)));

        let response = app
            .clone()
            .oneshot(json_request("POST", "/realms", r#"{"name":"Washington"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["name"], "Washington");
        assert_eq!(body["codeLength"], 8);

        let response = app
            .oneshot(Request::get("/realms").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_admin_routes_reject_realm_users() {
        let state = RealmAppState::new(MemoryRealmRepository::new(), RealmConfig::default());
        let app = admin_router(state).layer(Extension(actor(false, None)));

        let response = app
            .oneshot(Request::get("/realms").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["status"], 403);
    }

    #[tokio::test]
    async fn test_console_api_key_flow() {
        let repo = MemoryRealmRepository::new();
        let realm_id = RealmId::new();
        let user = actor(false, Some(realm_id));
        repo.upsert_membership(&Membership::new(realm_id, user.user_id, Permissions::admin()))
            .await
            .unwrap();
        let state = RealmAppState::new(repo, RealmConfig::with_random_secret());
        let app = console_router(state.clone()).layer(Extension(user));

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api-keys",
                r#"{"name":"Lab","apiKeyType":"admin"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        let key = body["apiKey"].as_str().unwrap().to_string();
        let id = body["id"].as_str().unwrap().to_string();
        assert!(state.api_keys().lookup(&key).await.is_ok());

        let response = app
            .clone()
            .oneshot(json_request("POST", &format!("/api-keys/{id}/disable"), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["active"], false);
        assert!(state.api_keys().lookup(&key).await.is_err());

        let response = app
            .oneshot(Request::get("/api-keys").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let listed = body_json(response).await;
        assert!(listed[0].get("apiKey").is_none());
    }

    #[tokio::test]
    async fn test_console_requires_selected_realm() {
        let state = RealmAppState::new(MemoryRealmRepository::new(), RealmConfig::default());
        let app = console_router(state).layer(Extension(actor(false, None)));

        let response = app
            .oneshot(Request::get("/settings").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["action"], "Select a realm first");
    }
}
