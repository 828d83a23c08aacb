//! Shared fixtures for use case tests

use std::sync::Arc;

use chrono::Duration;
use kernel::actor::SessionActor;
use kernel::id::RealmId;
use platform::password::ClearTextPassword;
use realm::models::{Membership, Permissions, Realm};
use realm::store::{MemoryRealmRepository, MembershipRepository, RealmRepository};

use crate::application::config::AuthConfig;
use crate::domain::entity::{AuthSession, Credential, SessionClient, User};
use crate::domain::repository::{CredentialRepository, SessionRepository, UserRepository};
use crate::domain::value_object::{Email, session_token};
use crate::infra::memory::MemoryAuthRepository;

pub const PASSWORD: &str = "Sup3r-Secret!";

pub struct Fixture {
    pub auth: Arc<MemoryAuthRepository>,
    pub realms: Arc<MemoryRealmRepository>,
    pub config: Arc<AuthConfig>,
    /// Regular member of `realm` with admin permissions
    pub user: User,
    /// System admin without memberships
    pub admin: User,
    pub realm: Realm,
    pub fingerprint: Vec<u8>,
}

impl Fixture {
    pub async fn new() -> Self {
        let auth = Arc::new(MemoryAuthRepository::new());
        let realms = Arc::new(MemoryRealmRepository::new());
        let config = Arc::new(AuthConfig::with_random_secret());

        let realm = Realm::new("Example Health");
        realms.create_realm(&realm).await.unwrap();

        let user = create_user(&auth, "tracer@example.com", false).await;
        let admin = create_user(&auth, "admin@example.com", true).await;

        realms
            .upsert_membership(&Membership::new(realm.id, user.id, Permissions::admin()))
            .await
            .unwrap();

        Self {
            auth,
            realms,
            config,
            user,
            admin,
            realm,
            fingerprint: platform::crypto::sha256(b"test-agent").to_vec(),
        }
    }

    pub fn client(&self) -> SessionClient {
        SessionClient {
            fingerprint_hash: self.fingerprint.clone(),
            ip_address: Some("127.0.0.1".into()),
            user_agent: Some("test-agent".into()),
        }
    }

    /// Stored session and its cookie token
    pub async fn signed_in(&self, user: &User) -> (String, AuthSession) {
        let session = AuthSession::new(user.id, false, self.client(), Duration::hours(1));
        self.auth.create_session(&session).await.unwrap();
        (
            session_token::sign(session.session_id, &self.config.session_secret),
            session,
        )
    }

    pub fn actor(&self, user: &User, realm_id: Option<RealmId>) -> SessionActor {
        SessionActor {
            user_id: user.id,
            session_id: uuid::Uuid::new_v4(),
            email: user.email.to_string(),
            name: user.name.clone(),
            system_admin: user.system_admin,
            realm_id,
        }
    }

    pub async fn update_realm(&self, f: impl FnOnce(&mut Realm)) -> Realm {
        let mut realm = self.realm.clone();
        f(&mut realm);
        self.realms.update_realm(&realm).await.unwrap();
        realm
    }
}

pub async fn create_user(auth: &MemoryAuthRepository, email: &str, system_admin: bool) -> User {
    let mut user = User::new(Email::new(email).unwrap(), "");
    user.system_admin = system_admin;
    auth.create_user(&user).await.unwrap();

    let hash = ClearTextPassword::new(PASSWORD.to_string())
        .unwrap()
        .hash(None)
        .unwrap();
    auth.create_credential(&Credential::new(user.id, hash))
        .await
        .unwrap();
    user
}
