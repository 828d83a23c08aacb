//! In-memory auth store for tests

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::UserId;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::entity::{AuthSession, Credential, PasswordResetToken, User};
use crate::domain::repository::{
    CredentialRepository, PasswordResetRepository, SessionRepository, UserRepository,
};
use crate::domain::value_object::Email;
use crate::error::{AuthError, AuthResult};

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    credentials: HashMap<UserId, Credential>,
    sessions: HashMap<Uuid, AuthSession>,
    reset_tokens: Vec<PasswordResetToken>,
}

/// Keeps everything in process memory; clones share state
#[derive(Clone, Default)]
pub struct MemoryAuthRepository {
    state: Arc<Mutex<State>>,
}

impl MemoryAuthRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sessions_for(&self, user_id: &UserId) -> Vec<AuthSession> {
        self.state
            .lock()
            .await
            .sessions
            .values()
            .filter(|s| &s.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn reset_tokens_for(&self, user_id: &UserId) -> Vec<PasswordResetToken> {
        self.state
            .lock()
            .await
            .reset_tokens
            .iter()
            .filter(|t| &t.user_id == user_id)
            .cloned()
            .collect()
    }
}

impl UserRepository for MemoryAuthRepository {
    async fn create_user(&self, user: &User) -> AuthResult<()> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(AuthError::EmailTaken);
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        Ok(self.state.lock().await.users.get(user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .values()
            .find(|u| &u.email == email)
            .cloned())
    }

    async fn find_users(&self, user_ids: &[UserId]) -> AuthResult<Vec<User>> {
        let state = self.state.lock().await;
        let mut users: Vec<User> = user_ids
            .iter()
            .filter_map(|id| state.users.get(id).cloned())
            .collect();
        users.sort_by(|a, b| a.email.as_str().cmp(b.email.as_str()));
        Ok(users)
    }

    async fn list_users(&self) -> AuthResult<Vec<User>> {
        let mut users: Vec<User> = self.state.lock().await.users.values().cloned().collect();
        users.sort_by(|a, b| a.email.as_str().cmp(b.email.as_str()));
        Ok(users)
    }

    async fn update_user(&self, user: &User) -> AuthResult<()> {
        let mut state = self.state.lock().await;
        if !state.users.contains_key(&user.id) {
            return Err(AuthError::UserNotFound);
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn count_users(&self) -> AuthResult<u64> {
        Ok(self.state.lock().await.users.len() as u64)
    }
}

impl CredentialRepository for MemoryAuthRepository {
    async fn create_credential(&self, credential: &Credential) -> AuthResult<()> {
        self.state
            .lock()
            .await
            .credentials
            .insert(credential.user_id, credential.clone());
        Ok(())
    }

    async fn find_credential(&self, user_id: &UserId) -> AuthResult<Option<Credential>> {
        Ok(self.state.lock().await.credentials.get(user_id).cloned())
    }

    async fn update_credential(&self, credential: &Credential) -> AuthResult<()> {
        self.create_credential(credential).await
    }
}

impl SessionRepository for MemoryAuthRepository {
    async fn create_session(&self, session: &AuthSession) -> AuthResult<()> {
        self.state
            .lock()
            .await
            .sessions
            .insert(session.session_id, session.clone());
        Ok(())
    }

    async fn find_session(
        &self,
        session_id: Uuid,
        fingerprint_hash: &[u8],
    ) -> AuthResult<Option<AuthSession>> {
        Ok(self
            .state
            .lock()
            .await
            .sessions
            .get(&session_id)
            .filter(|s| s.fingerprint_hash == fingerprint_hash)
            .cloned())
    }

    async fn load_session(&self, session_id: Uuid) -> AuthResult<Option<AuthSession>> {
        Ok(self.state.lock().await.sessions.get(&session_id).cloned())
    }

    async fn update_session(&self, session: &AuthSession) -> AuthResult<()> {
        let mut state = self.state.lock().await;
        if let Some(stored) = state.sessions.get_mut(&session.session_id) {
            *stored = session.clone();
        }
        Ok(())
    }

    async fn touch_session(
        &self,
        session_id: Uuid,
        last_activity_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        if let Some(stored) = self.state.lock().await.sessions.get_mut(&session_id) {
            stored.last_activity_at = last_activity_at;
            stored.expires_at = expires_at;
        }
        Ok(())
    }

    async fn delete_session(&self, session_id: Uuid) -> AuthResult<()> {
        self.state.lock().await.sessions.remove(&session_id);
        Ok(())
    }

    async fn delete_sessions_for_user(
        &self,
        user_id: &UserId,
        except: Option<Uuid>,
    ) -> AuthResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.sessions.len();
        state
            .sessions
            .retain(|id, s| &s.user_id != user_id || Some(*id) == except);
        Ok((before - state.sessions.len()) as u64)
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.sessions.len();
        state.sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - state.sessions.len()) as u64)
    }
}

impl PasswordResetRepository for MemoryAuthRepository {
    async fn create_reset_token(&self, token: &PasswordResetToken) -> AuthResult<()> {
        self.state.lock().await.reset_tokens.push(token.clone());
        Ok(())
    }

    async fn find_reset_token(&self, token_hash: &[u8]) -> AuthResult<Option<PasswordResetToken>> {
        Ok(self
            .state
            .lock()
            .await
            .reset_tokens
            .iter()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn consume_reset_token(&self, token_id: Uuid, now: DateTime<Utc>) -> AuthResult<bool> {
        let mut state = self.state.lock().await;
        match state
            .reset_tokens
            .iter_mut()
            .find(|t| t.token_id == token_id && t.is_usable(now))
        {
            Some(token) => {
                token.used_at = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn purge_reset_tokens(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.reset_tokens.len();
        state.reset_tokens.retain(|t| t.is_usable(now));
        Ok((before - state.reset_tokens.len()) as u64)
    }
}
