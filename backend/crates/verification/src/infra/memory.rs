//! In-memory verification store for tests

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use kernel::id::{RealmId, VerificationCodeId, VerificationTokenId};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::entities::{RealmStats, VerificationCode, VerificationToken};
use crate::domain::repository::{CodeRepository, StatsRepository, TokenRepository};
use crate::domain::value_objects::{CodeKind, StatCounter};
use crate::error::{VerificationError, VerificationResult};

#[derive(Default)]
struct State {
    codes: HashMap<VerificationCodeId, VerificationCode>,
    tokens: HashMap<VerificationTokenId, VerificationToken>,
    stats: HashMap<(RealmId, NaiveDate), RealmStats>,
}

/// Keeps everything in process memory; clones share state
#[derive(Clone, Default)]
pub struct MemoryVerificationRepository {
    state: Arc<Mutex<State>>,
}

impl MemoryVerificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn codes(&self) -> Vec<VerificationCode> {
        self.state.lock().await.codes.values().cloned().collect()
    }

    pub async fn tokens(&self) -> Vec<VerificationToken> {
        self.state.lock().await.tokens.values().cloned().collect()
    }
}

impl CodeRepository for MemoryVerificationRepository {
    async fn create_code(&self, code: &VerificationCode) -> VerificationResult<()> {
        let mut state = self.state.lock().await;
        if state
            .codes
            .values()
            .any(|c| c.realm_id == code.realm_id && c.uuid == code.uuid)
        {
            return Err(VerificationError::DuplicateUuid);
        }
        state.codes.insert(code.id, code.clone());
        Ok(())
    }

    async fn find_code_by_uuid(
        &self,
        realm_id: &RealmId,
        uuid: &Uuid,
    ) -> VerificationResult<Option<VerificationCode>> {
        let state = self.state.lock().await;
        Ok(state
            .codes
            .values()
            .find(|c| c.realm_id == *realm_id && c.uuid == *uuid)
            .cloned())
    }

    async fn find_code_by_hmac(
        &self,
        realm_id: &RealmId,
        hmac: &str,
    ) -> VerificationResult<Option<VerificationCode>> {
        let state = self.state.lock().await;
        Ok(state
            .codes
            .values()
            .filter(|c| c.realm_id == *realm_id && c.kind_of(hmac).is_some())
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn claim_code(
        &self,
        code_id: &VerificationCodeId,
        kind: CodeKind,
        now: DateTime<Utc>,
    ) -> VerificationResult<Option<VerificationCode>> {
        let mut state = self.state.lock().await;
        Ok(state
            .codes
            .get_mut(code_id)
            .filter(|c| !c.claimed && !c.is_expired(kind, now))
            .map(|c| {
                c.claimed = true;
                c.clone()
            }))
    }

    async fn release_code(&self, code_id: &VerificationCodeId) -> VerificationResult<()> {
        if let Some(code) = self.state.lock().await.codes.get_mut(code_id) {
            code.claimed = false;
        }
        Ok(())
    }

    async fn expire_code(
        &self,
        code_id: &VerificationCodeId,
        now: DateTime<Utc>,
    ) -> VerificationResult<Option<VerificationCode>> {
        let mut state = self.state.lock().await;
        Ok(state
            .codes
            .get_mut(code_id)
            .filter(|c| !c.claimed)
            .map(|c| {
                c.expires_at = now;
                c.long_expires_at = now;
                c.clone()
            }))
    }

    async fn purge_codes(&self, before: DateTime<Utc>) -> VerificationResult<u64> {
        let mut state = self.state.lock().await;
        let count = state.codes.len();
        state.codes.retain(|_, c| c.long_expires_at >= before);
        Ok((count - state.codes.len()) as u64)
    }
}

impl TokenRepository for MemoryVerificationRepository {
    async fn create_token(&self, token: &VerificationToken) -> VerificationResult<()> {
        self.state.lock().await.tokens.insert(token.id, token.clone());
        Ok(())
    }

    async fn find_token(
        &self,
        realm_id: &RealmId,
        token_id: &VerificationTokenId,
    ) -> VerificationResult<Option<VerificationToken>> {
        let state = self.state.lock().await;
        Ok(state
            .tokens
            .get(token_id)
            .filter(|t| t.realm_id == *realm_id)
            .cloned())
    }

    async fn use_token(
        &self,
        realm_id: &RealmId,
        token_id: &VerificationTokenId,
        now: DateTime<Utc>,
    ) -> VerificationResult<Option<VerificationToken>> {
        let mut state = self.state.lock().await;
        Ok(state
            .tokens
            .get_mut(token_id)
            .filter(|t| t.realm_id == *realm_id && !t.used && !t.is_expired(now))
            .map(|t| {
                t.used = true;
                t.clone()
            }))
    }

    async fn purge_tokens(&self, before: DateTime<Utc>) -> VerificationResult<u64> {
        let mut state = self.state.lock().await;
        let count = state.tokens.len();
        state.tokens.retain(|_, t| t.expires_at >= before);
        Ok((count - state.tokens.len()) as u64)
    }
}

impl StatsRepository for MemoryVerificationRepository {
    async fn increment_stat(
        &self,
        realm_id: &RealmId,
        date: NaiveDate,
        counter: StatCounter,
    ) -> VerificationResult<()> {
        let mut state = self.state.lock().await;
        let row = state
            .stats
            .entry((*realm_id, date))
            .or_insert_with(|| RealmStats::empty(*realm_id, date));
        match counter {
            StatCounter::CodesIssued => row.codes_issued += 1,
            StatCounter::CodesClaimed => row.codes_claimed += 1,
            StatCounter::TokensClaimed => row.tokens_claimed += 1,
        }
        Ok(())
    }

    async fn list_stats(
        &self,
        realm_id: &RealmId,
        since: NaiveDate,
    ) -> VerificationResult<Vec<RealmStats>> {
        let state = self.state.lock().await;
        let mut rows: Vec<RealmStats> = state
            .stats
            .values()
            .filter(|s| s.realm_id == *realm_id && s.date >= since)
            .copied()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(rows)
    }
}
