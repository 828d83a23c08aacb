//! Realm Statistics Use Case

use std::sync::Arc;

use chrono::{Duration, Utc};
use kernel::id::RealmId;
use realm::models::{ApiKeyType, Permissions};
use realm::store::MembershipRepository;

use crate::application::caller::Caller;
use crate::application::config::{STATS_DAYS_DEFAULT, STATS_DAYS_MAX};
use crate::domain::entities::RealmStats;
use crate::domain::repository::StatsRepository;
use crate::domain::value_objects::StatCounter;
use crate::error::{VerificationError, VerificationResult};

/// Counts one event for today; a failed write never fails the request
pub(crate) async fn bump<V>(repo: &V, realm_id: &RealmId, counter: StatCounter)
where
    V: StatsRepository,
{
    let today = Utc::now().date_naive();
    if let Err(e) = repo.increment_stat(realm_id, today, counter).await {
        tracing::warn!(
            realm_id = %realm_id,
            counter = counter.column(),
            error = %e,
            "Failed to update realm statistics"
        );
    }
}

pub struct RealmStatsUseCase<V, R>
where
    V: StatsRepository,
    R: MembershipRepository,
{
    repo: Arc<V>,
    realms: Arc<R>,
}

impl<V, R> RealmStatsUseCase<V, R>
where
    V: StatsRepository,
    R: MembershipRepository,
{
    pub fn new(repo: Arc<V>, realms: Arc<R>) -> Self {
        Self { repo, realms }
    }

    /// One row per day for the last `days` days, newest first
    pub async fn execute(
        &self,
        caller: Caller<'_>,
        days: Option<u32>,
    ) -> VerificationResult<Vec<RealmStats>> {
        let realm_id = caller
            .realm(self.realms.as_ref(), Permissions::STATS_READ, ApiKeyType::Stats)
            .await?;

        let days = days.unwrap_or(STATS_DAYS_DEFAULT);
        if !(1..=STATS_DAYS_MAX).contains(&days) {
            return Err(VerificationError::Validation(format!(
                "days must be between 1 and {STATS_DAYS_MAX}"
            )));
        }

        let today = Utc::now().date_naive();
        let since = today - Duration::days(i64::from(days) - 1);
        let rows = self.repo.list_stats(&realm_id, since).await?;

        Ok((0..i64::from(days))
            .map(|offset| {
                let date = today - Duration::days(offset);
                rows.iter()
                    .find(|r| r.date == date)
                    .copied()
                    .unwrap_or_else(|| RealmStats::empty(realm_id, date))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{admin_actor, app_with_type, realm_store};
    use crate::infra::memory::MemoryVerificationRepository;

    #[tokio::test]
    async fn test_stats_zero_filled() {
        let (realms, realm) = realm_store().await;
        let repo = Arc::new(MemoryVerificationRepository::new());
        bump(repo.as_ref(), &realm.id, StatCounter::CodesIssued).await;
        bump(repo.as_ref(), &realm.id, StatCounter::CodesIssued).await;
        bump(repo.as_ref(), &realm.id, StatCounter::TokensClaimed).await;

        let actor = admin_actor(&realms, realm.id).await;
        let stats = RealmStatsUseCase::new(repo, realms)
            .execute(Caller::Session(&actor), Some(7))
            .await
            .unwrap();

        assert_eq!(stats.len(), 7);
        assert_eq!(stats[0].date, Utc::now().date_naive());
        assert_eq!(stats[0].codes_issued, 2);
        assert_eq!(stats[0].tokens_claimed, 1);
        assert!(stats[1..].iter().all(|s| s.codes_issued == 0));
    }

    #[tokio::test]
    async fn test_stats_day_bounds() {
        let (realms, realm) = realm_store().await;
        let app = app_with_type(realm.id, ApiKeyType::Stats);
        let use_case =
            RealmStatsUseCase::new(Arc::new(MemoryVerificationRepository::new()), realms);

        assert_eq!(
            use_case.execute(Caller::App(&app), None).await.unwrap().len(),
            STATS_DAYS_DEFAULT as usize
        );
        assert!(matches!(
            use_case.execute(Caller::App(&app), Some(0)).await,
            Err(VerificationError::Validation(_))
        ));
        assert!(matches!(
            use_case.execute(Caller::App(&app), Some(91)).await,
            Err(VerificationError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_stats_rejects_device_key() {
        let (realms, realm) = realm_store().await;
        let app = app_with_type(realm.id, ApiKeyType::Device);
        let result = RealmStatsUseCase::new(Arc::new(MemoryVerificationRepository::new()), realms)
            .execute(Caller::App(&app), None)
            .await;
        assert!(matches!(
            result,
            Err(VerificationError::Realm(realm::RealmError::WrongApiKeyType))
        ));
    }
}
