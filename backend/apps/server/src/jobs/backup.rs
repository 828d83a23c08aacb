//! Database export trigger
//!
//! Asks the export service at `BACKUP_EXPORT_URL` to snapshot the database.
//! The `backup` lock is held for the minimum interval so that repeated
//! triggers do not pile up exports.

use chrono::{DateTime, Utc};
use platform::lock::LockStore;
use serde::Serialize;

use crate::config::JobConfig;
use crate::jobs::{JobError, JobResult};

pub const BACKUP_LOCK: &str = "backup";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportRequest<'a> {
    database: &'a str,
    requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupReport {
    pub requested_at: DateTime<Utc>,
    pub export_status: u16,
}

pub async fn run_backup<L>(locks: &L, config: &JobConfig) -> JobResult<BackupReport>
where
    L: LockStore,
    L::Error: std::fmt::Display,
{
    let url = config
        .backup_export_url
        .as_deref()
        .ok_or(JobError::NotConfigured("BACKUP_EXPORT_URL"))?;

    let acquired = locks
        .try_acquire(BACKUP_LOCK, config.backup_min_interval)
        .await
        .map_err(|e| JobError::Lock(e.to_string()))?;
    if !acquired {
        return Err(JobError::Locked(BACKUP_LOCK));
    }

    let requested_at = Utc::now();
    match request_export(config, url, requested_at).await {
        Ok(status) => {
            tracing::info!(status, "Backup export requested");
            Ok(BackupReport {
                requested_at,
                export_status: status,
            })
        }
        Err(e) => {
            // Failed exports leave the lock free for a retry
            if let Err(release) = locks.release(BACKUP_LOCK).await {
                tracing::warn!(error = %release, "Failed to release backup lock");
            }
            Err(e)
        }
    }
}

async fn request_export(
    config: &JobConfig,
    url: &str,
    requested_at: DateTime<Utc>,
) -> JobResult<u16> {
    let response = config
        .http_client
        .post(url)
        .json(&ExportRequest {
            database: "verification",
            requested_at,
        })
        .send()
        .await?
        .error_for_status()?;
    Ok(response.status().as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::lock::MemoryLockStore;
    use std::time::Duration;

    fn config(url: Option<&str>) -> JobConfig {
        JobConfig {
            backup_export_url: url.map(str::to_string),
            backup_min_interval: Duration::from_secs(60),
            ..JobConfig::default()
        }
    }

    #[tokio::test]
    async fn test_backup_requires_export_url() {
        let locks = MemoryLockStore::new();
        assert!(matches!(
            run_backup(&locks, &config(None)).await,
            Err(JobError::NotConfigured(_))
        ));
        // Nothing was locked
        assert!(locks.try_acquire(BACKUP_LOCK, Duration::from_secs(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_backup_refused_while_locked() {
        let locks = MemoryLockStore::new();
        locks.try_acquire(BACKUP_LOCK, Duration::from_secs(60)).await.unwrap();

        let result = run_backup(&locks, &config(Some("http://127.0.0.1:9/export"))).await;
        assert!(matches!(result, Err(JobError::Locked(BACKUP_LOCK))));
    }

    #[tokio::test]
    async fn test_failed_export_releases_lock() {
        let locks = MemoryLockStore::new();
        let result = run_backup(&locks, &config(Some("http://127.0.0.1:9/export"))).await;
        assert!(matches!(result, Err(JobError::Export(_))));
        assert!(locks.try_acquire(BACKUP_LOCK, Duration::from_secs(1)).await.unwrap());
    }
}
