//! Job locks in the `locks` table, shared by every server instance

use std::time::Duration;

use platform::lock::LockStore;
use sqlx::PgPool;

pub struct PgLockStore {
    pool: PgPool,
}

impl PgLockStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl LockStore for PgLockStore {
    type Error = sqlx::Error;

    async fn try_acquire(&self, name: &str, ttl: Duration) -> Result<bool, Self::Error> {
        let ttl_secs = ttl.as_secs_f64();
        // The upsert only overwrites a lock whose holder's time is up
        let taken: Option<String> = sqlx::query_scalar(
            r#"
            INSERT INTO locks (name, expires_at)
            VALUES ($1, NOW() + make_interval(secs => $2))
            ON CONFLICT (name) DO UPDATE
                SET expires_at = EXCLUDED.expires_at
                WHERE locks.expires_at <= NOW()
            RETURNING name
            "#,
        )
        .bind(name)
        .bind(ttl_secs)
        .fetch_optional(&self.pool)
        .await?;

        Ok(taken.is_some())
    }

    async fn release(&self, name: &str) -> Result<(), Self::Error> {
        sqlx::query("DELETE FROM locks WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
