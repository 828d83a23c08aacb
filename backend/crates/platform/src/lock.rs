//! Named, time-limited locks for background jobs.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

#[trait_variant::make(LockStore: Send)]
pub trait LocalLockStore {
    type Error;

    /// Take `name` for `ttl`; false while another holder's lock is live
    async fn try_acquire(&self, name: &str, ttl: Duration) -> Result<bool, Self::Error>;

    async fn release(&self, name: &str) -> Result<(), Self::Error>;
}

/// Process-local lock store
#[derive(Default)]
pub struct MemoryLockStore {
    locks: Mutex<HashMap<String, Instant>>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LockStore for MemoryLockStore {
    type Error = std::convert::Infallible;

    async fn try_acquire(&self, name: &str, ttl: Duration) -> Result<bool, Self::Error> {
        let now = Instant::now();
        let mut locks = self.locks.lock().await;
        match locks.get(name) {
            Some(expires_at) if *expires_at > now => Ok(false),
            _ => {
                locks.insert(name.to_string(), now + ttl);
                Ok(true)
            }
        }
    }

    async fn release(&self, name: &str) -> Result<(), Self::Error> {
        self.locks.lock().await.remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Duration, LockStore, MemoryLockStore};

    #[tokio::test]
    async fn test_lock_is_exclusive_until_released() {
        let store = MemoryLockStore::new();
        let ttl = Duration::from_secs(60);

        assert!(store.try_acquire("backup", ttl).await.unwrap());
        assert!(!store.try_acquire("backup", ttl).await.unwrap());
        assert!(store.try_acquire("cleanup", ttl).await.unwrap());

        store.release("backup").await.unwrap();
        assert!(store.try_acquire("backup", ttl).await.unwrap());
    }

    #[tokio::test]
    async fn test_lock_expires() {
        let store = MemoryLockStore::new();
        assert!(store.try_acquire("backup", Duration::from_millis(5)).await.unwrap());
        tokio::time::sleep(Duration::from_millis(15)).await;
        assert!(store.try_acquire("backup", Duration::from_millis(5)).await.unwrap());
    }
}
