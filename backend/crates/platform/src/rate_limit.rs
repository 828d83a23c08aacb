//! Rate Limiting
//!
//! Keyed request quotas for the API-key surface. The in-memory store keeps
//! one governor limiter per key; a quota of `max_requests` per `window`
//! refills one request every `window / max_requests`. Limiters left idle for
//! a whole window are full again and get dropped on the next sweep.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use governor::clock::{Clock, DefaultClock};
use governor::middleware::StateInformationMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::sync::RwLock;
use tracing::debug;

/// Rate limit configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, 60)
    }

    fn burst(&self) -> NonZeroU32 {
        NonZeroU32::new(self.max_requests).unwrap_or(NonZeroU32::MIN)
    }

    fn replenish_period(&self) -> Duration {
        (self.window / self.burst().get()).max(Duration::from_nanos(1))
    }

    fn quota(&self) -> Quota {
        Quota::with_period(self.replenish_period())
            .unwrap_or_else(|| Quota::per_second(self.burst()))
            .allow_burst(self.burst())
    }
}

/// Rate limit check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Unix milliseconds at which the full quota is available again
    pub reset_at_ms: i64,
}

impl RateLimitResult {
    /// Seconds until reset, rounded up (for `X-RateLimit-Reset`)
    pub fn reset_after_secs(&self, now_ms: i64) -> u64 {
        let delta = (self.reset_at_ms - now_ms).max(0) as u64;
        delta.div_ceil(1000)
    }
}

/// Trait for rate limit storage backends
#[trait_variant::make(RateLimitStore: Send)]
pub trait LocalRateLimitStore {
    /// Consume one request for `key`
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, Box<dyn std::error::Error + Send + Sync>>;
}

type KeyLimiter =
    RateLimiter<NotKeyed, InMemoryState, DefaultClock, StateInformationMiddleware>;

const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Entry {
    config: RateLimitConfig,
    limiter: Arc<KeyLimiter>,
    /// Unix milliseconds of the last check
    last_used_ms: AtomicI64,
}

impl Entry {
    fn new(config: &RateLimitConfig, now_ms: i64) -> Self {
        Self {
            config: config.clone(),
            limiter: Arc::new(new_limiter(config)),
            last_used_ms: AtomicI64::new(now_ms),
        }
    }

    fn touch(&self, now_ms: i64) -> Arc<KeyLimiter> {
        self.last_used_ms.store(now_ms, Ordering::Relaxed);
        self.limiter.clone()
    }

    /// Untouched for a whole window, so the bucket has refilled
    fn is_idle(&self, now_ms: i64) -> bool {
        now_ms - self.last_used_ms.load(Ordering::Relaxed) >= self.config.window.as_millis() as i64
    }
}

/// In-memory keyed rate limiter backed by governor
pub struct GovernorRateLimitStore {
    limiters: RwLock<HashMap<String, Entry>>,
    clock: DefaultClock,
    sweep_interval: Duration,
    last_sweep_ms: AtomicI64,
}

impl Default for GovernorRateLimitStore {
    fn default() -> Self {
        Self::with_sweep_interval(DEFAULT_SWEEP_INTERVAL)
    }
}

impl GovernorRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idle limiters are swept at most once per `interval`, when a new key arrives
    pub fn with_sweep_interval(interval: Duration) -> Self {
        Self {
            limiters: RwLock::new(HashMap::new()),
            clock: DefaultClock::default(),
            sweep_interval: interval,
            last_sweep_ms: AtomicI64::new(0),
        }
    }

    pub async fn len(&self) -> usize {
        self.limiters.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops every idle limiter, returning how many were removed
    pub async fn purge_idle(&self) -> usize {
        let now_ms = unix_millis();
        let mut limiters = self.limiters.write().await;
        self.last_sweep_ms.store(now_ms, Ordering::Relaxed);
        sweep(&mut limiters, now_ms)
    }

    async fn limiter_for(&self, key: &str, config: &RateLimitConfig) -> Arc<KeyLimiter> {
        let now_ms = unix_millis();
        if let Some(entry) = self.limiters.read().await.get(key)
            && entry.config == *config
        {
            return entry.touch(now_ms);
        }

        let mut limiters = self.limiters.write().await;
        if !limiters.contains_key(key) && self.sweep_due(now_ms) {
            let removed = sweep(&mut limiters, now_ms);
            if removed > 0 {
                debug!(removed, remaining = limiters.len(), "Dropped idle rate limiters");
            }
        }
        let entry = limiters
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(config, now_ms));
        // A changed quota for the key starts a fresh bucket
        if entry.config != *config {
            *entry = Entry::new(config, now_ms);
        }
        entry.touch(now_ms)
    }

    fn sweep_due(&self, now_ms: i64) -> bool {
        let last = self.last_sweep_ms.load(Ordering::Relaxed);
        if now_ms - last < self.sweep_interval.as_millis() as i64 {
            return false;
        }
        self.last_sweep_ms.store(now_ms, Ordering::Relaxed);
        true
    }

    fn check(&self, limiter: &KeyLimiter, config: &RateLimitConfig) -> RateLimitResult {
        let now_ms = unix_millis();
        let limit = config.burst().get();
        match limiter.check() {
            Ok(snapshot) => {
                let remaining = snapshot.remaining_burst_capacity();
                let used = limit.saturating_sub(remaining);
                let refill = config.replenish_period() * used;
                RateLimitResult {
                    allowed: true,
                    limit,
                    remaining,
                    reset_at_ms: now_ms + refill.as_millis() as i64,
                }
            }
            Err(not_until) => {
                let wait = not_until.wait_time_from(self.clock.now());
                RateLimitResult {
                    allowed: false,
                    limit,
                    remaining: 0,
                    reset_at_ms: now_ms + wait.as_millis() as i64,
                }
            }
        }
    }
}

fn sweep(limiters: &mut HashMap<String, Entry>, now_ms: i64) -> usize {
    let before = limiters.len();
    limiters.retain(|_, entry| !entry.is_idle(now_ms));
    before - limiters.len()
}

fn new_limiter(config: &RateLimitConfig) -> KeyLimiter {
    RateLimiter::direct(config.quota()).with_middleware::<StateInformationMiddleware>()
}

fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

impl RateLimitStore for GovernorRateLimitStore {
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, Box<dyn std::error::Error + Send + Sync>> {
        let limiter = self.limiter_for(key, config).await;
        let result = self.check(&limiter, config);
        if !result.allowed {
            debug!(key = %key, limit = result.limit, "Rate limit exhausted");
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Duration, GovernorRateLimitStore, RateLimitConfig, RateLimitResult, RateLimitStore,
        unix_millis,
    };

    #[tokio::test]
    async fn test_allows_up_to_limit_then_denies() {
        let store = GovernorRateLimitStore::new();
        let config = RateLimitConfig::new(3, 3600);

        for expected_remaining in [2, 1, 0] {
            let result = store.check_and_increment("app-1", &config).await.unwrap();
            assert!(result.allowed);
            assert_eq!(result.limit, 3);
            assert_eq!(result.remaining, expected_remaining);
        }

        let denied = store.check_and_increment("app-1", &config).await.unwrap();
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert!(denied.reset_at_ms > unix_millis());
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let store = GovernorRateLimitStore::new();
        let config = RateLimitConfig::new(1, 3600);

        assert!(store.check_and_increment("a", &config).await.unwrap().allowed);
        assert!(!store.check_and_increment("a", &config).await.unwrap().allowed);
        assert!(store.check_and_increment("b", &config).await.unwrap().allowed);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_changed_config_resets_bucket() {
        let store = GovernorRateLimitStore::new();
        let strict = RateLimitConfig::new(1, 3600);
        assert!(store.check_and_increment("a", &strict).await.unwrap().allowed);
        assert!(!store.check_and_increment("a", &strict).await.unwrap().allowed);

        let relaxed = RateLimitConfig::new(5, 3600);
        assert!(store.check_and_increment("a", &relaxed).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_purge_idle_drops_refilled_limiters() {
        let store = GovernorRateLimitStore::new();
        let short = RateLimitConfig {
            max_requests: 1,
            window: Duration::from_millis(20),
        };
        let long = RateLimitConfig::new(1, 3600);

        assert!(store.check_and_increment("short", &short).await.unwrap().allowed);
        assert!(store.check_and_increment("long", &long).await.unwrap().allowed);
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(store.purge_idle().await, 1);
        assert_eq!(store.len().await, 1);
        // The surviving limiter keeps its state
        assert!(!store.check_and_increment("long", &long).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_new_keys_trigger_sweep() {
        let store = GovernorRateLimitStore::with_sweep_interval(Duration::ZERO);
        let config = RateLimitConfig {
            max_requests: 1,
            window: Duration::from_millis(20),
        };

        for i in 0..100 {
            store
                .check_and_increment(&format!("ip:10.0.0.{i}"), &config)
                .await
                .unwrap();
        }
        tokio::time::sleep(Duration::from_millis(40)).await;

        store.check_and_increment("ip:10.0.1.1", &config).await.unwrap();
        assert_eq!(store.len().await, 1);
    }

    #[test]
    fn test_reset_after_secs_rounds_up() {
        let result = RateLimitResult {
            allowed: true,
            limit: 10,
            remaining: 9,
            reset_at_ms: 10_001,
        };
        assert_eq!(result.reset_after_secs(9_000), 2);
        assert_eq!(result.reset_after_secs(20_000), 0);
    }
}
