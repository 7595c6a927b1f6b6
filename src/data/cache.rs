//! Staleness-aware metrics cache
//!
//! Keyed by `(symbol, fetch-configuration fingerprint)` so differently
//! configured fetches never collide. Each entry carries its own fresh and
//! stale TTLs; a read classifies the entry as fresh, stale, or expired, and
//! an expired entry is evicted lazily on the read that finds it.
//!
//! The cache is a value store: `put` overwrites wholesale, reads hand back
//! clones, and nothing outside ever holds a reference into the map. Time is
//! injected through the `Clock` trait so tests drive staleness without
//! touching the system clock.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::core::MetricsResult;

/// Injectable time source
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time source used in production
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Cache key: symbol plus the fetch-configuration fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub max_days: u32,
    pub expiry_count: u32,
}

impl CacheKey {
    pub fn new(symbol: impl Into<String>, max_days: u32, expiry_count: u32) -> Self {
        Self {
            symbol: symbol.into(),
            max_days,
            expiry_count,
        }
    }
}

/// Classification of a cache entry at read time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Absent,
    Fresh,
    Stale,
    Expired,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: MetricsResult,
    timestamp: DateTime<Utc>,
    fresh_ttl: Duration,
    stale_ttl: Duration,
}

impl CacheEntry {
    fn state(&self, now: DateTime<Utc>) -> CacheState {
        let age = now - self.timestamp;
        if age <= self.fresh_ttl {
            CacheState::Fresh
        } else if age <= self.stale_ttl {
            CacheState::Stale
        } else {
            CacheState::Expired
        }
    }
}

/// In-memory staleness-aware store for computed metrics
pub struct MetricsCache {
    entries: DashMap<CacheKey, CacheEntry>,
    clock: Arc<dyn Clock>,
}

impl MetricsCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Store a result, overwriting any previous entry for the key.
    pub fn put(
        &self,
        key: CacheKey,
        value: MetricsResult,
        fresh_ttl_secs: i64,
        stale_ttl_secs: i64,
    ) {
        let timestamp = self.clock.now();
        tracing::debug!(symbol = %key.symbol, fresh_ttl_secs, stale_ttl_secs, "cache put");
        self.entries.insert(
            key,
            CacheEntry {
                value,
                timestamp,
                fresh_ttl: Duration::seconds(fresh_ttl_secs),
                stale_ttl: Duration::seconds(stale_ttl_secs),
            },
        );
    }

    /// Return the value only while within the fresh TTL.
    pub fn get_fresh(&self, key: &CacheKey) -> Option<MetricsResult> {
        self.inspect(key, |entry, state, _| {
            (state == CacheState::Fresh).then(|| entry.value.clone())
        })
    }

    /// Return the value while within the stale TTL (fresh or stale state).
    /// An expired entry is evicted and misses.
    pub fn get_stale(&self, key: &CacheKey) -> Option<MetricsResult> {
        self.inspect(key, |entry, state, _| {
            matches!(state, CacheState::Fresh | CacheState::Stale).then(|| entry.value.clone())
        })
    }

    /// Age of the entry in whole seconds, if present (expired entries evict).
    pub fn age_seconds(&self, key: &CacheKey) -> Option<i64> {
        self.inspect(key, |entry, state, now| {
            matches!(state, CacheState::Fresh | CacheState::Stale)
                .then(|| (now - entry.timestamp).num_seconds())
        })
    }

    /// Current state of the entry without mutation beyond lazy eviction.
    pub fn state(&self, key: &CacheKey) -> CacheState {
        self.inspect(key, |_, state, _| Some(state))
            .unwrap_or(CacheState::Absent)
    }

    /// Number of live entries (expired ones may linger until read).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Single-lookup read: classify the entry, hand it to `read`, then lazily
    /// evict when it was expired. The eviction re-checks the state so a fresh
    /// entry written concurrently by another `put` is never removed.
    fn inspect<T>(
        &self,
        key: &CacheKey,
        read: impl FnOnce(&CacheEntry, CacheState, DateTime<Utc>) -> Option<T>,
    ) -> Option<T> {
        let now = self.clock.now();
        let (state, out) = match self.entries.get(key) {
            None => return None,
            Some(entry) => {
                let state = entry.state(now);
                (state, read(entry.value(), state, now))
            }
        };
        if state == CacheState::Expired {
            // Past the stale TTL: treated identically to absent
            self.entries
                .remove_if(key, |_, entry| entry.state(now) == CacheState::Expired);
            tracing::debug!(symbol = %key.symbol, "evicted expired cache entry");
        }
        out
    }
}

impl Default for MetricsCache {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[cfg(test)]
pub(crate) mod test_clock {
    use super::*;
    use std::sync::Mutex;

    /// Manually advanced clock for staleness tests
    pub struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        pub fn new(start: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(start),
            }
        }

        pub fn advance_secs(&self, secs: i64) {
            let mut now = self.now.lock().unwrap();
            *now += Duration::seconds(secs);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_clock::ManualClock;
    use super::*;
    use chrono::TimeZone;

    fn setup() -> (Arc<ManualClock>, MetricsCache, CacheKey) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 13, 12, 0, 0).unwrap(),
        ));
        let cache = MetricsCache::new(clock.clone());
        let key = CacheKey::new("SPY", 30, 2);
        (clock, cache, key)
    }

    fn result(clock: &ManualClock) -> MetricsResult {
        MetricsResult::empty("SPY", clock.now())
    }

    #[test]
    fn test_fresh_then_stale_then_evicted() {
        let (clock, cache, key) = setup();
        cache.put(key.clone(), result(&clock), 1, 10);

        // Immediately fresh
        assert_eq!(cache.state(&key), CacheState::Fresh);
        assert!(cache.get_fresh(&key).is_some());

        // Past the fresh window: stale serves, fresh misses
        clock.advance_secs(2);
        assert!(cache.get_fresh(&key).is_none());
        assert!(cache.get_stale(&key).is_some());
        assert_eq!(cache.age_seconds(&key), Some(2));

        // Past the stale window: the read evicts
        clock.advance_secs(9);
        assert!(cache.get_stale(&key).is_none());
        assert_eq!(cache.len(), 0);
        // And the entry stays gone
        assert!(cache.get_stale(&key).is_none());
        assert_eq!(cache.state(&key), CacheState::Absent);
    }

    #[test]
    fn test_put_overwrites_wholesale() {
        let (clock, cache, key) = setup();
        cache.put(key.clone(), result(&clock), 1, 10);

        clock.advance_secs(5);
        // Second put resets the entry timestamp entirely
        cache.put(key.clone(), result(&clock), 1, 10);
        assert_eq!(cache.state(&key), CacheState::Fresh);
        assert_eq!(cache.age_seconds(&key), Some(0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_read_never_evicts_a_replacing_put() {
        let (clock, cache, key) = setup();
        cache.put(key.clone(), result(&clock), 1, 10);

        // Entry ages past the stale TTL, then a new put lands on the same key
        clock.advance_secs(11);
        cache.put(key.clone(), result(&clock), 1, 10);

        // Reads classify the replacement, and eviction leaves it alone
        assert!(cache.get_fresh(&key).is_some());
        assert_eq!(cache.state(&key), CacheState::Fresh);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_keys_with_different_config_do_not_collide() {
        let (clock, cache, key) = setup();
        let other = CacheKey::new("SPY", 60, 3);

        cache.put(key.clone(), result(&clock), 60, 600);
        assert!(cache.get_fresh(&key).is_some());
        assert!(cache.get_fresh(&other).is_none());
        assert_eq!(cache.state(&other), CacheState::Absent);
    }

    #[test]
    fn test_absent_key() {
        let (_, cache, key) = setup();
        assert!(cache.get_fresh(&key).is_none());
        assert!(cache.get_stale(&key).is_none());
        assert!(cache.age_seconds(&key).is_none());
    }
}
