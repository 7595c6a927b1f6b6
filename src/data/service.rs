//! Fetch orchestration: the stale-while-revalidate read path
//!
//! `ChainService` is the one place that wires source, normalizer, engine, and
//! cache together. Its read policy, in order: serve fresh cache; else fetch,
//! compute, cache, and serve fresh; else serve stale cache; else serve the
//! explicit all-unavailable result. A fetch failure is logged and swallowed,
//! never propagated to the caller.
//!
//! The cache provides no fetch de-duplication: two callers missing the fresh
//! window concurrently will both fetch and both put, and the last write wins
//! over semantically equivalent data. That is an accepted inefficiency, not
//! a correctness bug.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{ChainResult, MetricsResult};
use crate::engine::MetricsEngine;

use super::cache::{CacheKey, Clock, MetricsCache, SystemClock};
use super::history::DataFreshness;
use super::normalize::{normalize_snapshot, RawChainDocument};

/// Upstream fetch parameters (the cache-key fingerprint)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Expiry horizon in days
    pub max_days: u32,
    /// Number of nearest expiries to request (provider caps at 3)
    pub expiry_count: u32,
}

impl FetchConfig {
    pub const MAX_EXPIRIES: u32 = 3;

    pub fn new(max_days: u32, expiry_count: u32) -> Self {
        Self {
            max_days,
            expiry_count: expiry_count.min(Self::MAX_EXPIRIES),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_days: 30,
            expiry_count: 2,
        }
    }
}

/// Upstream chain provider boundary
///
/// Implementations fetch one raw chain document per call; retry and timeout
/// mechanics live behind this trait, invisible to the service.
pub trait SnapshotSource {
    fn fetch_chain(&self, symbol: &str, config: &FetchConfig) -> ChainResult<RawChainDocument>;
}

/// A metrics read plus which arm of the read policy served it
#[derive(Debug, Clone)]
pub struct MetricsOutcome {
    pub result: MetricsResult,
    pub freshness: DataFreshness,
}

/// Cache TTLs for the service read path
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CachePolicy {
    pub fresh_ttl_secs: i64,
    pub stale_ttl_secs: i64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            fresh_ttl_secs: 120,
            stale_ttl_secs: 1800,
        }
    }
}

/// Orchestrates fetch, normalization, metric computation, and caching
pub struct ChainService<S: SnapshotSource> {
    source: S,
    cache: Arc<MetricsCache>,
    engine: MetricsEngine,
    clock: Arc<dyn Clock>,
    fetch_config: FetchConfig,
    cache_policy: CachePolicy,
}

impl<S: SnapshotSource> ChainService<S> {
    pub fn new(source: S, cache: Arc<MetricsCache>) -> Self {
        Self {
            source,
            cache,
            engine: MetricsEngine::new(),
            clock: Arc::new(SystemClock),
            fetch_config: FetchConfig::default(),
            cache_policy: CachePolicy::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_engine(mut self, engine: MetricsEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_fetch_config(mut self, config: FetchConfig) -> Self {
        self.fetch_config = config;
        self
    }

    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    /// The stale-while-revalidate read. Never returns an error: the worst
    /// observable outcome is an all-unavailable result.
    pub fn metrics_for(&self, symbol: &str) -> MetricsOutcome {
        let key = self.cache_key(symbol);

        if let Some(result) = self.cache.get_fresh(&key) {
            tracing::debug!(symbol, "serving fresh cached metrics");
            return MetricsOutcome {
                result,
                freshness: DataFreshness::Fresh,
            };
        }

        match self.fetch_and_compute(symbol) {
            Ok(result) => {
                self.cache.put(
                    key,
                    result.clone(),
                    self.cache_policy.fresh_ttl_secs,
                    self.cache_policy.stale_ttl_secs,
                );
                MetricsOutcome {
                    result,
                    freshness: DataFreshness::Fresh,
                }
            }
            Err(e) => {
                tracing::warn!(symbol, error = %e, "chain fetch failed; falling back to stale cache");
                if let Some(result) = self.cache.get_stale(&key) {
                    return MetricsOutcome {
                        result,
                        freshness: DataFreshness::Stale,
                    };
                }
                MetricsOutcome {
                    result: MetricsResult::empty(symbol, self.clock.now()),
                    freshness: DataFreshness::Unavailable,
                }
            }
        }
    }

    /// Age in seconds of whatever entry backs `symbol`, if any.
    pub fn cache_age_seconds(&self, symbol: &str) -> Option<i64> {
        self.cache.age_seconds(&self.cache_key(symbol))
    }

    fn cache_key(&self, symbol: &str) -> CacheKey {
        CacheKey::new(
            symbol,
            self.fetch_config.max_days,
            self.fetch_config.expiry_count,
        )
    }

    fn fetch_and_compute(&self, symbol: &str) -> ChainResult<MetricsResult> {
        let doc = self.source.fetch_chain(symbol, &self.fetch_config)?;
        let now = self.clock.now();
        let snapshot = normalize_snapshot(&doc, self.fetch_config.max_days as f64, now);

        // A spot-less document is an upstream failure wearing a 200 status.
        if snapshot.spot.is_none() {
            return Err(crate::core::ChainError::data(
                "provider returned no spot price",
            ));
        }

        tracing::info!(symbol, rows = snapshot.rows.len(), "computed fresh metrics");
        Ok(self
            .engine
            .compute(symbol, &snapshot.rows, snapshot.spot, now))
    }
}
