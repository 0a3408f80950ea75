//! Failure-isolated fetching shared by the geo and weather resolvers.
//!
//! [`ResilientFetcher`] wraps an outbound lookup with a per-service circuit
//! breaker and a per-key TTL cache. Failures are never retried within a
//! request; resilience comes from caching and circuit-breaking across
//! requests. Cache and breaker state are process-local: separate instances
//! (and separate processes) keep independent state.
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, RwLock};

use chrono::Duration;

use crate::{campaigns::Timestamp, Error, Result};

/// Configuration for [`ResilientFetcher`].
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Service name used for logging and [`Error::Unavailable`].
    pub service: &'static str,
    /// How long a cached value stays fresh.
    pub cache_ttl: Duration,
    /// Consecutive failures required to open the circuit.
    ///
    /// Defaults to [`FetcherConfig::DEFAULT_FAILURE_THRESHOLD`].
    pub failure_threshold: u32,
    /// How long an open circuit short-circuits lookups.
    ///
    /// Defaults to [`FetcherConfig::DEFAULT_COOLDOWN_SECS`] seconds.
    pub cooldown: Duration,
    /// Upper bound on one producer invocation. A producer that exceeds it
    /// is treated exactly like a failed one.
    ///
    /// Defaults to [`FetcherConfig::DEFAULT_LOOKUP_TIMEOUT`].
    pub lookup_timeout: std::time::Duration,
}

impl FetcherConfig {
    /// Default value for [`FetcherConfig::failure_threshold`].
    pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
    /// Default value for [`FetcherConfig::cooldown`], in seconds.
    pub const DEFAULT_COOLDOWN_SECS: i64 = 30;
    /// Default value for [`FetcherConfig::lookup_timeout`].
    pub const DEFAULT_LOOKUP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

    /// Create a `FetcherConfig` with the default breaker and timeout
    /// settings.
    pub fn new(service: &'static str, cache_ttl: Duration) -> FetcherConfig {
        FetcherConfig {
            service,
            cache_ttl,
            failure_threshold: FetcherConfig::DEFAULT_FAILURE_THRESHOLD,
            cooldown: Duration::seconds(FetcherConfig::DEFAULT_COOLDOWN_SECS),
            lookup_timeout: FetcherConfig::DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// Update the producer timeout with `timeout`.
    pub fn with_lookup_timeout(mut self, timeout: std::time::Duration) -> FetcherConfig {
        self.lookup_timeout = timeout;
        self
    }
}

struct CacheEntry<T> {
    value: T,
    fetched_at: Timestamp,
}

#[derive(Default)]
struct BreakerState {
    failures: u32,
    open_until: Option<Timestamp>,
}

/// A TTL cache and circuit breaker around an async producer.
///
/// Safe for concurrent use from simultaneous requests: the cache and
/// breaker are the only shared state, and neither lock is held across an
/// await point. Concurrent misses for the same key may invoke the producer
/// more than once; cache writes are last-writer-wins and any stored value
/// is individually valid.
///
/// Stale entries are ignored on read and overwritten on the next
/// successful fetch; nothing evicts them, so the cache grows with the key
/// space. Bounding it (LRU or a periodic sweep) is left to a future
/// revision.
pub struct ResilientFetcher<T> {
    config: FetcherConfig,
    cache: RwLock<HashMap<String, CacheEntry<T>>>,
    breaker: Mutex<BreakerState>,
}

impl<T: Clone> ResilientFetcher<T> {
    /// Create a fetcher with empty cache and a closed circuit.
    pub fn new(config: FetcherConfig) -> ResilientFetcher<T> {
        ResilientFetcher {
            config,
            cache: RwLock::new(HashMap::new()),
            breaker: Mutex::new(BreakerState::default()),
        }
    }

    /// Look up `key`, invoking `producer` at most once on cache miss.
    ///
    /// Returns [`Error::Unavailable`] when the circuit is open or the
    /// producer fails; the producer's own error is logged, not returned.
    pub async fn fetch<F, Fut>(&self, key: &str, now: Timestamp, producer: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if self.breaker_is_open(now) {
            log::trace!(target: "dco", service = self.config.service, key;
                "circuit open, skipping lookup");
            return Err(Error::Unavailable {
                service: self.config.service,
            });
        }

        if let Some(value) = self.cached(key, now) {
            return Ok(value);
        }

        match tokio::time::timeout(self.config.lookup_timeout, producer()).await {
            Ok(Ok(value)) => {
                self.record_success(key, value.clone(), now);
                Ok(value)
            }
            Ok(Err(err)) => {
                self.record_failure(now);
                log::warn!(target: "dco", service = self.config.service, key;
                    "lookup failed: {err}");
                Err(Error::Unavailable {
                    service: self.config.service,
                })
            }
            Err(_elapsed) => {
                self.record_failure(now);
                log::warn!(target: "dco", service = self.config.service, key;
                    "lookup timed out after {:?}", self.config.lookup_timeout);
                Err(Error::Unavailable {
                    service: self.config.service,
                })
            }
        }
    }

    /// Whether the circuit currently short-circuits lookups. Once the
    /// cooldown elapses the failure count resets and a single trial call is
    /// admitted; there is no distinct half-open state.
    fn breaker_is_open(&self, now: Timestamp) -> bool {
        let mut breaker = self
            .breaker
            .lock()
            .expect("thread holding breaker lock should not panic");
        if breaker.failures >= self.config.failure_threshold {
            if breaker.open_until.is_some_and(|t| now < t) {
                return true;
            }
            breaker.failures = 0;
            breaker.open_until = None;
        }
        false
    }

    fn cached(&self, key: &str, now: Timestamp) -> Option<T> {
        let cache = self
            .cache
            .read()
            .expect("thread holding cache lock should not panic");
        let entry = cache.get(key)?;
        if now - entry.fetched_at < self.config.cache_ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    fn record_success(&self, key: &str, value: T, now: Timestamp) {
        {
            let mut cache = self
                .cache
                .write()
                .expect("thread holding cache lock should not panic");
            cache.insert(
                key.to_owned(),
                CacheEntry {
                    value,
                    fetched_at: now,
                },
            );
        }
        let mut breaker = self
            .breaker
            .lock()
            .expect("thread holding breaker lock should not panic");
        breaker.failures = 0;
        breaker.open_until = None;
    }

    fn record_failure(&self, now: Timestamp) {
        let mut breaker = self
            .breaker
            .lock()
            .expect("thread holding breaker lock should not panic");
        breaker.failures += 1;
        if breaker.failures >= self.config.failure_threshold {
            breaker.open_until = Some(now + self.config.cooldown);
        }
    }
}
