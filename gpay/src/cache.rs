//! Local query cache for account billing data.
//!
//! Cached responses are stored under hierarchical query keys such as
//! `["account", "billing", "payments"]`. Settlement marks data stale through
//! [`CacheInvalidator`] using one of the logical [`CacheKey`]s, which removes
//! every entry under that prefix.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Logical cache keys invalidated after settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Payment history of the account.
    BillingPayments,
    /// Every stored payment method of the account.
    PaymentMethodsAll,
}

impl CacheKey {
    /// Stable identifier, e.g. `"billing-payments"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BillingPayments => "billing-payments",
            Self::PaymentMethodsAll => "payment-methods-all",
        }
    }

    /// Query key prefix covered by this key.
    #[must_use]
    pub const fn segments(self) -> &'static [&'static str] {
        match self {
            Self::BillingPayments => &["account", "billing", "payments"],
            Self::PaymentMethodsAll => &["account", "payment-methods", "all"],
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marks cached data as stale.
pub trait CacheInvalidator: Send + Sync {
    /// Invalidates every cached entry covered by `key`.
    fn invalidate(&self, key: CacheKey);
}

impl<T: CacheInvalidator + ?Sized> CacheInvalidator for Arc<T> {
    fn invalidate(&self, key: CacheKey) {
        (**self).invalidate(key);
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    expires_at: Instant,
}

/// In-memory TTL cache of JSON-serializable query results.
#[derive(Debug)]
pub struct QueryCache {
    ttl: Duration,
    entries: DashMap<Vec<String>, CacheEntry>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}

fn owned_key(key: &[&str]) -> Vec<String> {
    key.iter().map(|s| (*s).to_owned()).collect()
}

impl QueryCache {
    /// Default time-to-live of a cached entry (5 minutes).
    pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

    /// Creates a cache whose entries live for `ttl`. A zero TTL disables caching.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Returns the cached value under `key` if present and fresh.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &[&str]) -> Option<T> {
        let value = {
            let entry = self.entries.get(&owned_key(key))?;
            if Instant::now() >= entry.expires_at {
                None
            } else {
                Some(entry.value.clone())
            }
        };
        match value {
            Some(value) => serde_json::from_value(value).ok(),
            None => {
                self.entries.remove(&owned_key(key));
                None
            }
        }
    }

    /// Stores `value` under `key`.
    pub fn set<T: Serialize>(&self, key: &[&str], value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.entries.insert(
                    owned_key(key),
                    CacheEntry {
                        value,
                        expires_at: Instant::now() + self.ttl,
                    },
                );
            }
            Err(err) => {
                tracing::debug!(
                    key = ?key,
                    error = %err,
                    "Skipping cache write for unserializable value"
                );
            }
        }
    }

    /// Returns the cached value under `key`, or runs `fetch` and caches its
    /// successful result.
    ///
    /// # Errors
    ///
    /// Propagates the error of `fetch`; failures are not cached.
    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: &[&str], fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }
        tracing::debug!(key = ?key, "Query cache miss");
        let value = fetch().await?;
        self.set(key, &value);
        Ok(value)
    }

    /// Removes every entry whose key starts with `prefix`. Returns how many
    /// entries were removed.
    pub fn invalidate_prefix(&self, prefix: &[&str]) -> usize {
        let mut removed = 0;
        self.entries.retain(|key, _| {
            let covered =
                key.len() >= prefix.len() && key.iter().zip(prefix).all(|(a, b)| a == b);
            if covered {
                removed += 1;
            }
            !covered
        });
        removed
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, including stale ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheInvalidator for QueryCache {
    fn invalidate(&self, key: CacheKey) {
        let removed = self.invalidate_prefix(key.segments());
        tracing::debug!(key = %key, removed, "Invalidated cached queries");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYMENTS: &[&str] = &["account", "billing", "payments"];

    #[test]
    fn invalidation_removes_prefixed_entries_only() {
        let cache = QueryCache::default();
        cache.set(&["account", "billing", "payments", "page-1"], &1);
        cache.set(&["account", "billing", "payments", "page-2"], &2);
        cache.set(&["account", "payment-methods", "all"], &3);

        cache.invalidate(CacheKey::BillingPayments);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get::<i32>(&["account", "payment-methods", "all"]), Some(3));
    }

    #[test]
    fn invalidate_prefix_counts_removed_entries() {
        let cache = QueryCache::default();
        cache.set(&["account", "billing", "payments", "page-1"], &1);
        cache.set(&["account", "billing", "payments", "page-2"], &2);
        cache.set(&["account", "payment-methods", "all"], &3);

        assert_eq!(cache.invalidate_prefix(PAYMENTS), 2);
        assert_eq!(cache.invalidate_prefix(PAYMENTS), 0);
    }

    #[test]
    fn invalidation_tolerates_concurrent_writes() {
        let cache = QueryCache::default();
        std::thread::scope(|scope| {
            for writer in 0..6 {
                let cache = &cache;
                scope.spawn(move || {
                    for page in 0..500 {
                        let page = format!("{writer}-{page}");
                        cache.set(&["account", "billing", "payments", page.as_str()], &page);
                    }
                });
            }
            scope.spawn(|| {
                for _ in 0..500 {
                    let removed = cache.invalidate_prefix(PAYMENTS);
                    assert!(removed <= 6 * 500);
                }
            });
        });

        cache.invalidate(CacheKey::BillingPayments);
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_ttl_disables_caching() {
        let cache = QueryCache::new(Duration::ZERO);
        cache.set(PAYMENTS, &"value");
        assert_eq!(cache.get::<String>(PAYMENTS), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn get_or_fetch_only_fetches_on_miss() {
        let cache = QueryCache::default();
        let mut calls = 0;
        let first: Result<u32, ()> = cache
            .get_or_fetch(PAYMENTS, || {
                calls += 1;
                async { Ok(42) }
            })
            .await;
        let second: Result<u32, ()> = cache
            .get_or_fetch(PAYMENTS, || {
                calls += 1;
                async { Ok(0) }
            })
            .await;
        assert_eq!(first, Ok(42));
        assert_eq!(second, Ok(42));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn failed_fetch_is_not_cached() {
        let cache = QueryCache::default();
        let failed: Result<u32, &str> = cache
            .get_or_fetch(PAYMENTS, || async { Err("down") })
            .await;
        assert_eq!(failed, Err("down"));
        assert!(cache.is_empty());
    }

    #[test]
    fn cache_keys_have_stable_names() {
        assert_eq!(CacheKey::BillingPayments.to_string(), "billing-payments");
        assert_eq!(CacheKey::PaymentMethodsAll.to_string(), "payment-methods-all");
    }
}
