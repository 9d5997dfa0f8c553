//! TTL caches in front of the upstream APIs

use crate::config::StockConfig;
use crate::model::{Item, Quote, Section, Sentiment};
use cached::{Cached, TimedCache};
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Thread-safe cache whose entries expire after a fixed lifespan
pub struct TtlCache<K, V> {
    cache: Arc<Mutex<TimedCache<K, V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Clone + std::fmt::Debug,
    V: Clone,
{
    /// Create a new cache with specified TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(Mutex::new(TimedCache::with_lifespan(ttl))),
        }
    }

    /// Get a value from the cache
    pub async fn get(&self, key: &K) -> Option<V> {
        let mut cache = self.cache.lock().await;
        cache.cache_get(key).cloned()
    }

    /// Insert a value into the cache
    pub async fn insert(&self, key: K, value: V) {
        let mut cache = self.cache.lock().await;
        let _ = cache.cache_set(key, value);
    }

    /// Return the cached value or fetch, store and return a fresh one
    ///
    /// Failures are not cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: K, fetcher: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key).await {
            tracing::debug!(?key, "Cache hit");
            return Ok(value);
        }

        tracing::debug!(?key, "Cache miss");
        let value = fetcher().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }

    /// Get the number of cached entries
    pub async fn len(&self) -> usize {
        let cache = self.cache.lock().await;
        cache.cache_size()
    }

    /// Check if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

/// Caches used by the live provider, keyed by symbol or query
pub struct CacheManager {
    /// Quotes, short TTL
    pub quotes: TtlCache<String, Quote>,
    /// Search hits, short TTL
    pub searches: TtlCache<String, Vec<Item>>,
    /// Company overview sections, long TTL
    pub company: TtlCache<String, Section>,
    /// Company news sections, medium TTL
    pub news: TtlCache<String, Section>,
    /// News sentiment, medium TTL
    pub sentiment: TtlCache<String, Vec<Sentiment>>,
    /// Logo bytes, `None` when the company has none, long TTL
    pub logos: TtlCache<String, Option<Vec<u8>>>,
}

impl CacheManager {
    /// Create a cache manager with the configured TTLs
    pub fn from_config(config: &StockConfig) -> Self {
        Self {
            quotes: TtlCache::new(config.cache_ttl_realtime),
            searches: TtlCache::new(config.cache_ttl_realtime),
            company: TtlCache::new(config.cache_ttl_fundamental),
            news: TtlCache::new(config.cache_ttl_news),
            sentiment: TtlCache::new(config.cache_ttl_news),
            logos: TtlCache::new(config.cache_ttl_fundamental),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Symbol;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_cache_insert_and_get() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("AAPL".to_string(), 150).await;

        assert_eq!(cache.get(&"AAPL".to_string()).await, Some(150));
        assert_eq!(cache.get(&"TSLA".to_string()).await, None);
    }

    #[tokio::test]
    async fn test_cache_get_or_fetch() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60));
        let mut call_count = 0;

        let value = cache
            .get_or_fetch("AAPL".to_string(), || {
                call_count += 1;
                async { Ok::<_, String>(150) }
            })
            .await
            .unwrap();
        assert_eq!(value, 150);

        let value = cache
            .get_or_fetch("AAPL".to_string(), || {
                call_count += 1;
                async { Ok::<_, String>(999) }
            })
            .await
            .unwrap();
        assert_eq!(value, 150);
        assert_eq!(call_count, 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60));

        let first = cache
            .get_or_fetch("AAPL".to_string(), || async { Err::<u32, _>("rate limited") })
            .await;
        assert!(first.is_err());
        assert!(cache.is_empty().await);

        let second = cache
            .get_or_fetch("AAPL".to_string(), || async { Ok::<_, &str>(7) })
            .await;
        assert_eq!(second, Ok(7));
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_millis(20));
        cache.insert("AAPL".to_string(), 150).await;
        assert_eq!(cache.get(&"AAPL".to_string()).await, Some(150));

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get(&"AAPL".to_string()).await, None);
    }

    #[tokio::test]
    async fn test_cache_manager() {
        let manager = CacheManager::from_config(&StockConfig::default());
        let quote = Quote {
            price: Decimal::new(15_000, 2),
            change: Decimal::ZERO,
            percent_change: Decimal::ZERO,
        };

        manager.quotes.insert("AAPL".to_string(), quote).await;
        manager
            .searches
            .insert("app".to_string(), vec![Item::new(Symbol::new("AAPL").unwrap())])
            .await;
        assert_eq!(manager.quotes.len().await, 1);
        assert_eq!(manager.searches.len().await, 1);
        assert!(manager.company.is_empty().await);
    }

    #[tokio::test]
    async fn test_logo_lookups_are_cached_including_misses() {
        let manager = CacheManager::from_config(&StockConfig::default());
        let mut downloads = 0;

        for _ in 0..3 {
            let logo = manager
                .logos
                .get_or_fetch("AAPL".to_string(), || {
                    downloads += 1;
                    async { Ok::<_, String>(Some(vec![0x89, 0x50, 0x4e, 0x47])) }
                })
                .await
                .unwrap();
            assert_eq!(logo.map(|bytes| bytes.len()), Some(4));
        }

        let missing = manager
            .logos
            .get_or_fetch("BRK.A".to_string(), || {
                downloads += 1;
                async { Ok::<_, String>(None) }
            })
            .await
            .unwrap();
        assert!(missing.is_none());
        assert_eq!(manager.logos.get(&"BRK.A".to_string()).await, Some(None));

        assert_eq!(downloads, 2);
    }
}
