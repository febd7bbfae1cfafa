//! 日界缓存：键内含日历日，跨日自然失效
//!
//! 键形如 namespace_identity_YYYY-MM-DD，无显式 TTL 与淘汰；前一日的键
//! 留作孤儿条目（简单设计的已接受代价）。损坏的条目读取时丢弃。

use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::store::Store;

/// 日界缓存：序列化记录存入 Store
pub struct ResponseCache {
    store: Arc<dyn Store>,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// 组合日界缓存键：namespace + identity + 日历日
    pub fn day_key(namespace: &str, identity: &str, day: NaiveDate) -> String {
        format!("{}_{}_{}", namespace, identity, day.format("%Y-%m-%d"))
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => {
                tracing::debug!(key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding malformed cache entry");
                self.store.remove(key);
                None
            }
        }
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.store.set(key, &raw),
            Err(e) => tracing::warn!(key, error = %e, "Failed to serialize cache entry"),
        }
    }

    /// 读穿缓存：force_refresh 跳过读取但仍把新结果写回（覆盖当日条目）；
    /// fetcher 失败时不写缓存，错误原样返回。
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &str,
        force_refresh: bool,
        fetcher: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !force_refresh {
            if let Some(value) = self.get(key) {
                return Ok(value);
            }
        }
        let fresh = fetcher().await?;
        self.put(key, &fresh);
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Entry {
        value: u32,
    }

    fn cache() -> (Arc<MemoryStore>, ResponseCache) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), ResponseCache::new(store))
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_day_key_incorporates_calendar_day() {
        assert_eq!(
            ResponseCache::day_key("aura_horoscope_v9", "Leo", day(1)),
            "aura_horoscope_v9_Leo_2024-06-01"
        );
        assert_ne!(
            ResponseCache::day_key("aura_horoscope_v9", "Leo", day(1)),
            ResponseCache::day_key("aura_horoscope_v9", "Leo", day(2))
        );
    }

    #[test]
    fn test_malformed_entry_is_discarded() {
        let (store, cache) = cache();
        store.set("k", "{not json");
        assert!(cache.get::<Entry>("k").is_none());
        assert!(store.get("k").is_none());
    }

    #[tokio::test]
    async fn test_get_or_fetch_prefers_cached_value() {
        let (_, cache) = cache();
        cache.put("k", &Entry { value: 1 });

        let result: Result<Entry, ()> = cache
            .get_or_fetch("k", false, || async { panic!("fetcher must not run") })
            .await;
        assert_eq!(result.unwrap(), Entry { value: 1 });
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_read_but_writes_back() {
        let (_, cache) = cache();
        cache.put("k", &Entry { value: 1 });

        let result: Result<Entry, ()> = cache
            .get_or_fetch("k", true, || async { Ok(Entry { value: 2 }) })
            .await;
        assert_eq!(result.unwrap(), Entry { value: 2 });
        assert_eq!(cache.get::<Entry>("k"), Some(Entry { value: 2 }));
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_cache_untouched() {
        let (store, cache) = cache();
        let result: Result<Entry, &str> = cache
            .get_or_fetch("k", false, || async { Err("boom") })
            .await;
        assert!(result.is_err());
        assert!(store.get("k").is_none());
    }
}
