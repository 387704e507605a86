use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Keyed value store with insertion timestamps and caller-supplied TTL.
///
/// `get_or_fetch` is the single entry point for populate-on-miss usage;
/// async callers that cannot hand over a closure use `get`/`insert`
/// directly. Expired entries are evicted lazily on access.
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, (V, Instant)>>,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &K, ttl: Duration) -> Option<V> {
        self.get_at(key, ttl, Instant::now())
    }

    /// Lookup against an explicit clock, so expiry is testable without sleeping
    pub fn get_at(&self, key: &K, ttl: Duration, now: Instant) -> Option<V> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(key) {
            Some((value, inserted_at)) if now.duration_since(*inserted_at) < ttl => {
                Some(value.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn insert_at(&self, key: K, value: V, inserted_at: Instant) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(key, (value, inserted_at));
    }

    /// Return the cached value when fresh, otherwise run `fetcher` and cache
    /// its result. Fetch errors are propagated and nothing is cached.
    pub fn get_or_fetch<E>(
        &self,
        key: &K,
        ttl: Duration,
        fetcher: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.get(key, ttl) {
            return Ok(value);
        }
        let value = fetcher()?;
        self.insert(key.clone(), value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for TtlCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entry_is_returned() {
        let cache: TtlCache<String, i32> = TtlCache::new();
        cache.insert("k".to_string(), 42);
        assert_eq!(cache.get(&"k".to_string(), Duration::from_secs(60)), Some(42));
    }

    #[test]
    fn expired_entry_is_evicted() {
        let cache: TtlCache<String, i32> = TtlCache::new();
        let then = Instant::now();
        cache.insert_at("k".to_string(), 42, then);

        let later = then + Duration::from_secs(120);
        assert_eq!(cache.get_at(&"k".to_string(), Duration::from_secs(60), later), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn get_or_fetch_populates_on_miss() {
        let cache: TtlCache<String, i32> = TtlCache::new();
        let mut calls = 0;

        let v = cache
            .get_or_fetch(&"k".to_string(), Duration::from_secs(60), || {
                calls += 1;
                Ok::<_, ()>(7)
            })
            .unwrap();
        assert_eq!(v, 7);

        let v = cache
            .get_or_fetch(&"k".to_string(), Duration::from_secs(60), || {
                calls += 1;
                Ok::<_, ()>(99)
            })
            .unwrap();
        assert_eq!(v, 7);
        assert_eq!(calls, 1);
    }

    #[test]
    fn fetch_error_is_not_cached() {
        let cache: TtlCache<String, i32> = TtlCache::new();
        let err: Result<i32, &str> =
            cache.get_or_fetch(&"k".to_string(), Duration::from_secs(60), || Err("boom"));
        assert!(err.is_err());
        assert!(cache.is_empty());
    }
}
