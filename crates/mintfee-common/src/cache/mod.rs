use std::hash::Hash;
use std::ops::Deref;
use std::time::{Duration, Instant};

use moka::sync::Cache;

/// Value paired with the instant after which it must no longer be served.
#[derive(Clone, Debug)]
pub struct Expirable<T> {
    expired_at: Instant,
    value: T,
}

impl<T> Deref for Expirable<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T> Expirable<T> {
    pub fn new(value: T, validity: Duration) -> Self {
        Self {
            expired_at: Instant::now() + validity,
            value,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expired_at
    }

    /// Remaining lifetime, zero once expired.
    pub fn time_to_live(&self) -> Duration {
        self.expired_at.saturating_duration_since(Instant::now())
    }

    pub fn take(self) -> T {
        self.value
    }
}

/// Bounded in-memory cache where every entry carries its own expiry.
///
/// Expired entries are never returned; they are evicted lazily on the next read
/// or when the underlying cache runs out of capacity.
#[derive(Clone)]
pub struct ExpirableCache<K, V> {
    cache: Cache<K, Expirable<V>>,
}

impl<K, V> ExpirableCache<K, V>
where
    K: 'static + Eq + Hash + Send + Sync,
    V: 'static + Clone + Send + Sync,
{
    pub fn new(capacity: u64) -> Self {
        Self { cache: Cache::new(capacity) }
    }

    /// Returns the value if it exists and has not expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let entry = self.cache.get(key)?;
        if entry.is_expired() {
            self.cache.invalidate(key);
            return None;
        }

        Some(entry.take())
    }

    pub fn insert(&self, key: K, value: V, validity: Duration) {
        self.cache.insert(key, Expirable::new(value, validity));
    }

    pub fn remove(&self, key: &K) {
        self.cache.invalidate(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_is_not_expired() {
        let value = Expirable::new(0, Duration::from_secs(5));
        assert!(!value.is_expired(), "Value should not be expired");
        assert!(value.time_to_live() > Duration::ZERO);
    }

    #[test]
    fn value_is_expired_immediately() {
        let value = Expirable::new(0, Duration::ZERO);
        assert!(value.is_expired(), "Value should be expired");
        assert_eq!(value.time_to_live(), Duration::ZERO);
    }

    #[test]
    fn value_becomes_expired_after_validity() {
        let value = Expirable::new(0, Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(3));
        assert!(value.is_expired(), "Value should be expired after validity");
    }

    #[test]
    fn cache_get_returns_value() {
        let cache = ExpirableCache::new(20);
        cache.insert(42, 42, Duration::from_secs(5));
        assert_eq!(cache.get(&42), Some(42));
    }

    #[test]
    fn cache_get_returns_none_if_expired() {
        let cache = ExpirableCache::new(20);
        cache.insert(42, 42, Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(3));
        assert_eq!(cache.get(&42), None);
    }

    #[test]
    fn cache_insert_overrides_previous_value() {
        let cache = ExpirableCache::new(20);
        cache.insert("job", 1, Duration::from_secs(5));
        cache.insert("job", 2, Duration::from_secs(5));
        assert_eq!(cache.get(&"job"), Some(2));
    }

    #[test]
    fn cache_remove_drops_value() {
        let cache = ExpirableCache::new(20);
        cache.insert(42, 42, Duration::from_secs(5));
        cache.remove(&42);
        assert_eq!(cache.get(&42), None);
    }
}
