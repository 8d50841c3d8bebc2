//! In-memory response cache with per-entry TTL.
//!
//! Entries expire lazily: an expired entry is dropped when a lookup finds it,
//! never by a background sweep. When the cache is full the oldest inserted
//! entry is evicted, regardless of how recently it was read.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

/// One cached value.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: String,
    /// Entity the snapshot describes, matched exactly by `invalidate_entity`.
    pub entity: Option<String>,
    pub value: V,
    pub inserted_at: Instant,
    pub ttl: Duration,
    seq: u64,
}

impl<V> CacheEntry<V> {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) >= self.ttl
    }
}

#[derive(Debug)]
struct Inner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// Insertion order as `(key, seq)`. Pairs whose seq no longer matches the
    /// live entry are stale and skipped during eviction.
    order: VecDeque<(String, u64)>,
    next_seq: u64,
}

/// Thread-safe TTL cache with insertion-order eviction.
#[derive(Debug)]
pub struct ResponseCache<V> {
    inner: Mutex<Inner<V>>,
    max_entries: usize,
}

impl<V: Clone> ResponseCache<V> {
    /// Create a cache holding at most `max_entries` values. 0 disables caching.
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                next_seq: 0,
            }),
            max_entries,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_entries > 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Value for `key` if present and not expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut inner = self.lock();
        let expired = match inner.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            debug!(key = key, "Cache entry expired");
            inner.entries.remove(key);
        }
        None
    }

    /// Insert or replace `key`. The last writer wins.
    pub fn put(&self, key: &str, value: V, ttl: Duration) {
        self.insert(key, None, value, ttl);
    }

    /// Insert or replace `key` as a snapshot of `entity_id`.
    pub fn put_entity(&self, key: &str, entity_id: &str, value: V, ttl: Duration) {
        self.insert(key, Some(entity_id), value, ttl);
    }

    fn insert(&self, key: &str, entity: Option<&str>, value: V, ttl: Duration) {
        if self.max_entries == 0 || ttl.is_zero() {
            return;
        }
        let mut inner = self.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;

        let replacing = inner.entries.contains_key(key);
        if !replacing {
            while inner.entries.len() >= self.max_entries {
                if !Self::evict_oldest(&mut inner) {
                    break;
                }
            }
        }

        inner.entries.insert(
            key.to_string(),
            CacheEntry {
                key: key.to_string(),
                entity: entity.map(str::to_string),
                value,
                inserted_at: Instant::now(),
                ttl,
                seq,
            },
        );
        inner.order.push_back((key.to_string(), seq));

        if inner.order.len() > self.max_entries.saturating_mul(2) {
            Self::compact(&mut inner);
        }
    }

    fn evict_oldest(inner: &mut Inner<V>) -> bool {
        while let Some((key, seq)) = inner.order.pop_front() {
            let live = inner.entries.get(&key).is_some_and(|e| e.seq == seq);
            if live {
                debug!(key = %key, "Evicting oldest cache entry");
                inner.entries.remove(&key);
                return true;
            }
        }
        false
    }

    fn compact(inner: &mut Inner<V>) {
        let Inner { entries, order, .. } = inner;
        order.retain(|(key, seq)| entries.get(key).is_some_and(|e| e.seq == *seq));
    }

    /// Remove `key`. Returns whether it was present.
    pub fn invalidate(&self, key: &str) -> bool {
        self.lock().entries.remove(key).is_some()
    }

    /// Remove every entry stored for exactly `entity_id`.
    pub fn invalidate_entity(&self, entity_id: &str) -> usize {
        if entity_id.is_empty() {
            return 0;
        }
        self.remove_where(|entry| entry.entity.as_deref() == Some(entity_id))
    }

    /// Remove every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        self.remove_where(|entry| entry.key.starts_with(prefix))
    }

    fn remove_where(&self, matches: impl Fn(&CacheEntry<V>) -> bool) -> usize {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !matches(entry));
        before - inner.entries.len()
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Number of stored entries, including expired ones not yet looked up.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_put_then_get() {
        let cache = ResponseCache::new(10);
        cache.put("schema:invoice", 1, MINUTE);
        assert_eq!(cache.get("schema:invoice"), Some(1));
        assert_eq!(cache.get("schema:contract"), None);
    }

    #[test]
    fn test_expired_entry_absent_and_removed() {
        let cache = ResponseCache::new(10);
        cache.put("k", "v", Duration::from_millis(30));
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_eviction_is_insertion_order_not_recency() {
        let cache = ResponseCache::new(2);
        cache.put("a", 1, MINUTE);
        cache.put("b", 2, MINUTE);
        // Reading "a" does not protect it.
        assert_eq!(cache.get("a"), Some(1));
        cache.put("c", 3, MINUTE);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_overwrite_is_last_writer_wins_and_reorders() {
        let cache = ResponseCache::new(2);
        cache.put("a", 1, MINUTE);
        cache.put("b", 2, MINUTE);
        cache.put("a", 10, MINUTE);
        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.len(), 2);
        // "b" is now the oldest live insertion.
        cache.put("c", 3, MINUTE);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(10));
    }

    #[test]
    fn test_repeated_overwrites_stay_bounded() {
        let cache = ResponseCache::new(3);
        for i in 0..100 {
            cache.put("hot", i, MINUTE);
        }
        assert_eq!(cache.len(), 1);
        assert!(cache.lock().order.len() <= 6);
        assert_eq!(cache.get("hot"), Some(99));
    }

    #[test]
    fn test_invalidate_entity_matches_exact_id() {
        let cache = ResponseCache::new(10);
        cache.put_entity("document:DOC-1", "DOC-1", 1, MINUTE);
        cache.put_entity("folder_tree:F-1:3", "F-1", 2, MINUTE);
        cache.put_entity("document:DOC-10", "DOC-10", 3, MINUTE);
        cache.put("schema:DOC-1", 4, MINUTE);
        assert_eq!(cache.invalidate_entity("DOC-1"), 1);
        assert_eq!(cache.get("document:DOC-1"), None);
        assert_eq!(cache.get("document:DOC-10"), Some(3));
        assert_eq!(cache.get("schema:DOC-1"), Some(4));
        assert_eq!(cache.invalidate_entity("F-1"), 1);
        assert_eq!(cache.invalidate_entity(""), 0);
    }

    #[test]
    fn test_invalidate_entity_with_colon_in_id() {
        let cache = ResponseCache::new(10);
        cache.put_entity("document:workspace:abc", "workspace:abc", 1, MINUTE);
        cache.put_entity("document:workspace:abcd", "workspace:abcd", 2, MINUTE);
        assert_eq!(cache.invalidate_entity("abc"), 0);
        assert_eq!(cache.invalidate_entity("workspace"), 0);
        assert_eq!(cache.invalidate_entity("workspace:abc"), 1);
        assert_eq!(cache.get("document:workspace:abc"), None);
        assert_eq!(cache.get("document:workspace:abcd"), Some(2));
    }

    #[test]
    fn test_invalidate_prefix_and_key() {
        let cache = ResponseCache::new(10);
        cache.put("folder_tree:-root-:2", 1, MINUTE);
        cache.put("folder_tree:F-1:2", 2, MINUTE);
        cache.put("schema:invoice", 3, MINUTE);
        assert_eq!(cache.invalidate_prefix("folder_tree:"), 2);
        assert!(cache.invalidate("schema:invoice"));
        assert!(!cache.invalidate("schema:invoice"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_disables() {
        let cache = ResponseCache::new(0);
        assert!(!cache.is_enabled());
        cache.put("k", 1, MINUTE);
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_concurrent_put_get() {
        use std::sync::Arc;
        let cache = Arc::new(ResponseCache::new(1000));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let key = format!("k:{}:{}", t, i);
                        cache.put(&key, i, MINUTE);
                        assert_eq!(cache.get(&key), Some(i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 800);
    }
}
