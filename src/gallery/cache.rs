//! Bounded, time-limited in-memory cache.
//!
//! Entries expire `ttl` after insertion. When full, inserting a new key evicts
//! the oldest-inserted entry. Reads never change eviction order; overwriting a
//! key counts as a fresh insertion.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
    time::{Duration, Instant},
};

struct Entry<V> {
    value: V,
    inserted: Instant,
}

struct Inner<V> {
    entries: HashMap<String, Entry<V>>,
    order: VecDeque<String>,
}

impl<V> Inner<V> {
    fn forget(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }
}

pub struct TtlCache<V> {
    inner: Mutex<Inner<V>>,
    ttl: Duration,
    max_entries: usize,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_at(key.into(), value, Instant::now())
    }

    #[cfg(test)]
    pub fn remove(&self, key: &str) {
        self.lock().forget(key);
    }

    #[allow(dead_code)] // operator flush, not routed
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let mut inner = self.lock();
        let expired = match inner.entries.get(key) {
            None => return None,
            Some(entry) => now.saturating_duration_since(entry.inserted) > self.ttl,
        };
        if expired {
            inner.forget(key);
            return None;
        }
        inner.entries.get(key).map(|e| e.value.clone())
    }

    pub(crate) fn set_at(&self, key: String, value: V, now: Instant) {
        let mut inner = self.lock();
        inner.forget(&key);
        while inner.entries.len() >= self.max_entries {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
        }
        inner.order.push_back(key.clone());
        inner.entries.insert(key, Entry { value, inserted: now });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn hit_before_ttl_miss_after() {
        let cache = TtlCache::new(TTL, 10);
        let t0 = Instant::now();
        cache.set_at("gallery_images".into(), 1u32, t0);

        assert_eq!(cache.get_at("gallery_images", t0), Some(1));
        assert_eq!(cache.get_at("gallery_images", t0 + TTL), Some(1));
        assert_eq!(cache.get_at("gallery_images", t0 + TTL + Duration::from_millis(1)), None);
        // expired entry is dropped on the read that observed it
        assert!(cache.is_empty());
    }

    #[test]
    fn past_capacity_evicts_earliest_insert() {
        let cache = TtlCache::new(TTL, 3);
        let t0 = Instant::now();
        for (i, key) in ["a", "b", "c", "d"].into_iter().enumerate() {
            cache.set_at(key.into(), i, t0);
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get_at("a", t0), None);
        assert_eq!(cache.get_at("b", t0), Some(1));
        assert_eq!(cache.get_at("c", t0), Some(2));
        assert_eq!(cache.get_at("d", t0), Some(3));
    }

    #[test]
    fn reads_do_not_refresh_eviction_order() {
        let cache = TtlCache::new(TTL, 2);
        let t0 = Instant::now();
        cache.set_at("a".into(), 'a', t0);
        cache.set_at("b".into(), 'b', t0);
        assert_eq!(cache.get_at("a", t0), Some('a'));
        cache.set_at("c".into(), 'c', t0);
        assert_eq!(cache.get_at("a", t0), None);
        assert_eq!(cache.get_at("b", t0), Some('b'));
    }

    #[test]
    fn overwrite_moves_key_to_back_without_evicting() {
        let cache = TtlCache::new(TTL, 2);
        let t0 = Instant::now();
        cache.set_at("a".into(), 1, t0);
        cache.set_at("b".into(), 2, t0);
        cache.set_at("a".into(), 10, t0);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_at("a", t0), Some(10));

        cache.set_at("c".into(), 3, t0);
        assert_eq!(cache.get_at("b", t0), None);
        assert_eq!(cache.get_at("a", t0), Some(10));
    }

    #[test]
    fn overwrite_restarts_ttl() {
        let cache = TtlCache::new(TTL, 2);
        let t0 = Instant::now();
        cache.set_at("a".into(), 1, t0);
        let later = t0 + TTL - Duration::from_secs(1);
        cache.set_at("a".into(), 2, later);
        assert_eq!(cache.get_at("a", t0 + TTL + Duration::from_secs(1)), Some(2));
    }

    #[test]
    fn remove_drops_one_key() {
        let cache = TtlCache::new(TTL, 5);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.remove("a");
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_empties_everything() {
        let cache = TtlCache::new(TTL, 5);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn concurrent_sets_keep_bounds() {
        use std::sync::Arc;

        let cache = Arc::new(TtlCache::new(TTL, 16));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        cache.set(format!("{t}-{i}"), i);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 16);
    }
}
