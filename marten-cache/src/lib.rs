//! TTL + LRU cache with single-flight coalescing (C7). Extends the
//! `DashMap`-backed `TtlCache` shape with a recency index for
//! size-bounded eviction and a per-key in-flight guard so a burst of
//! identical requests collapses into one computation (§4.7, §9
//! "Single-flight caching").

use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use indexmap::IndexSet;

/// Convenience alias: the selection tuple (§3) is the canonical cache key
/// for both the parameters cache and the dataset results cache (§4.7).
pub type SelectionKey = marten_core::selection::SelectionTuple;

struct Entry<V> {
    value: V,
    inserted: Instant,
}

/// A cache keyed by `K` (typically a selection tuple wrapped for
/// `Hash`/`Eq`, per §3) storing values of type `V`.
pub struct CoalescingCache<K, V> {
    store: DashMap<K, Entry<V>>,
    recency: Mutex<IndexSet<K>>,
    inflight: DashMap<K, Arc<tokio::sync::Mutex<()>>>,
    ttl: Duration,
    capacity: usize,
}

impl<K, V> CoalescingCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            store: DashMap::new(),
            recency: Mutex::new(IndexSet::new()),
            inflight: DashMap::new(),
            ttl,
            capacity,
        }
    }

    /// Number of live (non-expired-on-last-touch) entries.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        if let Some(entry) = self.store.get(key) {
            if entry.inserted.elapsed() < self.ttl {
                let value = entry.value.clone();
                drop(entry);
                self.touch(key);
                return Some(value);
            }
            drop(entry);
            self.remove(key);
        }
        None
    }

    pub fn insert(&self, key: K, value: V) {
        self.store.insert(
            key.clone(),
            Entry {
                value,
                inserted: Instant::now(),
            },
        );
        self.touch(&key);
        self.evict_over_capacity();
    }

    pub fn remove(&self, key: &K) {
        self.store.remove(key);
        self.recency.lock().expect("recency lock poisoned").shift_remove(key);
    }

    pub fn clear(&self) {
        self.store.clear();
        self.recency.lock().expect("recency lock poisoned").clear();
    }

    fn touch(&self, key: &K) {
        let mut recency = self.recency.lock().expect("recency lock poisoned");
        recency.shift_remove(key);
        recency.insert(key.clone());
    }

    fn evict_over_capacity(&self) {
        if self.capacity == 0 {
            return;
        }
        loop {
            let oldest = {
                let mut recency = self.recency.lock().expect("recency lock poisoned");
                if recency.len() <= self.capacity {
                    break;
                }
                recency.shift_remove_index(0)
            };
            match oldest {
                Some(key) => {
                    self.store.remove(&key);
                }
                None => break,
            }
        }
    }

    /// §4.7 single-flight: at most one in-flight computation per key. A
    /// computation that fails is never cached (§9).
    pub async fn get_or_compute<F, Fut, E>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(v) = self.get(&key) {
            return Ok(v);
        }

        let guard = self
            .inflight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let _permit = guard.lock().await;

        // Someone else may have populated the cache while we waited.
        if let Some(v) = self.get(&key) {
            drop(_permit);
            self.cleanup_inflight(&key, &guard);
            return Ok(v);
        }

        let result = compute().await;
        if let Ok(value) = &result {
            self.insert(key.clone(), value.clone());
        }
        drop(_permit);
        self.cleanup_inflight(&key, &guard);
        result
    }

    fn cleanup_inflight(&self, key: &K, guard: &Arc<tokio::sync::Mutex<()>>) {
        // Only the last waiter (the one holding the sole remaining
        // reference besides the map's own) removes the entry, so a
        // concurrent new waiter never has its guard yanked out from
        // under it.
        if Arc::strong_count(guard) <= 2 {
            self.inflight.remove_if(key, |_, v| Arc::strong_count(v) <= 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn ttl_expiry_evicts_on_access() {
        let cache: CoalescingCache<&str, i32> = CoalescingCache::new(Duration::from_millis(1), 10);
        cache.insert("a", 1);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get(&"a"), None);
    }

    #[test]
    fn lru_evicts_least_recently_used() {
        let cache: CoalescingCache<i32, i32> = CoalescingCache::new(Duration::from_secs(60), 2);
        cache.insert(1, 1);
        cache.insert(2, 2);
        cache.get(&1);
        cache.insert(3, 3);
        assert_eq!(cache.get(&2), None);
        assert!(cache.get(&1).is_some());
        assert!(cache.get(&3).is_some());
    }

    #[tokio::test]
    async fn concurrent_lookups_for_the_same_key_compute_once() {
        let cache: Arc<CoalescingCache<&str, i32>> =
            Arc::new(CoalescingCache::new(Duration::from_secs(60), 10));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute("k", || {
                        let calls = calls.clone();
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok::<_, ()>(42)
                        }
                    })
                    .await
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), Ok(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_computation_is_not_cached() {
        let cache: CoalescingCache<&str, i32> = CoalescingCache::new(Duration::from_secs(60), 10);
        let result = cache.get_or_compute("k", || async { Err::<i32, &str>("boom") }).await;
        assert_eq!(result, Err("boom"));
        assert_eq!(cache.get(&"k"), None);
    }
}
