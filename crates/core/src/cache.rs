//! Bounded TTL caches
//!
//! Entries expire lazily on read. When an insert finds the cache full, the
//! oldest quarter of entries is evicted synchronously before the write, so
//! the cache never grows past capacity and there is no background sweeper.

use crate::response::AskResponse;
use crate::retrieval::Match;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Capacity and lifetime for one cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub capacity: usize,
    pub ttl: Duration,
}

impl CachePolicy {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self { capacity, ttl }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub hit_rate: f64,
}

pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    policy: CachePolicy,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            entries: Mutex::new(HashMap::with_capacity(policy.capacity.min(1024))),
            policy,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Instant::now())
    }

    pub(crate) fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        let mut entries = self.entries.lock();
        let fresh = match entries.get(key) {
            Some(entry) if now.saturating_duration_since(entry.inserted_at) < self.policy.ttl => {
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        };

        match fresh {
            Some(v) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(v)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub(crate) fn insert_at(&self, key: K, value: V, now: Instant) {
        if self.policy.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock();
        if !entries.contains_key(&key) && entries.len() >= self.policy.capacity {
            let evicted = Self::evict_oldest_quarter(&mut entries);
            self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
        }
        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
            },
        );
    }

    fn evict_oldest_quarter(entries: &mut HashMap<K, CacheEntry<V>>) -> usize {
        let count = (entries.len() / 4).max(1);
        let mut by_age: Vec<(K, Instant)> = entries
            .iter()
            .map(|(k, e)| (k.clone(), e.inserted_at))
            .collect();
        by_age.sort_by_key(|(_, at)| *at);
        for (key, _) in by_age.into_iter().take(count) {
            entries.remove(&key);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            size: self.len(),
            capacity: self.policy.capacity,
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
        }
    }
}

/// The process-wide caches, built once at startup and shared by reference
pub struct CacheRegistry {
    pub embeddings: TtlCache<String, Arc<Vec<f32>>>,
    pub search: TtlCache<String, Arc<Vec<Match>>>,
    pub answers: TtlCache<String, AskResponse>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RegistryStats {
    pub embeddings: CacheStats,
    pub search: CacheStats,
    pub answers: CacheStats,
}

impl CacheRegistry {
    pub fn new(embeddings: CachePolicy, search: CachePolicy, answers: CachePolicy) -> Self {
        Self {
            embeddings: TtlCache::new(embeddings),
            search: TtlCache::new(search),
            answers: TtlCache::new(answers),
        }
    }

    pub fn embedding_key(model: &str, text: &str) -> String {
        format!("{}:{}", model, text)
    }

    pub fn search_key(search_type: &str, query: &str, filter: Option<&str>) -> String {
        format!("{}:{}:{}", search_type, query, filter.unwrap_or(""))
    }

    /// Per-user, case- and whitespace-insensitive key for answers
    pub fn answer_key(user_id: &str, question: &str) -> String {
        let normalized = question
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let user = match user_id.trim() {
            "" => "default",
            user => user,
        };
        format!("{}:{}", user, normalized)
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            embeddings: self.embeddings.stats(),
            search: self.search.stats(),
            answers: self.answers.stats(),
        }
    }

    pub fn clear(&self) {
        self.embeddings.clear();
        self.search.clear();
        self.answers.clear();
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new(
            CachePolicy::new(1000, Duration::from_secs(2 * 60 * 60)),
            CachePolicy::new(200, Duration::from_secs(300)),
            CachePolicy::new(300, Duration::from_secs(3600)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(capacity: usize, ttl_secs: u64) -> TtlCache<String, u32> {
        TtlCache::new(CachePolicy::new(capacity, Duration::from_secs(ttl_secs)))
    }

    #[test]
    fn test_hit_within_ttl() {
        let c = cache(10, 60);
        let t0 = Instant::now();
        c.insert_at("a".into(), 1, t0);
        assert_eq!(c.get_at(&"a".into(), t0 + Duration::from_secs(59)), Some(1));
        assert_eq!(c.stats().hits, 1);
    }

    #[test]
    fn test_miss_after_ttl_and_lazy_removal() {
        let c = cache(10, 60);
        let t0 = Instant::now();
        c.insert_at("a".into(), 1, t0);
        assert_eq!(c.get_at(&"a".into(), t0 + Duration::from_secs(60)), None);
        assert_eq!(c.len(), 0);
        assert_eq!(c.stats().misses, 1);
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let c = cache(8, 600);
        let t0 = Instant::now();
        for i in 0..50u32 {
            c.insert_at(format!("k{}", i), i, t0 + Duration::from_millis(i as u64));
            assert!(c.len() <= 8);
        }
    }

    #[test]
    fn test_evicts_oldest_quarter() {
        let c = cache(8, 600);
        let t0 = Instant::now();
        for i in 0..8u32 {
            c.insert_at(format!("k{}", i), i, t0 + Duration::from_millis(i as u64));
        }
        c.insert_at("new".into(), 99, t0 + Duration::from_millis(100));
        let later = t0 + Duration::from_millis(200);
        assert_eq!(c.get_at(&"k0".into(), later), None);
        assert_eq!(c.get_at(&"k1".into(), later), None);
        assert_eq!(c.get_at(&"k2".into(), later), Some(2));
        assert_eq!(c.get_at(&"new".into(), later), Some(99));
        assert_eq!(c.stats().evictions, 2);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let c = cache(2, 600);
        c.insert("a".into(), 1);
        c.insert("b".into(), 2);
        c.insert("a".into(), 3);
        assert_eq!(c.len(), 2);
        assert_eq!(c.get(&"a".into()), Some(3));
        assert_eq!(c.get(&"b".into()), Some(2));
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let c = cache(0, 600);
        c.insert("a".into(), 1);
        assert!(c.is_empty());
    }

    #[test]
    fn test_answer_key_normalizes() {
        assert_eq!(
            CacheRegistry::answer_key("u1", "  Heritage   RATE for dollar spot "),
            "u1:heritage rate for dollar spot"
        );
        assert_eq!(CacheRegistry::answer_key(" ", "pythium?"), "default:pythium?");
    }

    #[test]
    fn test_answer_key_is_per_user() {
        assert_ne!(
            CacheRegistry::answer_key("u1", "heritage rate"),
            CacheRegistry::answer_key("u2", "heritage rate")
        );
    }
}
