//! Clip cache
//!
//! Capacity-bounded LRU keyed by verse id. Both reads and writes promote the
//! entry; inserting past capacity evicts the least-recently-touched entry.
//! The capacity bounds memory and is a configuration constant, not derived
//! from corpus size.
//!
//! The scheduler keeps its own `Arc` to the sounding clip, so eviction never
//! cuts audio short; it only affects future lookups.

use crate::audio::clip::AudioClip;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Cache statistics
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }
}

struct Inner {
    entries: HashMap<String, Arc<AudioClip>>,
    /// Recency order: front = least recently touched
    recency: VecDeque<String>,
}

/// Capacity-bounded LRU clip cache.
pub struct ClipCache {
    capacity: usize,
    inner: Mutex<Inner>,
    stats: CacheStats,
}

impl ClipCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                recency: VecDeque::new(),
            }),
            stats: CacheStats::default(),
        }
    }

    /// Look up a clip, promoting it to most recently used on hit.
    pub fn get(&self, verse_id: &str) -> Option<Arc<AudioClip>> {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;
        match inner.entries.get(verse_id) {
            Some(clip) => {
                let clip = Arc::clone(clip);
                promote(&mut inner.recency, verse_id);
                self.stats.record_hit();
                Some(clip)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Insert (or replace) a clip, promoting it and evicting the least
    /// recently touched entry when the insert overflows capacity.
    pub fn insert(&self, verse_id: &str, clip: Arc<AudioClip>) {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;

        let replaced = inner.entries.insert(verse_id.to_string(), clip).is_some();
        promote(&mut inner.recency, verse_id);

        if !replaced && inner.entries.len() > self.capacity {
            if let Some(victim) = inner.recency.pop_front() {
                inner.entries.remove(&victim);
                self.stats.record_eviction();
                debug!(verse_id = %victim, "Evicted least recently used clip");
            }
        }
    }

    pub fn contains(&self, verse_id: &str) -> bool {
        self.inner.lock().unwrap().entries.contains_key(verse_id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

/// Move `verse_id` to the most-recently-used end.
fn promote(recency: &mut VecDeque<String>, verse_id: &str) {
    if let Some(idx) = recency.iter().position(|id| id == verse_id) {
        recency.remove(idx);
    }
    recency.push_back(verse_id.to_string());
}
