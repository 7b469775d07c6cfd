//! Bounded LRU cache of encoder outputs keyed by input text.
//!
//! Each encoder owns one, so the same text cached by two encoders never
//! collides. Entries older than the TTL are dropped on access.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use ndarray::Array1;
use parking_lot::Mutex;

struct CacheEntry {
    embedding: Array1<f32>,
    inserted_at: Instant,
}

/// Thread-safe LRU query cache for embeddings.
pub struct QueryCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
    ttl: Duration,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    // Front is least recently used.
    recency: VecDeque<String>,
}

impl CacheInner {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            if let Some(k) = self.recency.remove(pos) {
                self.recency.push_back(k);
            }
        }
    }

    fn forget(&mut self, key: &str) {
        self.entries.remove(key);
        self.recency.retain(|k| k != key);
    }
}

impl QueryCache {
    /// Create a cache holding at most `capacity` entries for `ttl` each.
    /// A zero capacity disables caching.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            capacity,
            ttl,
        }
    }

    /// Look up a cached embedding, refreshing its recency on a hit.
    pub fn get(&self, text: &str) -> Option<Array1<f32>> {
        let mut inner = self.inner.lock();

        let (embedding, expired) = match inner.entries.get(text) {
            Some(entry) => (
                entry.embedding.clone(),
                entry.inserted_at.elapsed() >= self.ttl,
            ),
            None => return None,
        };

        if expired {
            inner.forget(text);
            return None;
        }

        inner.touch(text);
        Some(embedding)
    }

    /// Insert or replace an embedding, evicting the least recently used
    /// entries when full.
    pub fn put(&self, text: String, embedding: Array1<f32>) {
        if self.capacity == 0 {
            return;
        }
        let mut inner = self.inner.lock();

        let entry = CacheEntry {
            embedding,
            inserted_at: Instant::now(),
        };

        if inner.entries.insert(text.clone(), entry).is_some() {
            inner.touch(&text);
            return;
        }

        inner.recency.push_back(text);
        while inner.entries.len() > self.capacity {
            match inner.recency.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.recency.clear();
    }
}
