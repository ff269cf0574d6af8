// Bounded, optionally expiring memo table shared between threads.
//
// Every read and write of a key happens under one lock, so a key can never
// observe another key's value. Values are computed outside the lock: two
// threads missing on the same key both compute, and the later insert wins.
// Callers only cache pure functions of the key, so both values are equal.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum live entries. Zero disables caching.
    pub capacity: usize,
    /// Entries older than this are treated as absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,
}

impl CacheConfig {
    pub fn new(capacity: usize, ttl_secs: Option<u64>) -> Self {
        Self { capacity, ttl_secs }
    }

    pub fn disabled() -> Self {
        Self::new(0, None)
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
}

struct Slot<V> {
    value: V,
    inserted: Instant,
    tick: u64,
}

struct Inner<K, V> {
    entries: HashMap<K, Slot<V>>,
    // tick -> key, oldest first
    recency: BTreeMap<u64, K>,
    tick: u64,
}

impl<K, V> Inner<K, V>
where
    K: Eq + Hash + Clone,
{
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn remove(&mut self, key: &K) {
        if let Some(slot) = self.entries.remove(key) {
            self.recency.remove(&slot.tick);
        }
    }
}

pub struct MemoCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    capacity: usize,
    ttl: Option<Duration>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> MemoCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                tick: 0,
            }),
            capacity: config.capacity,
            ttl: config.ttl(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();

        let expired = inner
            .entries
            .get(key)
            .map(|slot| self.ttl.is_some_and(|ttl| slot.inserted.elapsed() >= ttl));
        match expired {
            None => {
                drop(inner);
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Some(true) => {
                inner.remove(key);
                drop(inner);
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Some(false) => {}
        }

        let tick = inner.next_tick();
        let Inner { entries, recency, .. } = &mut *inner;
        let slot = entries.get_mut(key)?;
        recency.remove(&slot.tick);
        slot.tick = tick;
        recency.insert(tick, key.clone());
        let value = slot.value.clone();
        drop(inner);

        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(value)
    }

    pub fn insert(&self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }
        let mut inner = self.inner.lock();
        inner.remove(&key);

        let tick = inner.next_tick();
        inner.recency.insert(tick, key.clone());
        inner.entries.insert(
            key,
            Slot {
                value,
                inserted: Instant::now(),
                tick,
            },
        );

        while inner.entries.len() > self.capacity {
            let oldest = match inner.recency.iter().next() {
                Some((_, key)) => key.clone(),
                None => break,
            };
            inner.remove(&oldest);
        }
    }

    pub fn get_or_insert_with<F>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let value = compute();
        self.insert(key, value.clone());
        value
    }

    /// Like [`get_or_insert_with`](Self::get_or_insert_with); errors are not cached.
    pub fn get_or_try_insert_with<F, E>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.recency.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: self.len(),
        }
    }
}

impl<K, V> std::fmt::Debug for MemoCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoCache")
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
