//! Bounded cache of recent consolidation results.

use std::collections::HashMap;
use std::hash::Hash;
use tracing::debug;

use crate::metrics;

/// Logical clock readings for one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStamp {
    pub inserted: u64,
    pub last_access: u64,
}

/// Decides which entry leaves when the cache is over capacity: the entry
/// with the lowest rank is evicted.
pub trait EvictionPolicy: Send + Sync {
    fn rank(&self, stamp: &EntryStamp) -> u64;
}

/// Evict the entry inserted longest ago.
#[derive(Debug, Clone, Copy, Default)]
pub struct OldestFirst;

impl EvictionPolicy for OldestFirst {
    fn rank(&self, stamp: &EntryStamp) -> u64 {
        stamp.inserted
    }
}

/// Evict the entry read or written longest ago.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeastRecentlyUsed;

impl EvictionPolicy for LeastRecentlyUsed {
    fn rank(&self, stamp: &EntryStamp) -> u64 {
        stamp.last_access
    }
}

#[derive(Debug)]
pub struct ResultCache<K, V, P = OldestFirst> {
    entries: HashMap<K, (V, EntryStamp)>,
    capacity: usize,
    clock: u64,
    policy: P,
}

impl<K: Eq + Hash + Clone, V> ResultCache<K, V, OldestFirst> {
    pub fn new(capacity: usize) -> Self {
        Self::with_policy(capacity, OldestFirst)
    }
}

impl<K: Eq + Hash + Clone, V, P: EvictionPolicy> ResultCache<K, V, P> {
    /// A capacity of zero is treated as one.
    pub fn with_policy(capacity: usize, policy: P) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            clock: 0,
            policy,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Read an entry and mark it as used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let now = self.tick();
        self.entries.get_mut(key).map(|(value, stamp)| {
            stamp.last_access = now;
            &*value
        })
    }

    /// Read an entry without touching its stamp.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|(value, _)| value)
    }

    /// Store a value, returning whatever was evicted to make room.
    pub fn insert(&mut self, key: K, value: V) -> Vec<(K, V)> {
        let now = self.tick();
        self.entries.insert(
            key,
            (
                value,
                EntryStamp {
                    inserted: now,
                    last_access: now,
                },
            ),
        );

        let mut evicted = Vec::new();
        while self.entries.len() > self.capacity {
            let Some(victim) = self
                .entries
                .iter()
                .min_by_key(|(_, (_, stamp))| self.policy.rank(stamp))
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            if let Some((value, _)) = self.entries.remove(&victim) {
                metrics::record_cache_eviction();
                evicted.push((victim, value));
            }
        }
        if !evicted.is_empty() {
            debug!(evicted = evicted.len(), "Cache over capacity");
        }
        evicted
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(value, _)| value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
