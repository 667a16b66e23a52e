use std::{collections::BTreeMap, num::NonZeroUsize};

use fxhash::FxHashMap;

use crate::common::{CacheKey, Outcome};

/// How many search states a [`Cache`] may remember.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheCapacity {
    /// Keep every state for the lifetime of the solve.
    #[default]
    Unbounded,
    /// Keep at most this many states, evicting the least recently used one.
    Bounded(NonZeroUsize),
    /// Remember nothing.
    Disabled,
}

impl From<Option<usize>> for CacheCapacity {
    /// `None` is unbounded and `Some(0)` disables the cache.
    fn from(value: Option<usize>) -> Self {
        match value {
            None => CacheCapacity::Unbounded,
            Some(n) => NonZeroUsize::new(n)
                .map(CacheCapacity::Bounded)
                .unwrap_or(CacheCapacity::Disabled),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
}

#[derive(Debug)]
struct Entry {
    outcome: Outcome,
    stamp: u64,
}

/// Memoizes the outcome of a search keyed by the partial assignment it started from.
///
/// The outcome for a key only depends on the formula and the key itself, so storing a key a
/// second time always stores an equal outcome and evicting an entry only costs a recomputation.
#[derive(Debug)]
pub struct Cache {
    capacity: CacheCapacity,
    entries: FxHashMap<CacheKey, Entry>,
    // oldest stamp first, only maintained for bounded caches
    recency: BTreeMap<u64, CacheKey>,
    clock: u64,
    stats: CacheStats,
}

impl Cache {
    pub fn new(capacity: CacheCapacity) -> Self {
        Cache {
            capacity,
            entries: FxHashMap::default(),
            recency: BTreeMap::new(),
            clock: 0,
            stats: CacheStats::default(),
        }
    }

    /// Look up a key. A hit counts as a use for the eviction order.
    pub fn get(&mut self, key: &CacheKey) -> Option<Outcome> {
        let stamp = self.tick();
        let bounded = matches!(self.capacity, CacheCapacity::Bounded(_));
        match self.entries.get_mut(key) {
            Some(entry) => {
                self.stats.hits += 1;
                if bounded {
                    let key = self
                        .recency
                        .remove(&entry.stamp)
                        .unwrap_or_else(|| key.clone());
                    entry.stamp = stamp;
                    self.recency.insert(stamp, key);
                }
                Some(entry.outcome.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: CacheKey, outcome: Outcome) {
        let limit = match self.capacity {
            CacheCapacity::Disabled => return,
            CacheCapacity::Unbounded => None,
            CacheCapacity::Bounded(n) => Some(n.get()),
        };
        self.stats.inserts += 1;
        let stamp = self.tick();

        if let Some(limit) = limit {
            if let Some(old) = self.entries.get(&key) {
                self.recency.remove(&old.stamp);
            } else if self.entries.len() >= limit {
                self.evict_oldest();
            }
            self.recency.insert(stamp, key.clone());
        }
        self.entries.insert(key, Entry { outcome, stamp });
    }

    fn evict_oldest(&mut self) {
        if let Some((_, key)) = self.recency.pop_first() {
            self.entries.remove(&key);
            self.stats.evictions += 1;
            tracing::trace!("evicted cache entry, {} remain", self.entries.len());
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
