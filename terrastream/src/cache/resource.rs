//! Generational, capacity-bounded resource cache.
//!
//! Recency is approximated with a logical clock instead of a linked list:
//! every read or write stamps the entry with the current global generation
//! and advances the clock. When the cache is full, [`ResourceCache::preempt`]
//! repeatedly scans for the entry with the smallest generation and drops it.
//!
//! # Example
//!
//! ```ignore
//! use terrastream::cache::ResourceCache;
//!
//! let mut cache = ResourceCache::new(4).with_eviction_fraction(0.75);
//! cache.set("a", 1);
//! assert_eq!(cache.get(&"a"), Some(&1));
//! ```

use super::stats::CacheStats;
use std::collections::HashMap;
use std::hash::Hash;
use thiserror::Error;
use tracing::trace;

// =============================================================================
// Configuration
// =============================================================================

/// Default number of entries a cache holds.
pub const DEFAULT_CACHE_CAPACITY: usize = 512;

/// Default share of capacity kept after a preemption pass.
pub const DEFAULT_EVICTION_FRACTION: f64 = 0.75;

/// Retention share used by generic, non-layer caches.
pub const GENERIC_EVICTION_FRACTION: f64 = 0.9;

/// Errors raised by cache maintenance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// An operation found the cache in a state its invariants rule out
    #[error("Cache invariant violated: {0}")]
    InvariantViolation(&'static str),
}

/// Predicate marking entries that should only be evicted as a last resort.
pub type PinPredicate<V> = fn(&V) -> bool;

// =============================================================================
// Resource Cache
// =============================================================================

struct Slot<V> {
    value: V,
    generation: u64,
}

/// Capacity-bounded map with generational approximate-LRU eviction.
///
/// The cache is not thread-safe; it is owned by the layer that fills it.
pub struct ResourceCache<K, V> {
    entries: HashMap<K, Slot<V>>,
    capacity: usize,
    eviction_fraction: f64,
    /// Next generation to hand out; starts at 1.
    clock: u64,
    pinned: Option<PinPredicate<V>>,
    hits: u64,
    misses: u64,
    insertions: u64,
    evictions: u64,
}

impl<K, V> ResourceCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::with_capacity(capacity),
            capacity,
            eviction_fraction: DEFAULT_EVICTION_FRACTION,
            clock: 1,
            pinned: None,
            hits: 0,
            misses: 0,
            insertions: 0,
            evictions: 0,
        }
    }

    /// Sets the share of capacity kept after preemption, clamped to `(0, 1]`.
    pub fn with_eviction_fraction(mut self, fraction: f64) -> Self {
        self.eviction_fraction = if fraction.is_finite() && fraction > 0.0 {
            fraction.min(1.0)
        } else {
            DEFAULT_EVICTION_FRACTION
        };
        self
    }

    /// Makes preemption pass over entries matching `pinned` while any
    /// unpinned entry remains.
    pub fn with_pin(mut self, pinned: PinPredicate<V>) -> Self {
        self.pinned = Some(pinned);
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn eviction_fraction(&self) -> f64 {
        self.eviction_fraction
    }

    /// Size below which a preemption pass stops: `floor(C × fraction)`.
    pub fn retention_mark(&self) -> usize {
        (self.capacity as f64 * self.eviction_fraction).floor() as usize
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Current value of the generation clock.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Generation stamped on `key`, if present.
    pub fn generation_of(&self, key: &K) -> Option<u64> {
        self.entries.get(key).map(|slot| slot.generation)
    }

    fn tick(&mut self) -> u64 {
        let generation = self.clock;
        self.clock += 1;
        generation
    }

    /// Returns the value and marks it as used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        match self.entries.get_mut(key) {
            Some(slot) => {
                slot.generation = self.clock;
                self.clock += 1;
                self.hits += 1;
                Some(&slot.value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Mutable access; counts as a use.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let slot = self.entries.get_mut(key)?;
        slot.generation = self.clock;
        self.clock += 1;
        Some(&mut slot.value)
    }

    /// Reads without touching.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|slot| &slot.value)
    }

    /// Updates the entry's generation without reading it.
    ///
    /// Returns false if `key` is absent.
    pub fn touch(&mut self, key: &K) -> bool {
        if !self.entries.contains_key(key) {
            return false;
        }
        let generation = self.tick();
        if let Some(slot) = self.entries.get_mut(key) {
            slot.generation = generation;
        }
        true
    }

    /// Inserts or overwrites `key` and marks it as used.
    ///
    /// A new key arriving at a full cache first triggers a preemption pass.
    /// Returns the entries that pass evicted.
    pub fn set(&mut self, key: K, value: V) -> Vec<(K, V)> {
        let mut evicted = Vec::new();
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            evicted = self.preempt_nonempty();
        }

        let generation = self.tick();
        self.entries.insert(key, Slot { value, generation });
        self.insertions += 1;

        debug_assert!(self.entries.len() <= self.capacity);
        evicted
    }

    /// Evicts least-recently-touched entries until the size drops below the
    /// retention mark, always evicting at least one.
    pub fn preempt(&mut self) -> Result<Vec<(K, V)>, CacheError> {
        if self.entries.is_empty() {
            return Err(CacheError::InvariantViolation(
                "preempt called on an empty cache",
            ));
        }
        Ok(self.preempt_nonempty())
    }

    fn preempt_nonempty(&mut self) -> Vec<(K, V)> {
        let mark = self.retention_mark();
        let mut evicted = Vec::new();

        while let Some(entry) = self.evict_oldest() {
            evicted.push(entry);
            if self.entries.len() < mark {
                break;
            }
        }

        self.evictions += evicted.len() as u64;
        trace!(
            evicted = evicted.len(),
            remaining = self.entries.len(),
            "Cache preempted"
        );
        evicted
    }

    /// Removes the entry with the globally smallest generation, preferring
    /// unpinned entries.
    fn evict_oldest(&mut self) -> Option<(K, V)> {
        let pinned = self.pinned;
        let is_pinned = |slot: &Slot<V>| pinned.is_some_and(|p| p(&slot.value));

        let oldest_unpinned = self
            .entries
            .iter()
            .filter(|(_, slot)| !is_pinned(slot))
            .min_by_key(|(_, slot)| slot.generation)
            .map(|(key, _)| key.clone());

        let victim = match oldest_unpinned {
            Some(key) => key,
            None => self
                .entries
                .iter()
                .min_by_key(|(_, slot)| slot.generation)
                .map(|(key, _)| key.clone())?,
        };

        self.entries
            .remove(&victim)
            .map(|slot| (victim, slot.value))
    }

    /// Removes `key` without counting an eviction.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|slot| slot.value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates entries in arbitrary order without touching them.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(key, slot)| (key, &slot.value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            insertions: self.insertions,
            evictions: self.evictions,
            entries: self.entries.len(),
            capacity: self.capacity,
        }
    }
}

impl<K, V> std::fmt::Debug for ResourceCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("len", &self.entries.len())
            .field("capacity", &self.capacity)
            .field("eviction_fraction", &self.eviction_fraction)
            .field("clock", &self.clock)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
