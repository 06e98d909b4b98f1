//! Bounded caching for decoded resources
//!
//! [`ResourceCache`] is a capacity-limited map that approximates LRU with a
//! global generation counter. Layers keep their decoded tiles here; when a
//! new tile arrives at a full cache, the least recently touched entries are
//! preempted until the cache falls below its retention mark.

mod resource;
mod stats;

pub use resource::{
    CacheError, PinPredicate, ResourceCache, DEFAULT_CACHE_CAPACITY, DEFAULT_EVICTION_FRACTION,
    GENERIC_EVICTION_FRACTION,
};
pub use stats::CacheStats;
