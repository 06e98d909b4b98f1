//! Pending request queue.
//!
//! Requests are ordered by priority (higher values first), then by the order
//! in which their address was first queued. Each address appears at most
//! once: a second request for a queued address is merged into the first,
//! keeping the higher priority and the original queue position.
//!
//! # Example
//!
//! ```ignore
//! use terrastream::loader::{RequestQueue, ResourceRequest};
//!
//! let mut queue = RequestQueue::new();
//! queue.push(ResourceRequest::new(a, "http://t/a", 1.0));
//! queue.push(ResourceRequest::new(b, "http://t/b", 5.0));
//!
//! // b comes out first despite being pushed second
//! assert_eq!(queue.pop().unwrap().address, b);
//! ```

use super::request::ResourceRequest;
use crate::coord::TileAddress;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

// =============================================================================
// Heap Entry
// =============================================================================

/// Heap slot pointing at a pending request.
///
/// Merges and removals leave old slots behind; a slot is live only while its
/// version matches the pending entry.
#[derive(Debug)]
struct HeapEntry {
    priority: f64,
    sequence: u64,
    version: u64,
    address: TileAddress,
}

// Ordering for BinaryHeap: higher priority first, then lower sequence (older) first
impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.priority.total_cmp(&other.priority) {
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            other_ordering => other_ordering,
        }
    }
}

#[derive(Debug)]
struct Pending {
    request: ResourceRequest,
    sequence: u64,
    version: u64,
}

// =============================================================================
// Request Queue
// =============================================================================

/// Address-keyed priority queue of requests waiting for a fetch slot.
///
/// Not thread-safe; the scheduler owns it.
#[derive(Debug, Default)]
pub struct RequestQueue {
    pending: HashMap<TileAddress, Pending>,
    heap: BinaryHeap<HeapEntry>,
    next_sequence: u64,
    next_version: u64,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn contains(&self, address: &TileAddress) -> bool {
        self.pending.contains_key(address)
    }

    pub fn get(&self, address: &TileAddress) -> Option<&ResourceRequest> {
        self.pending.get(address).map(|p| &p.request)
    }

    fn bump_version(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }

    /// Queues a request, merging with an existing one for the same address.
    ///
    /// Returns true if the request was merged.
    pub fn push(&mut self, request: ResourceRequest) -> bool {
        let address = request.address;

        let queued = self
            .pending
            .get(&address)
            .map(|p| (p.request.priority, p.version));

        if let Some((queued_priority, queued_version)) = queued {
            let raised = request.priority > queued_priority;
            let version = if raised {
                self.bump_version()
            } else {
                queued_version
            };
            if let Some(existing) = self.pending.get_mut(&address) {
                let priority = existing.request.priority.max(request.priority);
                existing.request = ResourceRequest {
                    priority,
                    ..request
                };
                existing.version = version;
                if raised {
                    self.heap.push(HeapEntry {
                        priority,
                        sequence: existing.sequence,
                        version,
                        address,
                    });
                }
            }
            self.compact_if_sparse();
            return true;
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let version = self.bump_version();
        self.heap.push(HeapEntry {
            priority: request.priority,
            sequence,
            version,
            address,
        });
        self.pending.insert(
            address,
            Pending {
                request,
                sequence,
                version,
            },
        );
        false
    }

    /// Removes and returns the highest-priority request.
    pub fn pop(&mut self) -> Option<ResourceRequest> {
        while let Some(entry) = self.heap.pop() {
            let live = self
                .pending
                .get(&entry.address)
                .is_some_and(|p| p.version == entry.version);
            if live {
                return self.pending.remove(&entry.address).map(|p| p.request);
            }
        }
        None
    }

    /// Returns the highest-priority request without removing it.
    pub fn peek(&mut self) -> Option<&ResourceRequest> {
        while let Some(entry) = self.heap.peek() {
            let live = self
                .pending
                .get(&entry.address)
                .is_some_and(|p| p.version == entry.version);
            if live {
                let address = entry.address;
                return self.pending.get(&address).map(|p| &p.request);
            }
            self.heap.pop();
        }
        None
    }

    pub fn remove(&mut self, address: &TileAddress) -> Option<ResourceRequest> {
        let removed = self.pending.remove(address).map(|p| p.request);
        if removed.is_some() {
            self.compact_if_sparse();
        }
        removed
    }

    /// Keeps only requests matching `keep`; returns the ones dropped.
    pub fn retain<F>(&mut self, mut keep: F) -> Vec<ResourceRequest>
    where
        F: FnMut(&ResourceRequest) -> bool,
    {
        let dropped: Vec<TileAddress> = self
            .pending
            .values()
            .filter(|p| !keep(&p.request))
            .map(|p| p.request.address)
            .collect();

        let removed = dropped
            .iter()
            .filter_map(|address| self.pending.remove(address).map(|p| p.request))
            .collect();
        self.compact_if_sparse();
        removed
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.heap.clear();
    }

    /// Iterates pending requests in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceRequest> {
        self.pending.values().map(|p| &p.request)
    }

    fn compact_if_sparse(&mut self) {
        if self.heap.len() <= 2 * self.pending.len() + 64 {
            return;
        }
        self.heap = self
            .pending
            .iter()
            .map(|(address, p)| HeapEntry {
                priority: p.request.priority,
                sequence: p.sequence,
                version: p.version,
                address: *address,
            })
            .collect();
    }
}

// =============================================================================
// Tests
// =============================================================================
