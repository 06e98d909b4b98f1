//! A single streamed tile layer.
//!
//! [`Layer`] connects the pieces for one data source: each frame it takes the
//! selector's wishlist, prunes downloads that are no longer wanted, queues
//! what is missing from its cache, and files finished tiles into the cache
//! while notifying listeners.

use super::config::{LayerConfig, ReleasePolicy};
use super::entry::{LayerEntry, LayerId, TileMatch};
use super::error::LayerError;
use super::listener::TileListener;
use crate::cache::{CacheStats, ResourceCache};
use crate::coord::TileAddress;
use crate::decode::{decoder_for, ResourceKind, TileData, TileDecoder};
use crate::loader::{
    Completion, FetchOutcome, FetchScheduler, RequestMetadata, ResourceRequest, SchedulerStats,
};
use crate::lod::Wishlist;
use crate::provider::{AsyncHttpClient, UrlTemplate};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Counters for one layer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayerStats {
    pub frame: u64,
    pub scheduler: SchedulerStats,
    pub cache: CacheStats,
    /// Wishlist entries coarser than the layer's minimum level
    pub skipped_below_min: u64,
    /// Wishlist entries already cached
    pub cache_touches: u64,
    /// Tiles dropped from the cache by eviction or release
    pub released: u64,
}

/// What one [`Layer::request`] call did with the wishlist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestSummary {
    pub forwarded: usize,
    pub cached: usize,
    pub skipped: usize,
    pub pruned: usize,
}

/// A cached, scheduled tile source.
pub struct Layer<C: AsyncHttpClient> {
    id: LayerId,
    config: LayerConfig,
    template: UrlTemplate,
    decoder: Arc<dyn TileDecoder>,
    scheduler: FetchScheduler<C>,
    cache: ResourceCache<TileAddress, LayerEntry>,
    listeners: Vec<Box<dyn TileListener>>,
    frame: u64,
    skipped_below_min: u64,
    cache_touches: u64,
    released: u64,
}

impl<C: AsyncHttpClient> Layer<C> {
    /// Creates a layer using the decoder matching `config.kind`.
    pub fn new(id: LayerId, config: LayerConfig, client: Arc<C>) -> Result<Self, LayerError> {
        let decoder = decoder_for(config.kind, config.resolution);
        Self::with_decoder(id, config, client, decoder, &CancellationToken::new())
    }

    /// Creates a layer with an explicit decoder, cancelling its downloads
    /// when `parent` is cancelled.
    pub fn with_decoder(
        id: LayerId,
        config: LayerConfig,
        client: Arc<C>,
        decoder: Arc<dyn TileDecoder>,
        parent: &CancellationToken,
    ) -> Result<Self, LayerError> {
        if !config.levels_valid() {
            return Err(LayerError::InvalidLevels {
                layer: config.name.clone(),
                min_level: config.min_level,
                max_level: config.max_level,
            });
        }
        if decoder.kind() != config.kind {
            return Err(LayerError::KindMismatch {
                layer: config.name.clone(),
                expected: config.kind,
                actual: decoder.kind(),
            });
        }
        let template =
            UrlTemplate::parse(&config.url_template).map_err(|source| LayerError::Template {
                layer: config.name.clone(),
                source,
            })?;

        let mut cache = ResourceCache::new(config.cache_capacity)
            .with_eviction_fraction(config.eviction_fraction);
        if config.release_policy == ReleasePolicy::Immediate {
            cache = cache.with_pin(LayerEntry::is_referenced);
        }

        let scheduler = FetchScheduler::with_parent(
            client,
            Arc::clone(&decoder),
            config.scheduler.clone(),
            parent,
        );

        info!(
            layer = %config.name,
            kind = %config.kind,
            template = %template,
            min_level = config.min_level,
            max_level = config.max_level,
            "Layer created"
        );

        Ok(Self {
            id,
            config,
            template,
            decoder,
            scheduler,
            cache,
            listeners: Vec::new(),
            frame: 0,
            skipped_below_min: 0,
            cache_touches: 0,
            released: 0,
        })
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.config.kind
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn add_listener(&mut self, listener: Box<dyn TileListener>) {
        self.listeners.push(listener);
    }

    /// True if the tile is in the cache.
    pub fn cached(&self, address: &TileAddress) -> bool {
        self.cache.contains(address)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Reference count of a cached tile.
    pub fn ref_count(&self, address: &TileAddress) -> Option<u32> {
        self.cache.peek(address).map(|entry| entry.ref_count)
    }

    pub fn has_in_flight(&self) -> bool {
        self.scheduler.in_flight_len() > 0
    }

    /// True when nothing is queued or downloading.
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn stats(&self) -> LayerStats {
        LayerStats {
            frame: self.frame,
            scheduler: self.scheduler.stats(),
            cache: self.cache.stats(),
            skipped_below_min: self.skipped_below_min,
            cache_touches: self.cache_touches,
            released: self.released,
        }
    }

    /// Brings the layer in line with a new wishlist.
    ///
    /// Addresses finer than `max_level` are replaced by their ancestor at
    /// `max_level`; addresses coarser than `min_level` are skipped. Requests
    /// the wishlist no longer covers are pruned, cached tiles are touched,
    /// and the rest are queued at their wishlist priority.
    ///
    /// # Panics
    ///
    /// Panics if the layer was built outside a Tokio runtime and this is
    /// called outside one too. See [`FetchScheduler::with_parent`].
    pub fn request(&mut self, wishlist: &Wishlist) -> RequestSummary {
        self.frame += 1;
        let mut summary = RequestSummary::default();

        let mut wanted = Wishlist::new();
        let mut origins = Vec::with_capacity(wishlist.len());
        for entry in wishlist {
            let address = entry.address.clamp_to_zoom(self.config.max_level);
            if address.zoom < self.config.min_level {
                trace!(tile = %address, min_level = self.config.min_level, "Below minimum level");
                summary.skipped += 1;
                continue;
            }
            wanted.push(address, entry.priority);
            origins.push((address != entry.address).then_some(entry.address));
        }
        self.skipped_below_min += summary.skipped as u64;
        if summary.skipped > 0 {
            debug!(
                layer = %self.config.name,
                skipped = summary.skipped,
                "Skipped wishlist entries below minimum level"
            );
        }

        summary.pruned = self.scheduler.prune(&wanted);

        let resolution = self.decoder.resolution();
        for (entry, origin) in wanted.iter().zip(origins) {
            if self.cache.touch(&entry.address) {
                summary.cached += 1;
                continue;
            }
            let url = self.template.expand(&entry.address, resolution);
            let request = ResourceRequest::new(entry.address, url, entry.priority)
                .with_metadata(RequestMetadata {
                    origin,
                    frame: self.frame,
                });
            self.scheduler.request(request);
            summary.forwarded += 1;
        }
        self.cache_touches += summary.cached as u64;

        self.scheduler.process_queue();

        debug!(
            layer = %self.config.name,
            frame = self.frame,
            forwarded = summary.forwarded,
            cached = summary.cached,
            pruned = summary.pruned,
            in_flight = self.scheduler.in_flight_len(),
            queued = self.scheduler.queued_len(),
            "Layer request"
        );
        summary
    }

    /// Applies every completion already waiting, without blocking.
    ///
    /// Returns the number of outcomes applied.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Some(completion) = self.scheduler.try_recv_completion() {
            if self.apply_completion(completion) {
                applied += 1;
            }
        }
        applied
    }

    /// Applies completions until nothing is queued or downloading.
    pub async fn settle(&mut self) {
        while let Some(outcome) = self.scheduler.next_outcome().await {
            self.apply_outcome(outcome);
        }
    }

    /// Waits for the next completion message from the scheduler.
    ///
    /// Never resolves while nothing is in flight; check
    /// [`has_in_flight`](Self::has_in_flight) first.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.scheduler.recv_completion().await
    }

    /// Applies one completion. Returns false if it was stale.
    pub fn apply_completion(&mut self, completion: Completion) -> bool {
        match self.scheduler.handle_completion(completion) {
            Some(outcome) => {
                self.apply_outcome(outcome);
                true
            }
            None => false,
        }
    }

    fn apply_outcome(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Done { address, data } => {
                self.store(address, Arc::clone(&data));
                for listener in &mut self.listeners {
                    listener.on_done(address, &data);
                }
            }
            FetchOutcome::Failed { address, error } => {
                warn!(layer = %self.config.name, tile = %address, error = %error, "Tile failed");
                for listener in &mut self.listeners {
                    listener.on_error(address, &error);
                }
            }
        }
    }

    fn store(&mut self, address: TileAddress, data: Arc<TileData>) {
        if let Some(entry) = self.cache.get_mut(&address) {
            entry.data = data;
            return;
        }
        let evicted = self.cache.set(address, LayerEntry::new(data));
        for (evicted_address, entry) in evicted {
            if entry.is_referenced() {
                debug!(
                    tile = %evicted_address,
                    ref_count = entry.ref_count,
                    "Evicting referenced tile"
                );
            }
            self.notify_released(evicted_address);
        }
    }

    fn notify_released(&mut self, address: TileAddress) {
        self.released += 1;
        for listener in &mut self.listeners {
            listener.on_released(address);
        }
    }

    /// Finds the closest cached tile at or above `address`.
    ///
    /// Walks from `address` toward the root and returns the first cached
    /// tile, never a finer one. The match's reference count is incremented;
    /// release it with [`decrease_ref_count`](Self::decrease_ref_count).
    pub fn best_available_match(&mut self, address: &TileAddress) -> Option<TileMatch> {
        for candidate in address.ancestors(true) {
            if let Some(entry) = self.cache.get_mut(&candidate) {
                entry.ref_count = entry.ref_count.saturating_add(1);
                return Some(TileMatch {
                    address: candidate,
                    data: Arc::clone(&entry.data),
                });
            }
        }
        None
    }

    /// Adds a reference to a cached tile; returns the new count.
    pub fn increase_ref_count(&mut self, address: &TileAddress) -> Option<u32> {
        let entry = self.cache.get_mut(address)?;
        entry.ref_count = entry.ref_count.saturating_add(1);
        Some(entry.ref_count)
    }

    /// Drops a reference to a cached tile; returns the new count.
    ///
    /// Under [`ReleasePolicy::Immediate`] a tile whose count reaches zero is
    /// removed and reported as released.
    pub fn decrease_ref_count(&mut self, address: &TileAddress) -> Option<u32> {
        let entry = self.cache.get_mut(address)?;
        if entry.ref_count == 0 {
            warn!(tile = %address, "Reference count already zero");
            return Some(0);
        }
        entry.ref_count -= 1;
        let count = entry.ref_count;

        if count == 0 && self.config.release_policy == ReleasePolicy::Immediate {
            self.cache.remove(address);
            trace!(tile = %address, "Released unreferenced tile");
            self.notify_released(*address);
        }
        Some(count)
    }

    /// Cancels any queued or running download for `address`.
    pub fn cancel(&mut self, address: &TileAddress) -> bool {
        self.scheduler.cancel(address)
    }

    /// Cancels all downloads and releases every cached tile.
    pub fn dispose(&mut self) {
        self.scheduler.dispose();
        let addresses: Vec<TileAddress> = self.cache.keys().copied().collect();
        self.cache.clear();
        for address in addresses {
            self.notify_released(address);
        }
        info!(layer = %self.config.name, "Layer disposed");
    }
}

// =============================================================================
// Tests
// =============================================================================
