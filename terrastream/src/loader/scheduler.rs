//! Concurrency-capped fetch scheduler.
//!
//! The [`FetchScheduler`] owns the pending queue and the set of in-flight
//! downloads for one layer:
//!
//! ```text
//! ResourceRequest ──► ┌─────────────┐
//!                     │ In flight?  │──► yes ──► AlreadyInFlight
//!                     └──────┬──────┘
//!                            ▼
//!                     ┌─────────────┐
//!                     │ RequestQueue│──► merge / enqueue
//!                     └──────┬──────┘
//!                            │ process_queue (while in_flight < max)
//!                            ▼
//!                     ┌─────────────┐
//!                     │ fetch task  │──► GET + decode ──► Completion
//!                     └─────────────┘
//! ```
//!
//! Fetch tasks report back over a channel. Every dispatch carries a ticket;
//! a completion whose ticket no longer matches the in-flight entry belongs to
//! a cancelled or superseded fetch and is dropped.
//!
//! All state is owned by the caller (`&mut self`). Dispatching spawns onto
//! the runtime captured at construction, or the current one when none was.
//! A fetch task that panics still reports back, as a failed outcome.

use super::queue::RequestQueue;
use super::request::{
    Completion, FetchError, FetchOutcome, RequestOutcome, ResourceRequest,
};
use crate::coord::TileAddress;
use crate::decode::TileDecoder;
use crate::lod::Wishlist;
use crate::provider::AsyncHttpClient;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

// =============================================================================
// Configuration
// =============================================================================

/// Default number of simultaneous downloads per scheduler.
pub const DEFAULT_MAX_CONCURRENT: usize = 6;

/// Scheduler tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum number of fetches in flight at once (minimum 1).
    pub max_concurrent: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

impl SchedulerConfig {
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }
}

/// Scheduler counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub requested: u64,
    pub merged: u64,
    pub ignored: u64,
    pub dispatched: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub pruned: u64,
    pub stale: u64,
    /// Requests waiting right now
    pub queued: usize,
    /// Fetches running right now
    pub in_flight: usize,
}

// =============================================================================
// Fetch Scheduler
// =============================================================================

struct InFlight {
    ticket: u64,
    token: CancellationToken,
    request: ResourceRequest,
}

/// Deduplicating, priority-ordered download scheduler.
pub struct FetchScheduler<C: AsyncHttpClient> {
    client: Arc<C>,
    decoder: Arc<dyn TileDecoder>,
    config: SchedulerConfig,
    queue: RequestQueue,
    in_flight: HashMap<TileAddress, InFlight>,
    next_ticket: u64,
    parent: CancellationToken,
    root: CancellationToken,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    runtime: Option<Handle>,
    stats: SchedulerStats,
}

impl<C: AsyncHttpClient> FetchScheduler<C> {
    pub fn new(client: Arc<C>, decoder: Arc<dyn TileDecoder>, config: SchedulerConfig) -> Self {
        Self::with_parent(client, decoder, config, &CancellationToken::new())
    }

    /// Creates a scheduler whose fetches are cancelled when `parent` is.
    ///
    /// When called inside a Tokio runtime, fetches are spawned onto that
    /// runtime from then on, even if later calls come from a plain thread.
    pub fn with_parent(
        client: Arc<C>,
        decoder: Arc<dyn TileDecoder>,
        config: SchedulerConfig,
        parent: &CancellationToken,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let config = SchedulerConfig {
            max_concurrent: config.max_concurrent.max(1),
        };
        Self {
            client,
            decoder,
            config,
            queue: RequestQueue::new(),
            in_flight: HashMap::new(),
            next_ticket: 0,
            parent: parent.clone(),
            root: parent.child_token(),
            completion_tx,
            completion_rx,
            runtime: Handle::try_current().ok(),
            stats: SchedulerStats::default(),
        }
    }

    /// Spawns fetches onto `runtime` instead of the caller's runtime.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_queued(&self, address: &TileAddress) -> bool {
        self.queue.contains(address)
    }

    pub fn is_in_flight(&self, address: &TileAddress) -> bool {
        self.in_flight.contains_key(address)
    }

    /// True when nothing is queued or downloading.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.in_flight.is_empty()
    }

    /// Priority of a queued request.
    pub fn queued_priority(&self, address: &TileAddress) -> Option<f64> {
        self.queue.get(address).map(|r| r.priority)
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            queued: self.queue.len(),
            in_flight: self.in_flight.len(),
            ..self.stats
        }
    }

    /// Queues a request without dispatching it.
    ///
    /// Call [`process_queue`](Self::process_queue) afterwards to start
    /// downloads.
    pub fn request(&mut self, request: ResourceRequest) -> RequestOutcome {
        self.stats.requested += 1;

        if self.in_flight.contains_key(&request.address) {
            self.stats.ignored += 1;
            trace!(tile = %request.address, "Request ignored, already in flight");
            return RequestOutcome::AlreadyInFlight;
        }

        let address = request.address;
        let priority = request.priority;
        if self.queue.push(request) {
            self.stats.merged += 1;
            trace!(tile = %address, priority, "Request merged");
            RequestOutcome::Merged
        } else {
            trace!(tile = %address, priority, "Request queued");
            RequestOutcome::Enqueued
        }
    }

    /// Dispatches queued requests until the concurrency cap is reached.
    ///
    /// Returns the number of fetches started.
    ///
    /// # Panics
    ///
    /// Panics if a fetch must be started, no runtime was captured at
    /// construction, and the caller is outside a Tokio runtime.
    pub fn process_queue(&mut self) -> usize {
        let mut started = 0;
        while self.in_flight.len() < self.config.max_concurrent {
            let Some(request) = self.queue.pop() else {
                break;
            };
            self.dispatch(request);
            started += 1;
        }
        debug_assert!(self.in_flight.len() <= self.config.max_concurrent);
        started
    }

    fn dispatch(&mut self, request: ResourceRequest) {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let address = request.address;
        let token = self.root.child_token();

        debug!(
            tile = %address,
            priority = request.priority,
            in_flight = self.in_flight.len() + 1,
            "Dispatching fetch"
        );

        let client = Arc::clone(&self.client);
        let decoder = Arc::clone(&self.decoder);
        let tx = self.completion_tx.clone();
        let url = request.url.clone();
        let task_token = token.clone();

        let fetch = async move {
            let body = tokio::select! {
                biased;
                _ = task_token.cancelled() => return None,
                body = client.get(&url) => body,
            };

            let result = body
                .map_err(FetchError::from)
                .and_then(|body| decoder.decode(address, body).map_err(FetchError::from))
                .map(Arc::new);

            if task_token.is_cancelled() {
                return None;
            }
            Some(result)
        };

        let task = async move {
            let result = match AssertUnwindSafe(fetch).catch_unwind().await {
                Ok(Some(result)) => result,
                Ok(None) => return,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(tile = %address, message = %message, "Fetch task panicked");
                    Err(FetchError::Panicked(message))
                }
            };
            // The receiver is gone only once the scheduler itself is dropped
            let _ = tx.send(Completion {
                ticket,
                address,
                result,
            });
        };

        match &self.runtime {
            Some(runtime) => {
                runtime.spawn(task);
            }
            None => {
                tokio::spawn(task);
            }
        }

        self.stats.dispatched += 1;
        self.in_flight.insert(
            address,
            InFlight {
                ticket,
                token,
                request,
            },
        );
    }

    /// Waits for the next completion message from a fetch task.
    ///
    /// Pending forever when nothing is in flight; callers select on it
    /// alongside other work or guard with [`in_flight_len`](Self::in_flight_len).
    pub async fn recv_completion(&mut self) -> Option<Completion> {
        self.completion_rx.recv().await
    }

    /// Returns a completion that is already waiting, without blocking.
    pub fn try_recv_completion(&mut self) -> Option<Completion> {
        self.completion_rx.try_recv().ok()
    }

    /// Settles one completion.
    ///
    /// Stale completions yield `None`. Otherwise the slot is released, the
    /// queue is drained again and the outcome is returned.
    pub fn handle_completion(&mut self, completion: Completion) -> Option<FetchOutcome> {
        let Completion {
            ticket,
            address,
            result,
        } = completion;

        let current = self
            .in_flight
            .get(&address)
            .is_some_and(|entry| entry.ticket == ticket);
        if !current {
            self.stats.stale += 1;
            trace!(tile = %address, ticket, "Dropping stale completion");
            return None;
        }

        self.in_flight.remove(&address);
        let outcome = match result {
            Ok(data) => {
                self.stats.completed += 1;
                debug!(tile = %address, bytes = data.byte_size(), "Fetch complete");
                FetchOutcome::Done { address, data }
            }
            Err(error) => {
                self.stats.failed += 1;
                debug!(tile = %address, error = %error, "Fetch failed");
                FetchOutcome::Failed { address, error }
            }
        };

        self.process_queue();
        Some(outcome)
    }

    /// Waits for the next non-stale outcome.
    ///
    /// Returns `None` once nothing is in flight.
    pub async fn next_outcome(&mut self) -> Option<FetchOutcome> {
        while !self.in_flight.is_empty() {
            let completion = self.completion_rx.recv().await?;
            if let Some(outcome) = self.handle_completion(completion) {
                return Some(outcome);
            }
        }
        None
    }

    /// Drops a queued request and cancels an in-flight fetch for `address`.
    ///
    /// Returns true if anything was removed.
    pub fn cancel(&mut self, address: &TileAddress) -> bool {
        let queued = self.queue.remove(address).is_some();
        let running = match self.in_flight.remove(address) {
            Some(entry) => {
                entry.token.cancel();
                true
            }
            None => false,
        };

        if queued || running {
            self.stats.cancelled += 1;
            debug!(tile = %address, queued, running, "Fetch cancelled");
            self.process_queue();
        }
        queued || running
    }

    /// Drops every request the wishlist no longer covers.
    ///
    /// A request survives when its address is an ancestor of, or equal to,
    /// some wishlist address. Returns the number of requests removed.
    pub fn prune(&mut self, wishlist: &Wishlist) -> usize {
        let dropped = self.queue.retain(|r| wishlist.covers(&r.address)).len();

        let stale: Vec<TileAddress> = self
            .in_flight
            .keys()
            .filter(|address| !wishlist.covers(address))
            .copied()
            .collect();
        for address in &stale {
            if let Some(entry) = self.in_flight.remove(address) {
                entry.token.cancel();
                trace!(tile = %address, url = %entry.request.url, "Pruned in-flight fetch");
            }
        }

        let removed = dropped + stale.len();
        if removed > 0 {
            self.stats.pruned += removed as u64;
            debug!(
                queued = dropped,
                in_flight = stale.len(),
                "Pruned requests outside wishlist"
            );
        }
        self.process_queue();
        removed
    }

    /// Cancels all fetches and clears the queue.
    ///
    /// The scheduler stays usable; later requests get fresh tokens.
    pub fn dispose(&mut self) {
        let cancelled = self.in_flight.len() + self.queue.len();
        self.root.cancel();
        self.in_flight.clear();
        self.queue.clear();
        self.stats.cancelled += cancelled as u64;
        self.root = self.parent.child_token();
        debug!(cancelled, "Scheduler disposed");
    }

    /// Iterates in-flight requests in arbitrary order.
    pub fn in_flight(&self) -> impl Iterator<Item = &ResourceRequest> {
        self.in_flight.values().map(|entry| &entry.request)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl<C: AsyncHttpClient> Drop for FetchScheduler<C> {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{DecodeError, ElevationDecoder, ImageryDecoder, ResourceKind, TileData};
    use crate::provider::{GatedHttpClient, MockAsyncHttpClient};
    use bytes::Bytes;
    use std::time::Duration;

    fn url(address: &TileAddress) -> String {
        format!("http://t/{}/{}/{}", address.zoom, address.x, address.y)
    }

    fn req(x: u32, y: u32, zoom: u8, priority: f64) -> ResourceRequest {
        let address = TileAddress::new(x, y, zoom);
        ResourceRequest::new(address, url(&address), priority)
    }

    fn gated(max: usize) -> (Arc<GatedHttpClient>, FetchScheduler<GatedHttpClient>) {
        let mut client = GatedHttpClient::new();
        for zoom in 0..6u8 {
            for x in 0..8 {
                for y in 0..8 {
                    let address = TileAddress::new(x, y, zoom);
                    client = client.with_response(&url(&address), vec![1u8, 2, 3]);
                }
            }
        }
        let client = Arc::new(client);
        let scheduler = FetchScheduler::new(
            Arc::clone(&client),
            Arc::new(ImageryDecoder::new(256)),
            SchedulerConfig::default().with_max_concurrent(max),
        );
        (client, scheduler)
    }

    async fn wait_started(client: &GatedHttpClient, n: usize) {
        for _ in 0..100 {
            if client.started().len() >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {} fetches to start, saw {}", n, client.started().len());
    }

    #[tokio::test]
    async fn test_enqueue_and_dispatch() {
        let (_, mut scheduler) = gated(2);
        assert_eq!(scheduler.request(req(0, 0, 1, 1.0)), RequestOutcome::Enqueued);
        assert_eq!(scheduler.queued_len(), 1);
        assert_eq!(scheduler.process_queue(), 1);
        assert_eq!(scheduler.queued_len(), 0);
        assert_eq!(scheduler.in_flight_len(), 1);
    }

    #[tokio::test]
    async fn test_in_flight_request_ignored() {
        let (_, mut scheduler) = gated(2);
        scheduler.request(req(0, 0, 1, 1.0));
        scheduler.process_queue();

        assert_eq!(
            scheduler.request(req(0, 0, 1, 9.0)),
            RequestOutcome::AlreadyInFlight
        );
        assert_eq!(scheduler.queued_len(), 0);
        assert_eq!(scheduler.stats().ignored, 1);
    }

    #[tokio::test]
    async fn test_duplicate_request_merges_to_max_priority() {
        let (_, mut scheduler) = gated(1);
        scheduler.request(req(0, 0, 1, 1.0));
        scheduler.process_queue();

        let b = TileAddress::new(1, 1, 1);
        assert_eq!(scheduler.request(req(1, 1, 1, 1.0)), RequestOutcome::Enqueued);
        assert_eq!(scheduler.request(req(1, 1, 1, 3.0)), RequestOutcome::Merged);
        assert_eq!(scheduler.request(req(1, 1, 1, 2.0)), RequestOutcome::Merged);

        assert_eq!(scheduler.queued_len(), 1);
        assert_eq!(scheduler.queued_priority(&b), Some(3.0));
        assert_eq!(scheduler.stats().merged, 2);
    }

    #[tokio::test]
    async fn test_cap_never_exceeded() {
        let (client, mut scheduler) = gated(2);
        for x in 0..5 {
            scheduler.request(req(x, 0, 3, x as f64));
        }
        scheduler.process_queue();
        assert_eq!(scheduler.in_flight_len(), 2);
        assert_eq!(scheduler.queued_len(), 3);

        let mut finished = 0;
        while finished < 5 {
            client.release(1);
            let outcome = scheduler.next_outcome().await.unwrap();
            assert!(outcome.is_done());
            assert!(scheduler.in_flight_len() <= 2);
            finished += 1;
        }
        assert!(scheduler.is_idle());
        assert_eq!(scheduler.stats().completed, 5);
    }

    #[tokio::test]
    async fn test_highest_priority_dispatched_next() {
        let (client, mut scheduler) = gated(1);
        scheduler.request(req(0, 0, 2, 0.0));
        scheduler.process_queue();
        wait_started(&client, 1).await;

        scheduler.request(req(1, 0, 2, 1.0));
        scheduler.request(req(2, 0, 2, 5.0));
        scheduler.request(req(3, 0, 2, 5.0));

        client.release(1);
        scheduler.next_outcome().await.unwrap();
        wait_started(&client, 2).await;
        assert_eq!(client.started()[1], "http://t/2/2/0");

        client.release(1);
        scheduler.next_outcome().await.unwrap();
        wait_started(&client, 3).await;
        assert_eq!(client.started()[2], "http://t/2/3/0");
    }

    #[tokio::test]
    async fn test_cancel_in_flight_frees_slot() {
        let (_, mut scheduler) = gated(1);
        let a = TileAddress::new(0, 0, 1);
        scheduler.request(req(0, 0, 1, 1.0));
        scheduler.process_queue();
        scheduler.request(req(1, 0, 1, 1.0));

        assert!(scheduler.cancel(&a));
        assert!(!scheduler.is_in_flight(&a));
        assert!(scheduler.is_in_flight(&TileAddress::new(1, 0, 1)));
        assert_eq!(scheduler.stats().cancelled, 1);
        assert!(!scheduler.cancel(&a));
    }

    #[tokio::test]
    async fn test_cancel_queued() {
        let (_, mut scheduler) = gated(1);
        scheduler.request(req(0, 0, 1, 1.0));
        scheduler.process_queue();
        scheduler.request(req(1, 0, 1, 1.0));

        assert!(scheduler.cancel(&TileAddress::new(1, 0, 1)));
        assert_eq!(scheduler.queued_len(), 0);
        assert_eq!(scheduler.in_flight_len(), 1);
    }

    #[tokio::test]
    async fn test_prune_keeps_ancestors_and_drops_the_rest() {
        let (_, mut scheduler) = gated(2);
        // In flight: an ancestor of the wanted tile and an unrelated tile
        scheduler.request(req(1, 1, 2, 9.0));
        scheduler.request(req(3, 0, 2, 8.0));
        scheduler.process_queue();
        // Queued: the root-ward ancestor, a descendant and an unrelated tile
        scheduler.request(req(0, 0, 1, 1.0));
        scheduler.request(req(5, 5, 4, 1.0));
        scheduler.request(req(0, 3, 2, 1.0));

        let mut wishlist = Wishlist::new();
        wishlist.push(TileAddress::new(2, 2, 3), 27.5);

        let removed = scheduler.prune(&wishlist);
        assert_eq!(removed, 3);

        assert!(scheduler.is_in_flight(&TileAddress::new(1, 1, 2)));
        assert!(!scheduler.is_in_flight(&TileAddress::new(3, 0, 2)));
        assert!(!scheduler.is_queued(&TileAddress::new(5, 5, 4)));
        assert!(!scheduler.is_queued(&TileAddress::new(0, 3, 2)));
        // The freed slot went to the surviving ancestor
        assert!(scheduler.is_in_flight(&TileAddress::new(0, 0, 1)));
        assert_eq!(scheduler.stats().pruned, 3);
    }

    #[tokio::test]
    async fn test_pruned_fetch_reports_nothing() {
        let (client, mut scheduler) = gated(1);
        scheduler.request(req(3, 3, 2, 1.0));
        scheduler.process_queue();
        wait_started(&client, 1).await;

        scheduler.prune(&Wishlist::new());
        client.release(1);
        assert!(scheduler.next_outcome().await.is_none());
        assert_eq!(scheduler.stats().completed, 0);
    }

    #[tokio::test]
    async fn test_stale_completion_dropped() {
        let (_, mut scheduler) = gated(1);
        let a = TileAddress::new(0, 0, 1);
        scheduler.request(req(0, 0, 1, 1.0));
        scheduler.process_queue();

        let stale = Completion {
            ticket: 999,
            address: a,
            result: Err(DecodeError::EmptyPayload(a).into()),
        };
        assert!(scheduler.handle_completion(stale).is_none());
        assert!(scheduler.is_in_flight(&a));
        assert_eq!(scheduler.stats().stale, 1);
    }

    #[tokio::test]
    async fn test_network_failure_outcome() {
        let client = Arc::new(MockAsyncHttpClient::default());
        let mut scheduler = FetchScheduler::new(
            client,
            Arc::new(ImageryDecoder::new(256)),
            SchedulerConfig::default(),
        );
        scheduler.request(req(0, 0, 1, 1.0));
        scheduler.process_queue();

        match scheduler.next_outcome().await {
            Some(FetchOutcome::Failed {
                error: FetchError::Network(e),
                ..
            }) => assert_eq!(e.status_code(), Some(404)),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(scheduler.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_elevation_length_mismatch_is_decode_failure() {
        let address = TileAddress::new(0, 0, 1);
        let client =
            Arc::new(MockAsyncHttpClient::default().with_response(&url(&address), vec![0u8; 5]));
        let mut scheduler = FetchScheduler::new(
            client,
            Arc::new(ElevationDecoder::new(2)),
            SchedulerConfig::default(),
        );
        scheduler.request(ResourceRequest::new(address, url(&address), 1.0));
        scheduler.process_queue();

        match scheduler.next_outcome().await {
            Some(FetchOutcome::Failed {
                error: FetchError::Decode(DecodeError::DataCorruption { expected, actual, .. }),
                ..
            }) => {
                assert_eq!(expected, 8);
                assert_eq!(actual, 5);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispose_clears_everything() {
        let (client, mut scheduler) = gated(2);
        for x in 0..4 {
            scheduler.request(req(x, 0, 2, 1.0));
        }
        scheduler.process_queue();
        scheduler.dispose();

        assert!(scheduler.is_idle());
        client.release(4);
        assert!(scheduler.next_outcome().await.is_none());

        // Still usable afterwards
        scheduler.request(req(0, 0, 2, 1.0));
        assert_eq!(scheduler.process_queue(), 1);
    }

    #[tokio::test]
    async fn test_next_outcome_none_when_idle() {
        let (_, mut scheduler) = gated(1);
        assert!(scheduler.next_outcome().await.is_none());
    }

    /// Panics while decoding every payload.
    struct PanickingDecoder;

    impl TileDecoder for PanickingDecoder {
        fn kind(&self) -> ResourceKind {
            ResourceKind::Imagery
        }

        fn resolution(&self) -> u32 {
            256
        }

        fn decode(&self, address: TileAddress, _body: Bytes) -> Result<TileData, DecodeError> {
            panic!("decoder exploded on {}", address);
        }
    }

    #[tokio::test]
    async fn test_panicking_fetch_fails_and_frees_slot() {
        let mut client = MockAsyncHttpClient::default();
        for x in 0..2 {
            let address = TileAddress::new(x, 0, 1);
            client = client.with_response(&url(&address), vec![1u8, 2, 3]);
        }
        let mut scheduler = FetchScheduler::new(
            Arc::new(client),
            Arc::new(PanickingDecoder),
            SchedulerConfig::default().with_max_concurrent(1),
        );
        scheduler.request(req(0, 0, 1, 2.0));
        scheduler.request(req(1, 0, 1, 1.0));
        scheduler.process_queue();

        let outcome = tokio::time::timeout(Duration::from_secs(2), scheduler.next_outcome())
            .await
            .expect("panicked fetch never reported back");
        match outcome {
            Some(FetchOutcome::Failed {
                address,
                error: FetchError::Panicked(message),
            }) => {
                assert_eq!(address, TileAddress::new(0, 0, 1));
                assert!(message.contains("decoder exploded"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        // The slot went to the queued request
        assert!(scheduler.is_in_flight(&TileAddress::new(1, 0, 1)));
        assert_eq!(scheduler.queued_len(), 0);

        let second = tokio::time::timeout(Duration::from_secs(2), scheduler.next_outcome())
            .await
            .expect("second fetch never reported back");
        assert!(matches!(
            second,
            Some(FetchOutcome::Failed {
                error: FetchError::Panicked(_),
                ..
            })
        ));
        assert!(scheduler.is_idle());
        assert_eq!(scheduler.stats().failed, 2);
    }

    #[test]
    fn test_dispatch_from_thread_outside_runtime() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let address = TileAddress::new(0, 0, 1);
        let client = Arc::new(
            MockAsyncHttpClient::default().with_response(&url(&address), vec![7u8; 4]),
        );
        let mut scheduler = FetchScheduler::new(
            client,
            Arc::new(ImageryDecoder::new(256)),
            SchedulerConfig::default(),
        )
        .with_runtime(runtime.handle().clone());

        // No runtime context on this thread
        assert!(Handle::try_current().is_err());
        scheduler.request(req(0, 0, 1, 1.0));
        assert_eq!(scheduler.process_queue(), 1);

        let outcome = runtime.block_on(scheduler.next_outcome());
        assert!(matches!(outcome, Some(FetchOutcome::Done { .. })));
    }

    #[test]
    fn test_captures_runtime_at_construction() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let address = TileAddress::new(0, 0, 1);
        let client = Arc::new(
            MockAsyncHttpClient::default().with_response(&url(&address), vec![7u8; 4]),
        );
        let mut scheduler = runtime.block_on(async {
            FetchScheduler::new(
                client,
                Arc::new(ImageryDecoder::new(256)),
                SchedulerConfig::default(),
            )
        });

        scheduler.request(req(0, 0, 1, 1.0));
        assert_eq!(scheduler.process_queue(), 1);
        let outcome = runtime.block_on(scheduler.next_outcome());
        assert!(matches!(outcome, Some(FetchOutcome::Done { .. })));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_queue_and_in_flight_disjoint(
                max in 1usize..4,
                ops in prop::collection::vec((0u32..6, 0u32..6, 0u32..10, any::<bool>()), 1..60)
            ) {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .build()
                    .unwrap();
                runtime.block_on(async {
                    let (_, mut scheduler) = gated(max);
                    for (x, y, p, cancel) in ops {
                        let address = TileAddress::new(x % 8, y % 8, 3);
                        if cancel {
                            scheduler.cancel(&address);
                        } else {
                            scheduler.request(ResourceRequest::new(address, url(&address), p as f64));
                            scheduler.process_queue();
                        }
                        assert!(scheduler.in_flight_len() <= max);
                        for r in scheduler.in_flight() {
                            assert!(!scheduler.is_queued(&r.address));
                        }
                    }
                });
            }
        }
    }
}
