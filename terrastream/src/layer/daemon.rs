//! Layer daemon for driving a layer from other tasks.
//!
//! The [`LayerDaemon`] owns one [`Layer`] on a dedicated task and is the only
//! code that touches its scheduler and cache. Producers talk to it through a
//! cloneable [`LayerHandle`]:
//!
//! ```text
//! ┌──────────────┐   LayerCommand    ┌──────────────────────────────┐
//! │ LayerHandle  │ ────────────────► │          LayerDaemon          │
//! │ (renderer,   │                   │                               │
//! │  selector)   │ ◄──── oneshot ─── │  select! { shutdown,          │
//! └──────────────┘                   │            commands,          │
//!                                    │            completions }      │
//!                                    └──────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use terrastream::layer::{Layer, LayerDaemon};
//!
//! let (daemon, handle) = LayerDaemon::new(layer, DEFAULT_COMMAND_CHANNEL_CAPACITY);
//! let shutdown = CancellationToken::new();
//! tokio::spawn(daemon.run(shutdown.clone()));
//!
//! handle.request(wishlist).await?;
//! let stats = handle.settle().await?;
//! ```

use super::entry::TileMatch;
use super::error::LayerError;
use super::tile_layer::{Layer, LayerStats};
use crate::coord::TileAddress;
use crate::lod::Wishlist;
use crate::provider::AsyncHttpClient;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

// =============================================================================
// Configuration
// =============================================================================

/// Default channel capacity for layer commands.
pub const DEFAULT_COMMAND_CHANNEL_CAPACITY: usize = 256;

/// Messages accepted by a [`LayerDaemon`].
#[derive(Debug)]
pub enum LayerCommand {
    /// Replace the layer's wishlist
    Request(Wishlist),
    /// Look up the closest cached tile and take a reference to it
    BestMatch {
        address: TileAddress,
        reply: oneshot::Sender<Option<TileMatch>>,
    },
    /// Drop a reference taken by `BestMatch`
    Release(TileAddress),
    Cancel(TileAddress),
    Stats(oneshot::Sender<LayerStats>),
    /// Reply once nothing is queued or downloading
    Settle(oneshot::Sender<LayerStats>),
}

// =============================================================================
// Layer Handle
// =============================================================================

/// Cloneable sender side of a running [`LayerDaemon`].
#[derive(Clone)]
pub struct LayerHandle {
    tx: mpsc::Sender<LayerCommand>,
    stats: Arc<Mutex<LayerStats>>,
}

impl LayerHandle {
    async fn send(&self, command: LayerCommand) -> Result<(), LayerError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| LayerError::DaemonGone)
    }

    pub async fn request(&self, wishlist: Wishlist) -> Result<(), LayerError> {
        self.send(LayerCommand::Request(wishlist)).await
    }

    pub async fn best_available_match(
        &self,
        address: TileAddress,
    ) -> Result<Option<TileMatch>, LayerError> {
        let (reply, rx) = oneshot::channel();
        self.send(LayerCommand::BestMatch { address, reply }).await?;
        rx.await.map_err(|_| LayerError::DaemonGone)
    }

    pub async fn release(&self, address: TileAddress) -> Result<(), LayerError> {
        self.send(LayerCommand::Release(address)).await
    }

    pub async fn cancel(&self, address: TileAddress) -> Result<(), LayerError> {
        self.send(LayerCommand::Cancel(address)).await
    }

    pub async fn stats(&self) -> Result<LayerStats, LayerError> {
        let (reply, rx) = oneshot::channel();
        self.send(LayerCommand::Stats(reply)).await?;
        rx.await.map_err(|_| LayerError::DaemonGone)
    }

    /// Waits until the layer has nothing queued or in flight.
    pub async fn settle(&self) -> Result<LayerStats, LayerError> {
        let (reply, rx) = oneshot::channel();
        self.send(LayerCommand::Settle(reply)).await?;
        rx.await.map_err(|_| LayerError::DaemonGone)
    }

    /// Last stats snapshot published by the daemon, without a round trip.
    pub fn latest_stats(&self) -> LayerStats {
        *self.stats.lock()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// =============================================================================
// Layer Daemon
// =============================================================================

/// Runs a [`Layer`] on its own task.
pub struct LayerDaemon<C: AsyncHttpClient> {
    layer: Layer<C>,
    commands: mpsc::Receiver<LayerCommand>,
    stats: Arc<Mutex<LayerStats>>,
    settle_waiters: Vec<oneshot::Sender<LayerStats>>,
}

impl<C: AsyncHttpClient> LayerDaemon<C> {
    /// Creates a daemon and the handle for talking to it.
    pub fn new(layer: Layer<C>, channel_capacity: usize) -> (Self, LayerHandle) {
        let (tx, commands) = mpsc::channel(channel_capacity.max(1));
        let stats = Arc::new(Mutex::new(layer.stats()));

        let handle = LayerHandle {
            tx,
            stats: Arc::clone(&stats),
        };
        let daemon = Self {
            layer,
            commands,
            stats,
            settle_waiters: Vec::new(),
        };
        (daemon, handle)
    }

    /// Runs until shutdown is signalled or every handle is dropped.
    ///
    /// On exit the layer is disposed, cancelling its downloads.
    pub async fn run(self, shutdown: CancellationToken) {
        let Self {
            mut layer,
            mut commands,
            stats,
            mut settle_waiters,
        } = self;

        info!(layer = %layer.config().name, "Layer daemon starting");

        loop {
            let waiting = layer.has_in_flight();
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!(layer = %layer.config().name, "Layer daemon shutting down");
                    break;
                }

                command = commands.recv() => {
                    match command {
                        Some(command) => {
                            Self::handle_command(&mut layer, command, &mut settle_waiters);
                        }
                        None => {
                            debug!(layer = %layer.config().name, "All layer handles dropped");
                            break;
                        }
                    }
                }

                Some(completion) = layer.next_completion(), if waiting => {
                    layer.apply_completion(completion);
                }
            }

            let snapshot = layer.stats();
            *stats.lock() = snapshot;
            if layer.is_idle() {
                for waiter in settle_waiters.drain(..) {
                    let _ = waiter.send(snapshot);
                }
            }
        }

        layer.dispose();
        *stats.lock() = layer.stats();
        info!(layer = %layer.config().name, "Layer daemon stopped");
    }

    fn handle_command(
        layer: &mut Layer<C>,
        command: LayerCommand,
        settle_waiters: &mut Vec<oneshot::Sender<LayerStats>>,
    ) {
        match command {
            LayerCommand::Request(wishlist) => {
                layer.request(&wishlist);
            }
            LayerCommand::BestMatch { address, reply } => {
                let _ = reply.send(layer.best_available_match(&address));
            }
            LayerCommand::Release(address) => {
                layer.decrease_ref_count(&address);
            }
            LayerCommand::Cancel(address) => {
                layer.cancel(&address);
            }
            LayerCommand::Stats(reply) => {
                let _ = reply.send(layer.stats());
            }
            LayerCommand::Settle(reply) => {
                settle_waiters.push(reply);
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
