//! Completion notifications.

use crate::coord::TileAddress;
use crate::decode::TileData;
use crate::loader::FetchError;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Receives tile lifecycle events from a layer.
///
/// Each method is called at most once per outcome. Cancelled fetches are
/// never reported.
pub trait TileListener: Send + 'static {
    /// A tile finished downloading and is now cached.
    fn on_done(&mut self, address: TileAddress, data: &Arc<TileData>);

    /// A tile failed to download or decode.
    fn on_error(&mut self, address: TileAddress, error: &FetchError);

    /// A cached tile was evicted or released.
    fn on_released(&mut self, _address: TileAddress) {}
}

/// A tile lifecycle event as a value.
#[derive(Debug, Clone)]
pub enum LayerEvent {
    Done {
        address: TileAddress,
        data: Arc<TileData>,
    },
    Failed {
        address: TileAddress,
        error: FetchError,
    },
    Released {
        address: TileAddress,
    },
}

impl LayerEvent {
    pub fn address(&self) -> TileAddress {
        match self {
            LayerEvent::Done { address, .. }
            | LayerEvent::Failed { address, .. }
            | LayerEvent::Released { address } => *address,
        }
    }
}

/// Listener forwarding every event into a channel.
///
/// Lets a consumer on another task (typically the renderer) observe a layer
/// owned by a daemon.
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<LayerEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LayerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: LayerEvent) {
        // A dropped receiver only means nobody is watching any more
        let _ = self.tx.send(event);
    }
}

impl TileListener for ChannelListener {
    fn on_done(&mut self, address: TileAddress, data: &Arc<TileData>) {
        self.send(LayerEvent::Done {
            address,
            data: Arc::clone(data),
        });
    }

    fn on_error(&mut self, address: TileAddress, error: &FetchError) {
        self.send(LayerEvent::Failed {
            address,
            error: error.clone(),
        });
    }

    fn on_released(&mut self, address: TileAddress) {
        self.send(LayerEvent::Released { address });
    }
}
