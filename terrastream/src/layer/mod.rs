//! Streamed tile layers
//!
//! A [`Layer`] ties one tile source (URL template plus decoder) to a fetch
//! scheduler and a bounded cache. Feed it the selector's [`Wishlist`] every
//! frame; it keeps downloads aligned with what the camera needs and hands out
//! the best cached tile for any address.
//!
//! Layers are single-owner. To drive one from several tasks, run it inside a
//! [`LayerDaemon`] and talk to it through a [`LayerHandle`].
//!
//! [`Wishlist`]: crate::lod::Wishlist

mod arena;
mod config;
mod tile_layer;
mod daemon;
mod entry;
mod error;
mod listener;

pub use arena::ResourceArena;
pub use config::{LayerConfig, ReleasePolicy, DEFAULT_LAYER_MAX_LEVEL, DEFAULT_LAYER_MIN_LEVEL};
pub use tile_layer::{Layer, LayerStats, RequestSummary};
pub use daemon::{LayerCommand, LayerDaemon, LayerHandle, DEFAULT_COMMAND_CHANNEL_CAPACITY};
pub use entry::{LayerEntry, LayerId, TileMatch};
pub use error::LayerError;
pub use listener::{ChannelListener, LayerEvent, TileListener};
