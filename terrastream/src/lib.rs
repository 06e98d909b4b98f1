//! Terrastream - Quadtree tile streaming for virtual globes
//!
//! This library decides which map tiles a camera needs and keeps them
//! downloaded: a level-of-detail selector turns the camera into a prioritized
//! wishlist of quadtree tiles, and each layer fetches, decodes and caches the
//! tiles on that list while pruning work the camera no longer needs.
//!
//! # High-Level API
//!
//! ```ignore
//! use terrastream::layer::{Layer, LayerConfig, LayerId};
//! use terrastream::lod::{Camera, LodConfig, LodSelector};
//! use terrastream::provider::AsyncReqwestClient;
//!
//! let mut selector = LodSelector::new(LodConfig::default());
//! let config = LayerConfig::imagery("osm", "https://tile.example.org/{z}/{x}/{y}.png");
//! let mut layer = Layer::new(LayerId(0), config, Arc::new(AsyncReqwestClient::new()?))?;
//!
//! // Once per frame
//! let wishlist = selector.select(&camera);
//! layer.request(&wishlist);
//! layer.poll();
//! let tile = layer.best_available_match(&wanted);
//! ```

pub mod cache;
pub mod config;
pub mod coord;
pub mod decode;
pub mod geodesy;
pub mod layer;
pub mod loader;
pub mod lod;
pub mod logging;
pub mod provider;
pub mod visibility;

/// Version of the terrastream library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
