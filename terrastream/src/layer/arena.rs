//! Renderer-side resource storage.
//!
//! Layers only hold decoded tile data. Whatever the renderer derives from it
//! (GPU textures, meshes) lives in a [`ResourceArena`], keyed by layer and
//! address, and follows the layer's events.

use super::entry::LayerId;
use super::listener::LayerEvent;
use crate::coord::TileAddress;
use crate::decode::TileData;
use std::collections::HashMap;
use std::sync::Arc;

/// Resources keyed by `(layer, tile)`.
#[derive(Debug)]
pub struct ResourceArena<R> {
    resources: HashMap<(LayerId, TileAddress), R>,
}

impl<R> Default for ResourceArena<R> {
    fn default() -> Self {
        Self {
            resources: HashMap::new(),
        }
    }
}

impl<R> ResourceArena<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Stores a resource, returning the one it replaced.
    pub fn insert(&mut self, layer: LayerId, address: TileAddress, resource: R) -> Option<R> {
        self.resources.insert((layer, address), resource)
    }

    pub fn get(&self, layer: LayerId, address: &TileAddress) -> Option<&R> {
        self.resources.get(&(layer, *address))
    }

    pub fn get_mut(&mut self, layer: LayerId, address: &TileAddress) -> Option<&mut R> {
        self.resources.get_mut(&(layer, *address))
    }

    pub fn contains(&self, layer: LayerId, address: &TileAddress) -> bool {
        self.resources.contains_key(&(layer, *address))
    }

    pub fn remove(&mut self, layer: LayerId, address: &TileAddress) -> Option<R> {
        self.resources.remove(&(layer, *address))
    }

    /// Drops every resource belonging to `layer`; returns how many went.
    pub fn remove_layer(&mut self, layer: LayerId) -> usize {
        let before = self.resources.len();
        self.resources.retain(|(owner, _), _| *owner != layer);
        before - self.resources.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LayerId, TileAddress, &R)> {
        self.resources
            .iter()
            .map(|((layer, address), resource)| (*layer, *address, resource))
    }

    /// Mirrors a layer event: builds a resource on `Done`, drops it on
    /// `Released`. Failures leave the arena untouched.
    pub fn apply<F>(&mut self, layer: LayerId, event: &LayerEvent, mut build: F)
    where
        F: FnMut(&Arc<TileData>) -> R,
    {
        match event {
            LayerEvent::Done { address, data } => {
                self.resources.insert((layer, *address), build(data));
            }
            LayerEvent::Released { address } => {
                self.resources.remove(&(layer, *address));
            }
            LayerEvent::Failed { .. } => {}
        }
    }
}
