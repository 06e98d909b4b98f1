//! Cached tiles and layer identity.

use crate::coord::TileAddress;
use crate::decode::TileData;
use std::fmt;
use std::sync::Arc;

/// Identifies a layer within a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u32);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer-{}", self.0)
    }
}

/// A decoded tile held by a layer's cache.
#[derive(Debug, Clone)]
pub struct LayerEntry {
    pub data: Arc<TileData>,
    /// Outstanding references handed out by best-match lookups.
    pub ref_count: u32,
}

impl LayerEntry {
    pub fn new(data: Arc<TileData>) -> Self {
        Self { data, ref_count: 0 }
    }

    pub fn is_referenced(&self) -> bool {
        self.ref_count > 0
    }
}

/// Result of a best-available-match lookup.
#[derive(Debug, Clone)]
pub struct TileMatch {
    /// Address of the tile found; equal to or an ancestor of the one asked for.
    pub address: TileAddress,
    pub data: Arc<TileData>,
}

impl TileMatch {
    /// Levels between the requested tile and the match.
    pub fn zoom_delta(&self, requested: &TileAddress) -> u8 {
        requested.zoom.saturating_sub(self.address.zoom)
    }
}
