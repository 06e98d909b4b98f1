//! Recursive quadtree selection driven by visibility and screen size.

use super::camera::Camera;
use super::config::{LodConfig, DISTANCE_EPSILON};
use super::wishlist::{Wishlist, WishlistEntry};
use crate::coord::{TileAddress, MAX_ZOOM};
use crate::geodesy::{tile_bounding_sphere, BoundingSphere};
use crate::visibility::Frustum;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Counters from the most recent [`LodSelector::select`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionStats {
    /// Tiles whose bounding volume was tested
    pub visited: usize,
    /// Tiles pruned by the frustum test
    pub culled: usize,
    /// Tiles placed in the wishlist
    pub emitted: usize,
}

/// Walks the quadtree from the root and picks, for every visible region, the
/// coarsest tile whose projected size is under the error threshold.
///
/// Bounding spheres depend only on the address and the configured datum,
/// projection and height range, so they are kept between calls.
pub struct LodSelector {
    config: LodConfig,
    volumes: HashMap<TileAddress, BoundingSphere>,
    last_stats: SelectionStats,
}

impl LodSelector {
    pub fn new(config: LodConfig) -> Self {
        Self {
            config,
            volumes: HashMap::new(),
            last_stats: SelectionStats::default(),
        }
    }

    pub fn config(&self) -> &LodConfig {
        &self.config
    }

    pub fn last_stats(&self) -> SelectionStats {
        self.last_stats
    }

    /// Produces the wishlist for `camera`.
    ///
    /// The result is an antichain: no emitted tile includes another.
    pub fn select(&mut self, camera: &Camera) -> Wishlist {
        if self.volumes.len() > self.config.volume_cache_limit {
            trace!(cached = self.volumes.len(), "Resetting bounding volume cache");
            self.volumes.clear();
        }

        let frustum = camera.frustum();
        let mut stats = SelectionStats::default();
        let mut entries = Vec::new();
        self.visit(TileAddress::ROOT, camera, &frustum, &mut entries, &mut stats);

        stats.emitted = entries.len();
        self.last_stats = stats;
        debug!(
            visited = stats.visited,
            culled = stats.culled,
            emitted = stats.emitted,
            "LOD selection complete"
        );

        Wishlist::from(entries)
    }

    fn visit(
        &mut self,
        address: TileAddress,
        camera: &Camera,
        frustum: &Frustum,
        out: &mut Vec<WishlistEntry>,
        stats: &mut SelectionStats,
    ) {
        stats.visited += 1;

        let sphere = self.bounding_volume(&address);
        if !frustum.is_visible(&sphere) {
            stats.culled += 1;
            return;
        }

        let size = self.screen_size(&address, &sphere, camera);
        let at_floor = address.zoom >= self.config.min_level.min(self.config.max_level);
        let at_ceiling = address.zoom >= self.config.max_level || address.zoom >= MAX_ZOOM;

        if at_floor && (size < self.config.error_threshold || at_ceiling) {
            out.push(WishlistEntry::new(address, Self::priority(&address, size)));
            return;
        }

        for child in address.children() {
            self.visit(child, camera, frustum, out, stats);
        }
    }

    /// Returns the (cached) bounding sphere of a tile.
    pub fn bounding_volume(&mut self, address: &TileAddress) -> BoundingSphere {
        let config = &self.config;
        *self.volumes.entry(*address).or_insert_with(|| {
            tile_bounding_sphere(
                &config.ellipsoid,
                config.scheme,
                address,
                config.min_height,
                config.max_height,
            )
        })
    }

    /// Estimates the tile's projected size in clip-space units.
    ///
    /// The physical width is the datum circumference divided by the tile
    /// stride, shrunk by `cos(latitude)` for meridian convergence, and is
    /// projected at `max(distance - radius / 2, epsilon)` from the camera.
    pub fn screen_size(&self, address: &TileAddress, sphere: &BoundingSphere, camera: &Camera) -> f64 {
        let (_, latitude) = self.config.scheme.tile_rect(address).center();
        let width = self.config.ellipsoid.circumference() / f64::from(address.tile_stride())
            * latitude.cos().abs();

        let distance =
            (sphere.distance_to_center(camera.position()) - sphere.radius * 0.5).max(DISTANCE_EPSILON);

        width * camera.focal_length() / distance
    }

    /// Coarser tiles first; within a level, larger on-screen tiles first.
    fn priority(address: &TileAddress, size: f64) -> f64 {
        f64::from(MAX_ZOOM - address.zoom.min(MAX_ZOOM)) + size.clamp(0.0, 0.999)
    }
}
