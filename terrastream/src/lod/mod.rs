//! Level-of-detail selection
//!
//! Turns a camera into a [`Wishlist`]: the set of tiles that should currently
//! be resident, each at the coarsest resolution whose projected size stays
//! under the configured error threshold.
//!
//! # Example
//!
//! ```ignore
//! use terrastream::lod::{Camera, LodConfig, LodSelector};
//!
//! let mut selector = LodSelector::new(LodConfig::default().with_levels(0, 14));
//! let wishlist = selector.select(&camera);
//! for entry in &wishlist {
//!     println!("{} (priority {:.2})", entry.address, entry.priority);
//! }
//! ```

mod camera;
mod config;
mod selector;
mod wishlist;

pub use camera::{Camera, DEFAULT_FOV_Y_DEGREES};
pub use config::{
    LodConfig, DEFAULT_ERROR_THRESHOLD, DEFAULT_MAX_HEIGHT, DEFAULT_MAX_LEVEL, DEFAULT_MIN_HEIGHT,
    DEFAULT_MIN_LEVEL, DEFAULT_VOLUME_CACHE_LIMIT, DISTANCE_EPSILON,
};
pub use selector::{LodSelector, SelectionStats};
pub use wishlist::{Wishlist, WishlistEntry};
