//! Core coordinate types.

use std::fmt;

/// Deepest quadtree level an address can describe.
///
/// Keeps `tile_stride()` and both coordinates inside a `u32`.
pub const MAX_ZOOM: u8 = 30;

/// Minimum latitude supported by Web Mercator (degrees).
pub const MIN_LAT: f64 = -85.05112878;

/// Maximum latitude supported by Web Mercator (degrees).
pub const MAX_LAT: f64 = 85.05112878;

/// Minimum longitude (degrees).
pub const MIN_LON: f64 = -180.0;

/// Maximum longitude (degrees).
pub const MAX_LON: f64 = 180.0;

/// A quadtree tile address.
///
/// Zoom 0 is the single tile covering the whole planet. At zoom `z` both
/// `x` and `y` lie in `[0, 2^z)`, with `y = 0` at the northern edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileAddress {
    /// Column, west to east
    pub x: u32,
    /// Row, north to south
    pub y: u32,
    /// Quadtree depth
    pub zoom: u8,
}

impl TileAddress {
    /// The zoom-0 tile.
    pub const ROOT: TileAddress = TileAddress { x: 0, y: 0, zoom: 0 };

    /// Creates an address without validation.
    #[inline]
    pub const fn new(x: u32, y: u32, zoom: u8) -> Self {
        Self { x, y, zoom }
    }

    /// Creates an address, rejecting coordinates outside the zoom's stride.
    pub fn checked(x: u32, y: u32, zoom: u8) -> Result<Self, CoordError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom));
        }
        let stride = 1u64 << zoom;
        if u64::from(x) >= stride || u64::from(y) >= stride {
            return Err(CoordError::OutOfRange { x, y, zoom });
        }
        Ok(Self { x, y, zoom })
    }

    /// Returns the enclosing tile one level up, or `None` for the root.
    #[inline]
    pub fn parent(&self) -> Option<TileAddress> {
        if self.zoom == 0 {
            return None;
        }
        Some(TileAddress {
            x: self.x >> 1,
            y: self.y >> 1,
            zoom: self.zoom - 1,
        })
    }

    /// Iterates ancestors root-ward, optionally starting with `self`.
    ///
    /// The iterator is finite and `Clone`, so it can be restarted freely.
    pub fn ancestors(&self, include_self: bool) -> Ancestors {
        Ancestors {
            next: if include_self {
                Some(*self)
            } else {
                self.parent()
            },
        }
    }

    /// Returns the `index`-th child (0..4).
    ///
    /// Index bit 0 selects the eastern half, bit 1 the southern half.
    #[inline]
    pub fn child(&self, index: u8) -> TileAddress {
        debug_assert!(index < 4, "child index out of range: {}", index);
        TileAddress {
            x: (self.x << 1) | u32::from(index & 1),
            y: (self.y << 1) | u32::from((index >> 1) & 1),
            zoom: self.zoom + 1,
        }
    }

    /// Returns the four children in `(2x,2y)`, `(2x+1,2y)`, `(2x,2y+1)`,
    /// `(2x+1,2y+1)` order.
    pub fn children(&self) -> [TileAddress; 4] {
        [self.child(0), self.child(1), self.child(2), self.child(3)]
    }

    /// Returns true if `self` is an ancestor of, or equal to, `other`.
    #[inline]
    pub fn includes(&self, other: &TileAddress) -> bool {
        if other.zoom < self.zoom {
            return false;
        }
        let delta = other.zoom - self.zoom;
        (other.x >> delta) == self.x && (other.y >> delta) == self.y
    }

    /// Ancestor-or-equal test. [`includes`](Self::includes) is already
    /// reflexive; this spelling is used where equality matters to the reader.
    #[inline]
    pub fn includes_or_equals(&self, other: &TileAddress) -> bool {
        self == other || self.includes(other)
    }

    /// Number of tiles along one axis at this zoom level.
    #[inline]
    pub fn tile_stride(&self) -> u32 {
        1u32 << self.zoom
    }

    /// Walks up to `max_zoom` if this address is deeper.
    pub fn clamp_to_zoom(&self, max_zoom: u8) -> TileAddress {
        if self.zoom <= max_zoom {
            return *self;
        }
        let delta = self.zoom - max_zoom;
        TileAddress {
            x: self.x >> delta,
            y: self.y >> delta,
            zoom: max_zoom,
        }
    }

    /// Returns the Bing-style quadkey, most significant level first.
    ///
    /// Each digit encodes the `(x_bit, y_bit)` pair of one level as
    /// `x_bit + 2 * y_bit`. The root tile has an empty quadkey.
    pub fn quadkey(&self) -> String {
        let mut key = String::with_capacity(self.zoom as usize);
        for level in (1..=self.zoom).rev() {
            let mask = 1u32 << (level - 1);
            let mut digit = b'0';
            if self.x & mask != 0 {
                digit += 1;
            }
            if self.y & mask != 0 {
                digit += 2;
            }
            key.push(digit as char);
        }
        key
    }

    /// Parses a quadkey back into an address.
    pub fn from_quadkey(quadkey: &str) -> Result<TileAddress, CoordError> {
        if quadkey.len() > MAX_ZOOM as usize {
            return Err(CoordError::InvalidQuadkey(quadkey.to_string()));
        }
        let mut x = 0u32;
        let mut y = 0u32;
        for c in quadkey.chars() {
            let digit = c
                .to_digit(4)
                .ok_or_else(|| CoordError::InvalidQuadkey(quadkey.to_string()))?;
            x = (x << 1) | (digit & 1);
            y = (y << 1) | ((digit >> 1) & 1);
        }
        Ok(TileAddress {
            x,
            y,
            zoom: quadkey.len() as u8,
        })
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Root-ward iterator over a tile's ancestors.
#[derive(Debug, Clone)]
pub struct Ancestors {
    next: Option<TileAddress>,
}

impl Iterator for Ancestors {
    type Item = TileAddress;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.next.map_or(0, |a| a.zoom as usize + 1);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Ancestors {}

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Latitude outside the Web Mercator range
    InvalidLatitude(f64),
    /// Longitude outside [-180, 180]
    InvalidLongitude(f64),
    /// Zoom deeper than [`MAX_ZOOM`]
    InvalidZoom(u8),
    /// Column or row not below the zoom's stride
    OutOfRange { x: u32, y: u32, zoom: u8 },
    /// Quadkey containing a non base-4 digit, or too long
    InvalidQuadkey(String),
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidLatitude(lat) => {
                write!(f, "Invalid latitude: {} (must be between {} and {})", lat, MIN_LAT, MAX_LAT)
            }
            CoordError::InvalidLongitude(lon) => {
                write!(f, "Invalid longitude: {} (must be between {} and {})", lon, MIN_LON, MAX_LON)
            }
            CoordError::InvalidZoom(zoom) => {
                write!(f, "Invalid zoom level: {} (must be at most {})", zoom, MAX_ZOOM)
            }
            CoordError::OutOfRange { x, y, zoom } => {
                write!(f, "Tile {}/{}/{} is outside the zoom level's grid", zoom, x, y)
            }
            CoordError::InvalidQuadkey(key) => write!(f, "Invalid quadkey: '{}'", key),
        }
    }
}

impl std::error::Error for CoordError {}
