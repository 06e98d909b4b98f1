//! Payload decoding strategies
//!
//! Each layer is constructed with one [`TileDecoder`]. The scheduler runs it
//! on the fetch task as soon as a body arrives, so a malformed payload fails
//! that address without ever reaching the cache.

mod elevation;
mod imagery;

pub use elevation::{ElevationDecoder, ElevationTile, DEFAULT_ELEVATION_RESOLUTION};
pub use imagery::{ImageryDecoder, ImageryTile, DEFAULT_IMAGERY_RESOLUTION};

use crate::coord::TileAddress;
use bytes::Bytes;
use std::fmt;
use thiserror::Error;

/// Kind of resource a layer streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Imagery,
    Elevation,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Imagery => "imagery",
            ResourceKind::Elevation => "elevation",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "imagery" => Ok(ResourceKind::Imagery),
            "elevation" | "terrain" => Ok(ResourceKind::Elevation),
            other => Err(format!("unknown resource kind '{}'", other)),
        }
    }
}

/// Decoded tile payload.
#[derive(Debug, Clone, PartialEq)]
pub enum TileData {
    Imagery(ImageryTile),
    Elevation(ElevationTile),
}

impl TileData {
    pub fn kind(&self) -> ResourceKind {
        match self {
            TileData::Imagery(_) => ResourceKind::Imagery,
            TileData::Elevation(_) => ResourceKind::Elevation,
        }
    }

    pub fn as_imagery(&self) -> Option<&ImageryTile> {
        match self {
            TileData::Imagery(tile) => Some(tile),
            TileData::Elevation(_) => None,
        }
    }

    pub fn as_elevation(&self) -> Option<&ElevationTile> {
        match self {
            TileData::Elevation(tile) => Some(tile),
            TileData::Imagery(_) => None,
        }
    }

    /// Approximate heap footprint in bytes.
    pub fn byte_size(&self) -> usize {
        match self {
            TileData::Imagery(tile) => tile.len(),
            TileData::Elevation(tile) => tile.samples().len() * std::mem::size_of::<u16>(),
        }
    }
}

/// Errors from decoding a fetched payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Payload length does not match the expected layout
    #[error("Tile {address} is corrupt: expected {expected} bytes, got {actual}")]
    DataCorruption {
        address: TileAddress,
        expected: usize,
        actual: usize,
    },

    /// Server returned an empty body
    #[error("Tile {0} has an empty payload")]
    EmptyPayload(TileAddress),
}

/// Strategy turning a response body into tile data.
pub trait TileDecoder: Send + Sync + 'static {
    /// Kind of data this decoder produces.
    fn kind(&self) -> ResourceKind;

    /// Value substituted for `{resolution}` in URL templates.
    fn resolution(&self) -> u32;

    /// Decodes one payload.
    fn decode(&self, address: TileAddress, body: Bytes) -> Result<TileData, DecodeError>;
}

/// Returns the decoding strategy for a resource kind.
pub fn decoder_for(kind: ResourceKind, resolution: u32) -> std::sync::Arc<dyn TileDecoder> {
    match kind {
        ResourceKind::Imagery => std::sync::Arc::new(ImageryDecoder::new(resolution)),
        ResourceKind::Elevation => std::sync::Arc::new(ElevationDecoder::new(resolution)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!("Imagery".parse::<ResourceKind>(), Ok(ResourceKind::Imagery));
        assert_eq!("terrain".parse::<ResourceKind>(), Ok(ResourceKind::Elevation));
        assert!("vector".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_decoder_for_kind() {
        let decoder = decoder_for(ResourceKind::Elevation, 3);
        assert_eq!(decoder.kind(), ResourceKind::Elevation);
        assert_eq!(decoder.resolution(), 3);

        let address = TileAddress::new(0, 0, 0);
        let data = decoder.decode(address, Bytes::from(vec![0u8; 18])).unwrap();
        assert_eq!(data.kind(), ResourceKind::Elevation);
        assert_eq!(data.byte_size(), 18);
    }
}
