//! Imagery tiles are kept as opaque encoded bytes.

use super::{DecodeError, ResourceKind, TileData, TileDecoder};
use crate::coord::TileAddress;
use bytes::Bytes;

/// Default edge length, in pixels, requested for imagery tiles.
pub const DEFAULT_IMAGERY_RESOLUTION: u32 = 256;

/// Encoded image bytes as served (PNG, JPEG, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageryTile {
    bytes: Bytes,
}

impl ImageryTile {
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Pass-through decoder that only rejects empty bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageryDecoder {
    resolution: u32,
}

impl ImageryDecoder {
    pub fn new(resolution: u32) -> Self {
        Self { resolution }
    }
}

impl Default for ImageryDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGERY_RESOLUTION)
    }
}

impl TileDecoder for ImageryDecoder {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Imagery
    }

    fn resolution(&self) -> u32 {
        self.resolution
    }

    fn decode(&self, address: TileAddress, body: Bytes) -> Result<TileData, DecodeError> {
        if body.is_empty() {
            return Err(DecodeError::EmptyPayload(address));
        }
        Ok(TileData::Imagery(ImageryTile { bytes: body }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passes_bytes_through() {
        let data = ImageryDecoder::default()
            .decode(TileAddress::ROOT, Bytes::from_static(b"\x89PNG"))
            .unwrap();
        let tile = data.as_imagery().unwrap();
        assert_eq!(&tile.bytes()[..], b"\x89PNG");
        assert_eq!(data.kind(), ResourceKind::Imagery);
    }

    #[test]
    fn test_empty_body_rejected() {
        let address = TileAddress::new(0, 1, 1);
        let err = ImageryDecoder::default()
            .decode(address, Bytes::new())
            .unwrap_err();
        assert_eq!(err, DecodeError::EmptyPayload(address));
        assert_eq!(err.to_string(), "Tile 1/0/1 has an empty payload");
    }
}
