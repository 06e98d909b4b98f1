//! Fixed-layout elevation tiles.
//!
//! Wire format: `resolution × resolution` little-endian `u16` samples in
//! row-major order, `resolution² × 2` bytes in total. No header.

use super::{DecodeError, ResourceKind, TileData, TileDecoder};
use crate::coord::TileAddress;
use bytes::Bytes;

/// Default samples per tile edge.
pub const DEFAULT_ELEVATION_RESOLUTION: u32 = 65;

/// A decoded grid of height samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElevationTile {
    resolution: u32,
    samples: Vec<u16>,
}

impl ElevationTile {
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Row-major samples.
    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    /// Sample at `(col, row)`, or `None` outside the grid.
    pub fn sample(&self, col: u32, row: u32) -> Option<u16> {
        if col >= self.resolution || row >= self.resolution {
            return None;
        }
        self.samples
            .get(row as usize * self.resolution as usize + col as usize)
            .copied()
    }

    /// Smallest and largest sample.
    pub fn min_max(&self) -> Option<(u16, u16)> {
        let first = *self.samples.first()?;
        Some(
            self.samples
                .iter()
                .fold((first, first), |(lo, hi), &s| (lo.min(s), hi.max(s))),
        )
    }
}

/// Decoder for the fixed elevation layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElevationDecoder {
    resolution: u32,
}

impl ElevationDecoder {
    pub fn new(resolution: u32) -> Self {
        Self { resolution }
    }

    /// Byte length a valid payload must have.
    pub fn expected_len(&self) -> usize {
        let side = self.resolution as usize;
        side.saturating_mul(side).saturating_mul(2)
    }

    /// Decodes raw bytes into an [`ElevationTile`].
    pub fn decode_samples(&self, address: TileAddress, body: &[u8]) -> Result<ElevationTile, DecodeError> {
        let expected = self.expected_len();
        if body.len() != expected {
            return Err(DecodeError::DataCorruption {
                address,
                expected,
                actual: body.len(),
            });
        }

        let samples = body
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        Ok(ElevationTile {
            resolution: self.resolution,
            samples,
        })
    }
}

impl Default for ElevationDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_ELEVATION_RESOLUTION)
    }
}

impl TileDecoder for ElevationDecoder {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Elevation
    }

    fn resolution(&self) -> u32 {
        self.resolution
    }

    fn decode(&self, address: TileAddress, body: Bytes) -> Result<TileData, DecodeError> {
        self.decode_samples(address, &body).map(TileData::Elevation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(samples: &[u16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_decodes_row_major_little_endian() {
        let decoder = ElevationDecoder::new(2);
        let body = encode(&[1, 2, 3, 0xABCD]);
        let tile = decoder.decode_samples(TileAddress::ROOT, &body).unwrap();
        assert_eq!(tile.samples(), &[1, 2, 3, 0xABCD]);
        assert_eq!(tile.sample(1, 0), Some(2));
        assert_eq!(tile.sample(0, 1), Some(3));
        assert_eq!(tile.sample(2, 0), None);
        assert_eq!(tile.min_max(), Some((1, 0xABCD)));
    }

    #[test]
    fn test_byte_order() {
        let decoder = ElevationDecoder::new(1);
        let tile = decoder.decode_samples(TileAddress::ROOT, &[0x34, 0x12]).unwrap();
        assert_eq!(tile.samples(), &[0x1234]);
    }

    #[test]
    fn test_short_payload_is_corruption() {
        let decoder = ElevationDecoder::new(4);
        let address = TileAddress::new(1, 1, 1);
        let err = decoder.decode_samples(address, &[0u8; 31]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::DataCorruption {
                address,
                expected: 32,
                actual: 31
            }
        );
    }

    #[test]
    fn test_long_payload_is_corruption() {
        let decoder = ElevationDecoder::new(2);
        let result = decoder.decode(TileAddress::ROOT, Bytes::from(vec![0u8; 10]));
        assert!(matches!(result, Err(DecodeError::DataCorruption { actual: 10, .. })));
    }

    #[test]
    fn test_decode_wraps_tile_data() {
        let decoder = ElevationDecoder::new(1);
        let data = decoder.decode(TileAddress::ROOT, Bytes::from_static(&[5, 0])).unwrap();
        assert_eq!(data.kind(), ResourceKind::Elevation);
        assert_eq!(data.as_elevation().map(|t| t.samples().to_vec()), Some(vec![5]));
        assert_eq!(data.byte_size(), 2);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_only_exact_length_decodes(resolution in 1u32..16, len in 0usize..600) {
                let decoder = ElevationDecoder::new(resolution);
                let result = decoder.decode_samples(TileAddress::ROOT, &vec![0u8; len]);
                prop_assert_eq!(result.is_ok(), len == (resolution * resolution * 2) as usize);
            }
        }
    }
}
