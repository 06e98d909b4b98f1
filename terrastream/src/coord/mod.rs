//! Quadtree tile addressing
//!
//! Provides the [`TileAddress`] value type with its parent/child/containment
//! algebra, quadkey encoding, and conversions between geographic coordinates
//! (latitude/longitude) and Web Mercator tile addresses.

mod types;

pub use types::{
    Ancestors, CoordError, TileAddress, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON,
};

use std::f64::consts::PI;

/// Converts geographic coordinates to the Web Mercator tile containing them.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to [`MAX_ZOOM`])
#[inline]
pub fn to_tile_address(lat: f64, lon: f64, zoom: u8) -> Result<TileAddress, CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let n = 2.0_f64.powi(zoom as i32);
    let max_index = (n as u32).saturating_sub(1);

    let x = ((lon + 180.0) / 360.0 * n) as u32;

    let lat_rad = lat.to_radians();
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n) as u32;

    // lon = 180 and lat = MIN_LAT land exactly on the far edge
    Ok(TileAddress::new(x.min(max_index), y.min(max_index), zoom))
}

/// Returns the latitude/longitude (degrees) of a tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileAddress) -> (f64, f64) {
    let n = 2.0_f64.powi(tile.zoom as i32);

    let lon = tile.x as f64 / n * 360.0 - 180.0;

    let y = tile.y as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();

    (lat_rad.to_degrees(), lon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadkey_most_significant_level_first() {
        let tile = TileAddress::new(1, 2, 2);
        assert_eq!(tile.quadkey(), "21");
    }

    #[test]
    fn test_quadkey_root_is_empty() {
        assert_eq!(TileAddress::ROOT.quadkey(), "");
    }

    #[test]
    fn test_quadkey_known_bing_example() {
        // Example from the Bing Maps tile system documentation
        let tile = TileAddress::new(3, 5, 3);
        assert_eq!(tile.quadkey(), "213");
    }

    #[test]
    fn test_from_quadkey() {
        let tile = TileAddress::from_quadkey("21").unwrap();
        assert_eq!(tile, TileAddress::new(1, 2, 2));
    }

    #[test]
    fn test_from_quadkey_rejects_bad_digit() {
        let result = TileAddress::from_quadkey("124");
        assert!(matches!(result, Err(CoordError::InvalidQuadkey(_))));
    }

    #[test]
    fn test_root_has_no_parent() {
        assert_eq!(TileAddress::ROOT.parent(), None);
    }

    #[test]
    fn test_parent_shifts_coordinates() {
        let tile = TileAddress::new(5, 6, 3);
        assert_eq!(tile.parent(), Some(TileAddress::new(2, 3, 2)));
    }

    #[test]
    fn test_ancestors_run_root_ward() {
        let tile = TileAddress::new(5, 5, 3);
        let ancestors: Vec<_> = tile.ancestors(false).collect();
        assert_eq!(
            ancestors,
            vec![
                TileAddress::new(2, 2, 2),
                TileAddress::new(1, 1, 1),
                TileAddress::ROOT,
            ]
        );
    }

    #[test]
    fn test_ancestors_include_self() {
        let tile = TileAddress::new(5, 5, 3);
        let mut iter = tile.ancestors(true);
        assert_eq!(iter.len(), 4);
        assert_eq!(iter.next(), Some(tile));
    }

    #[test]
    fn test_ancestors_restartable() {
        let iter = TileAddress::new(7, 1, 4).ancestors(true);
        let first: Vec<_> = iter.clone().collect();
        let second: Vec<_> = iter.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_children_order() {
        let children = TileAddress::new(1, 1, 1).children();
        assert_eq!(
            children,
            [
                TileAddress::new(2, 2, 2),
                TileAddress::new(3, 2, 2),
                TileAddress::new(2, 3, 2),
                TileAddress::new(3, 3, 2),
            ]
        );
    }

    #[test]
    fn test_includes_ancestor_and_self() {
        let ancestor = TileAddress::new(0, 0, 1);
        let tile = TileAddress::new(2, 2, 3);
        assert!(ancestor.includes(&tile));
        assert!(tile.includes(&tile));
        assert!(!tile.includes(&ancestor));
    }

    #[test]
    fn test_includes_rejects_sibling() {
        let a = TileAddress::new(2, 2, 3);
        let b = TileAddress::new(5, 5, 4);
        // (5,5,4) is a child of (2,2,3), not the other way around
        assert!(a.includes(&b));
        assert!(!b.includes(&a));
        assert!(!TileAddress::new(3, 2, 3).includes(&b));
    }

    #[test]
    fn test_tile_stride() {
        assert_eq!(TileAddress::ROOT.tile_stride(), 1);
        assert_eq!(TileAddress::new(0, 0, 10).tile_stride(), 1024);
    }

    #[test]
    fn test_clamp_to_zoom() {
        let tile = TileAddress::new(13, 6, 4);
        assert_eq!(tile.clamp_to_zoom(2), TileAddress::new(3, 1, 2));
        assert_eq!(tile.clamp_to_zoom(8), tile);
    }

    #[test]
    fn test_checked_rejects_out_of_range() {
        assert!(TileAddress::checked(3, 3, 2).is_ok());
        assert!(matches!(
            TileAddress::checked(4, 0, 2),
            Err(CoordError::OutOfRange { .. })
        ));
        assert!(matches!(
            TileAddress::checked(0, 0, 31),
            Err(CoordError::InvalidZoom(31))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(TileAddress::new(3, 5, 7).to_string(), "7/3/5");
    }

    #[test]
    fn test_new_york_city_at_zoom_16() {
        let tile = to_tile_address(40.7128, -74.0060, 16).unwrap();
        assert_eq!(tile.y, 24640);
        assert_eq!(tile.x, 19295);
        assert_eq!(tile.zoom, 16);
    }

    #[test]
    fn test_invalid_latitude() {
        let result = to_tile_address(90.0, 0.0, 10);
        assert!(matches!(result, Err(CoordError::InvalidLatitude(_))));
    }

    #[test]
    fn test_far_edge_stays_in_grid() {
        let tile = to_tile_address(MIN_LAT, MAX_LON, 3).unwrap();
        assert_eq!(tile, TileAddress::new(7, 7, 3));
    }

    #[test]
    fn test_tile_to_lat_lon_northwest_corner() {
        let (lat, lon) = tile_to_lat_lon(&TileAddress::ROOT);
        assert!((lat - MAX_LAT).abs() < 1e-6);
        assert!((lon - MIN_LON).abs() < 1e-9);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn address() -> impl Strategy<Value = TileAddress> {
            (0u8..=20).prop_flat_map(|zoom| {
                let stride = 1u32 << zoom;
                (0..stride, 0..stride, Just(zoom))
                    .prop_map(|(x, y, zoom)| TileAddress::new(x, y, zoom))
            })
        }

        proptest! {
            #[test]
            fn test_child_parent_roundtrip(tile in address()) {
                for child in tile.children() {
                    prop_assert_eq!(child.parent(), Some(tile));
                }
            }

            #[test]
            fn test_includes_reflexive(tile in address()) {
                prop_assert!(tile.includes(&tile));
                prop_assert!(tile.includes_or_equals(&tile));
            }

            #[test]
            fn test_includes_transitive(tile in address(), a in 0u8..8, b in 0u8..8) {
                let mid = tile.clamp_to_zoom(tile.zoom.saturating_sub(a));
                let top = mid.clamp_to_zoom(mid.zoom.saturating_sub(b));
                prop_assert!(top.includes(&mid));
                prop_assert!(mid.includes(&tile));
                prop_assert!(top.includes(&tile));
            }

            #[test]
            fn test_every_ancestor_includes_tile(tile in address()) {
                for ancestor in tile.ancestors(true) {
                    prop_assert!(ancestor.includes(&tile));
                }
                prop_assert_eq!(tile.ancestors(true).last(), Some(TileAddress::ROOT));
            }

            #[test]
            fn test_quadkey_roundtrip(tile in address()) {
                let key = tile.quadkey();
                prop_assert_eq!(key.len(), tile.zoom as usize);
                prop_assert_eq!(TileAddress::from_quadkey(&key).unwrap(), tile);
            }

            #[test]
            fn test_tile_address_in_bounds(
                lat in MIN_LAT..MAX_LAT,
                lon in MIN_LON..MAX_LON,
                zoom in 0u8..=18
            ) {
                let tile = to_tile_address(lat, lon, zoom).unwrap();
                prop_assert!(tile.x < tile.tile_stride());
                prop_assert!(tile.y < tile.tile_stride());
            }
        }
    }
}
