//! Slippy-map coordinate math.
//!
//! Everything here is a plain function of its inputs. Latitudes outside the
//! Web-Mercator range are not rejected; use [`clamp_latitude`] first.

use bevy::math::{DVec2, I64Vec2};
use std::f64::consts::PI;
use std::str::FromStr;

use crate::tile_system::types::{TileError, TileKey};

/// Radius of the Web-Mercator sphere in meters
pub const EARTH_RADIUS: f64 = 6_378_137.0;
/// Latitude at which the square Web-Mercator world ends
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Transform between a view's native coordinates and longitude/latitude
pub trait Projection {
    /// Native coordinate to (longitude, latitude) in degrees
    fn to_lon_lat(&self, coordinate: DVec2) -> DVec2;
    /// (longitude, latitude) in degrees to native coordinate
    fn from_lon_lat(&self, lon_lat: DVec2) -> DVec2;
}

/// Projections the map understands out of the box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectionCode {
    /// EPSG:3857, meters
    #[default]
    WebMercator,
    /// EPSG:4326, degrees (x = longitude, y = latitude)
    Geographic,
}

impl ProjectionCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectionCode::WebMercator => "EPSG:3857",
            ProjectionCode::Geographic => "EPSG:4326",
        }
    }
}

impl FromStr for ProjectionCode {
    type Err = TileError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code.trim().to_ascii_uppercase().as_str() {
            "EPSG:3857" | "EPSG:900913" | "EPSG:102100" => Ok(ProjectionCode::WebMercator),
            "EPSG:4326" | "CRS:84" => Ok(ProjectionCode::Geographic),
            _ => Err(TileError::UnknownProjection(code.to_string())),
        }
    }
}

impl Projection for ProjectionCode {
    fn to_lon_lat(&self, coordinate: DVec2) -> DVec2 {
        match self {
            ProjectionCode::WebMercator => DVec2::new(
                (coordinate.x / EARTH_RADIUS).to_degrees(),
                (2.0 * (coordinate.y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees(),
            ),
            ProjectionCode::Geographic => coordinate,
        }
    }

    fn from_lon_lat(&self, lon_lat: DVec2) -> DVec2 {
        match self {
            ProjectionCode::WebMercator => DVec2::new(
                lon_lat.x.to_radians() * EARTH_RADIUS,
                (PI / 4.0 + lon_lat.y.to_radians() / 2.0).tan().ln() * EARTH_RADIUS,
            ),
            ProjectionCode::Geographic => lon_lat,
        }
    }
}

/// Fractional tile position of `coordinate` at `zoom`
pub fn fractional_tile_numbers(coordinate: DVec2, projection: &dyn Projection, zoom: u8) -> DVec2 {
    let lon_lat = projection.to_lon_lat(coordinate);
    let n = 2.0_f64.powi(zoom as i32);
    let lat_rad = lon_lat.y.to_radians();

    DVec2::new(
        n * (lon_lat.x + 180.0) / 360.0,
        n * (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0,
    )
}

/// Inverse of [`fractional_tile_numbers`] up to the projection: (lon, lat) in degrees
pub fn tile_to_lon_lat(position: DVec2, zoom: u8) -> DVec2 {
    let n = 2.0_f64.powi(zoom as i32);
    let lon = position.x / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * position.y / n)).sinh().atan().to_degrees();
    DVec2::new(lon, lat)
}

pub fn whole_tile_numbers(position: DVec2) -> I64Vec2 {
    I64Vec2::new(position.x.floor() as i64, position.y.floor() as i64)
}

/// Re-express a fractional tile position recorded at `from` at zoom `to`
pub fn rescale(position: DVec2, from: u8, to: u8) -> DVec2 {
    position * 2.0_f64.powi(to as i32 - from as i32)
}

pub fn wrap_x(x: i64, zoom: u8) -> i64 {
    TileKey::new(zoom, x, 0).tiles_per_axis().map_or(x, |n| x.rem_euclid(n))
}

pub fn is_valid_tile_key(key: &TileKey, max_zoom: u8) -> bool {
    key.is_valid(max_zoom)
}

pub fn clamp_latitude(lat: f64) -> f64 {
    lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
}

/// Lowest whole zoom at which the world is at least as wide as the viewport.
///
/// View zoom 0 maps onto this tile zoom, so a view at fractional zoom `v` uses
/// tiles from `base_zoom_for_viewport(width) + v`.
pub fn base_zoom_for_viewport(viewport_width: u32, tile_size: u32) -> u8 {
    if viewport_width <= tile_size || tile_size == 0 {
        return 0;
    }
    (viewport_width as f64 / tile_size as f64).log2().ceil() as u8
}

/// Ground resolution at a latitude for tiles of `tile_size` pixels
pub fn meters_per_pixel(latitude: f64, zoom: f64, tile_size: u32) -> f64 {
    let circumference = 2.0 * PI * EARTH_RADIUS * latitude.to_radians().cos();
    circumference / (2.0_f64.powf(zoom) * tile_size as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UTRECHT_3857: DVec2 = DVec2::new(568_228.11, 6_816_936.08);

    #[test]
    fn test_whole_numbers_stay_in_range() {
        let samples = [
            DVec2::new(-180.0, MAX_LATITUDE - 1e-9),
            DVec2::new(179.999, -MAX_LATITUDE + 1e-9),
            DVec2::new(0.0, 0.0),
            DVec2::new(6.5665, 53.2194),
            DVec2::new(-122.42, 37.77),
            DVec2::new(151.21, -33.87),
        ];
        for zoom in 0..=19u8 {
            let max = (1_i64 << zoom) - 1;
            for lon_lat in samples {
                let whole = whole_tile_numbers(fractional_tile_numbers(
                    lon_lat,
                    &ProjectionCode::Geographic,
                    zoom,
                ));
                assert!((0..=max).contains(&whole.x), "x {} at zoom {zoom}", whole.x);
                assert!((0..=max).contains(&whole.y), "y {} at zoom {zoom}", whole.y);
            }
        }
    }

    #[test]
    fn test_known_tile() {
        // Utrecht at zoom 7 is OSM tile 7/65/42
        let p = fractional_tile_numbers(UTRECHT_3857, &ProjectionCode::WebMercator, 7);
        assert_eq!(whole_tile_numbers(p), I64Vec2::new(65, 42));
        let q = fractional_tile_numbers(DVec2::ZERO, &ProjectionCode::Geographic, 1);
        assert!((q - DVec2::new(1.0, 1.0)).length() < 1e-12);
    }

    #[test]
    fn test_projection_round_trip() {
        let lon_lat = ProjectionCode::WebMercator.to_lon_lat(UTRECHT_3857);
        assert!((lon_lat.x - 5.1045).abs() < 1e-3);
        assert!((lon_lat.y - 52.0929).abs() < 1e-3);
        let back = ProjectionCode::WebMercator.from_lon_lat(lon_lat);
        assert!((back - UTRECHT_3857).length() < 1e-6);
    }

    #[test]
    fn test_tile_to_lon_lat_inverts() {
        let lon_lat = DVec2::new(6.5665, 53.2194);
        let p = fractional_tile_numbers(lon_lat, &ProjectionCode::Geographic, 13);
        let back = tile_to_lon_lat(p, 13);
        assert!((back - lon_lat).length() < 1e-9);
    }

    #[test]
    fn test_wrap_x() {
        for zoom in [0u8, 1, 3, 10] {
            let n = 1_i64 << zoom;
            for x in [-3 * n - 1, -1, 0, 1, n - 1, n, 5 * n + 2] {
                let wrapped = wrap_x(x, zoom);
                assert!((0..n).contains(&wrapped));
                assert_eq!(wrap_x(wrapped, zoom), wrapped);
            }
        }
        assert_eq!(wrap_x(-1, 2), 3);
    }

    #[test]
    fn test_rescale() {
        let p = DVec2::new(65.8154, 42.3107);
        assert_eq!(rescale(p, 7, 7), p);
        assert_eq!(rescale(p, 7, 8), p * 2.0);
        for (z1, z2) in [(0u8, 19u8), (7, 3), (12, 12), (5, 9)] {
            let back = rescale(rescale(p, z1, z2), z2, z1);
            assert!((back - p).length() < 1e-9);
        }
    }

    #[test]
    fn test_base_zoom_for_viewport() {
        assert_eq!(base_zoom_for_viewport(200, 256), 0);
        assert_eq!(base_zoom_for_viewport(256, 256), 0);
        assert_eq!(base_zoom_for_viewport(512, 256), 1);
        assert_eq!(base_zoom_for_viewport(700, 256), 2);
        assert_eq!(base_zoom_for_viewport(1920, 256), 3);
    }

    #[test]
    fn test_projection_codes() {
        assert_eq!("epsg:3857".parse::<ProjectionCode>(), Ok(ProjectionCode::WebMercator));
        assert_eq!("EPSG:4326".parse::<ProjectionCode>(), Ok(ProjectionCode::Geographic));
        assert!(matches!(
            "EPSG:27700".parse::<ProjectionCode>(),
            Err(TileError::UnknownProjection(_))
        ));
    }

    #[test]
    fn test_meters_per_pixel_at_equator() {
        let res = meters_per_pixel(0.0, 0.0, 256);
        assert!((res - 156_543.033_928).abs() < 1e-3);
    }
}
