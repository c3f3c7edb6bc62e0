use bevy::math::DVec2;

use crate::resources::MapView;
use crate::tile_system::coords::{clamp_latitude, fractional_tile_numbers, tile_to_lon_lat, Projection};

/// Move the view center by a screen-pixel delta (x right, y down).
///
/// The delta is measured at the view's fractional tile zoom, so dragging by
/// N pixels moves the map under the cursor by exactly N pixels.
pub fn pan_by_pixels(view: &mut MapView, delta: DVec2, tile_size: u32) {
    if delta == DVec2::ZERO {
        return;
    }
    let zoom = view.whole_zoom(tile_size);
    let pixels_per_tile = tile_size as f64 * 2.0_f64.powf(view.tile_zoom(tile_size) - zoom as f64);

    let position = fractional_tile_numbers(view.center, &view.projection, zoom) + delta / pixels_per_tile;
    let lon_lat = tile_to_lon_lat(position, zoom);

    let lon = if view.wrap.horizontal {
        (lon_lat.x + 180.0).rem_euclid(360.0) - 180.0
    } else {
        lon_lat.x.clamp(-180.0, 180.0)
    };
    view.center = view.projection.from_lon_lat(DVec2::new(lon, clamp_latitude(lon_lat.y)));
}

/// Change the view zoom while keeping the point under `cursor` (viewport
/// pixels from the top-left) in place
pub fn zoom_around(view: &mut MapView, cursor: DVec2, zoom: f64, tile_size: u32) {
    let offset = cursor - view.viewport.as_dvec2() / 2.0;
    pan_by_pixels(view, offset, tile_size);
    view.zoom = zoom;
    pan_by_pixels(view, -offset, tile_size);
}

/// Longitude/latitude under a viewport pixel
pub fn screen_to_lon_lat(view: &MapView, cursor: DVec2, tile_size: u32) -> DVec2 {
    let mut shifted = view.clone();
    pan_by_pixels(&mut shifted, cursor - view.viewport.as_dvec2() / 2.0, tile_size);
    shifted.lon_lat()
}
