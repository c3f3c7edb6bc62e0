use bevy::math::IVec2;
use bevy::prelude::*;

use crate::resources::{DebugSettings, MapSettings, MapView};
use crate::tile_system::{TileFetcher, TileImageCache};

/// System to toggle debug mode with F1
pub fn toggle_debug_mode(
    keyboard_input: Res<ButtonInput<KeyCode>>,
    mut debug_settings: ResMut<DebugSettings>,
) {
    if keyboard_input.just_pressed(KeyCode::F1) {
        debug_settings.debug_mode = !debug_settings.debug_mode;
        info!("Debug mode: {}", if debug_settings.debug_mode { "ON" } else { "OFF" });
    }
}

/// Periodic summary of the view, cache and fetcher while debug mode is on
pub fn debug_info(
    view: Res<MapView>,
    settings: Res<MapSettings>,
    cache: Res<TileImageCache>,
    fetcher: Res<TileFetcher>,
    debug_settings: Res<DebugSettings>,
) {
    // Skip if debug mode is disabled
    if !debug_settings.debug_mode {
        return;
    }

    let lon_lat = view.lon_lat();
    let reference = view.reference_tile(settings.tile_size);
    let center = reference.whole_at(reference.zoom);
    let levels = cache.available_zoom_levels_near(&reference, IVec2::ZERO, view.wrap);
    let stats = fetcher.stats();

    info!(
        "Center: {:.5}, {:.5} | Zoom: {:.2} (tile {}/{}/{}) | Cached: {} (v{}) levels under center {:?} | Loads: {} in flight, {} ok, {} failed, {} cancelled",
        lon_lat.x,
        lon_lat.y,
        view.zoom,
        reference.zoom,
        center.x,
        center.y,
        cache.len(),
        cache.version(),
        levels,
        fetcher.pending_count(),
        stats.succeeded,
        stats.failed,
        stats.cancelled
    );
}
