use bevy::prelude::*;
use bevy::render::render_resource::Extent3d;

use crate::debug_log;
use crate::resources::{DebugSettings, MapCanvas, MapSettings, MapView};
use crate::tile_system::{paint, plan_frame, DrawCommand, TileFetcher, TileImageCache};

/// Request the tiles the current view needs at its whole zoom level
pub fn fetch_tiles(
    view: Res<MapView>,
    settings: Res<MapSettings>,
    canvas: Res<MapCanvas>,
    cache: Res<TileImageCache>,
    mut fetcher: ResMut<TileFetcher>,
    debug_settings: Res<DebugSettings>,
) {
    let reference = view.reference_tile(settings.tile_size);
    let started = fetcher.fetch_visible(&cache, &reference, &canvas.grid, view.wrap);
    if started > 0 {
        debug_log!(
            debug_settings,
            "Queued {} tiles around {:.3},{:.3} at zoom {} ({} in flight)",
            started,
            reference.position.x,
            reference.position.y,
            reference.zoom,
            fetcher.pending_count()
        );
    }
}

/// Move finished loads into the cache and keep it within capacity
pub fn receive_tiles(
    view: Res<MapView>,
    settings: Res<MapSettings>,
    mut fetcher: ResMut<TileFetcher>,
    mut cache: ResMut<TileImageCache>,
    debug_settings: Res<DebugSettings>,
) {
    let inserted = fetcher.drain_into(&mut cache);
    if inserted == 0 {
        return;
    }

    let evicted = cache.prune(view.tile_zoom(settings.tile_size));
    debug_log!(
        debug_settings,
        "Cached {} new tiles, evicted {} (cache {} tiles, version {})",
        inserted,
        evicted,
        cache.len(),
        cache.version()
    );
}

/// Re-composite the map when the view or the cache changed
pub fn render_map(
    view: Res<MapView>,
    settings: Res<MapSettings>,
    cache: Res<TileImageCache>,
    mut canvas: ResMut<MapCanvas>,
    mut images: ResMut<Assets<Image>>,
) {
    if !view.is_changed() && canvas.painted_version == Some(cache.version()) {
        return;
    }
    let canvas = &mut *canvas;

    let frame = view.frame_params(settings.tile_size, settings.max_zoom);
    let commands = plan_frame(&frame, &cache, &canvas.grid);
    paint(&commands, &cache, &mut canvas.surface);
    canvas.painted_version = Some(cache.version());

    let Some(image) = images.get_mut(&canvas.image) else {
        panic!("map canvas image {:?} is missing", canvas.image);
    };
    let size = Extent3d {
        width: canvas.surface.width(),
        height: canvas.surface.height(),
        depth_or_array_layers: 1,
    };
    if image.texture_descriptor.size != size {
        image.resize(size);
    }
    image.data.copy_from_slice(canvas.surface.as_raw());

    let draws = commands
        .iter()
        .filter(|command| matches!(command, DrawCommand::Draw { .. }))
        .count();
    debug!(
        "Rendered {} tiles and {} clears at zoom {:.2}",
        draws,
        commands.len() - draws,
        frame.zoom
    );
}
