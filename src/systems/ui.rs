use bevy::prelude::*;

use crate::components::ZoomLevelText;
use crate::resources::{MapSettings, MapView};
use crate::tile_system::coords::meters_per_pixel;
use crate::tile_system::{TileFetcher, TileImageCache};

/// Sets up the UI elements
pub fn setup_ui(mut commands: Commands) {
    // Spawn text to display current zoom level
    commands.spawn((
        Text::new("Zoom: -"),
        TextFont {
            font_size: 14.0,
            ..default()
        },
        // Position absolutely
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(10.0),
            bottom: Val::Px(10.0),
            padding: UiRect::all(Val::Px(4.0)),
            ..default()
        },
        // Add background color for readability
        BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.5)),
        ZoomLevelText,
    ));
}

/// Updates the readout with zoom, ground resolution and tile counts
pub fn update_zoom_level_text(
    view: Res<MapView>,
    settings: Res<MapSettings>,
    cache: Res<TileImageCache>,
    fetcher: Res<TileFetcher>,
    mut query: Query<&mut Text, With<ZoomLevelText>>,
) {
    let Ok(mut text) = query.get_single_mut() else {
        return;
    };

    let lon_lat = view.lon_lat();
    let tile_zoom = view.tile_zoom(settings.tile_size);
    let resolution = meters_per_pixel(lon_lat.y, tile_zoom, settings.tile_size);

    *text = Text::new(format!(
        "Zoom: {:.2} (tiles z{})  {:.4}, {:.4}\n1 px = {:.2} m  |  {} tiles cached, {} loading",
        view.zoom,
        view.whole_zoom(settings.tile_size),
        lon_lat.y,
        lon_lat.x,
        resolution,
        cache.len(),
        fetcher.pending_count()
    ));
}
