use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::components::MapCanvasSprite;
use crate::resources::{MapCanvas, MapSettings, MapView};

/// Keep the view's viewport in step with the window's physical size
pub fn sync_viewport(windows: Query<&Window, With<PrimaryWindow>>, mut view: ResMut<MapView>) {
    let Ok(window) = windows.get_single() else {
        return;
    };
    let size = window.physical_size().max(UVec2::ONE);
    if view.viewport != size {
        info!("Viewport resized to {}x{}", size.x, size.y);
        view.viewport = size;
    }
}

/// Rebuild the grid and raster when the viewport changes, and stretch the
/// sprite over the window's logical area
pub fn fit_canvas(
    view: Res<MapView>,
    settings: Res<MapSettings>,
    mut canvas: ResMut<MapCanvas>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut sprites: Query<&mut Sprite, With<MapCanvasSprite>>,
) {
    if !canvas.fit(view.viewport, settings.tile_size) {
        return;
    }
    let Ok(window) = windows.get_single() else {
        return;
    };
    for mut sprite in &mut sprites {
        sprite.custom_size = Some(Vec2::new(window.width(), window.height()));
    }
}
