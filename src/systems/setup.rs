use bevy::math::UVec2;
use bevy::prelude::*;
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use bevy::window::PrimaryWindow;

use crate::components::MapCanvasSprite;
use crate::debug_log;
use crate::resources::{DebugSettings, MapCanvas, MapSettings, MapView};

/// Wrap RGBA8 pixels in a texture the sprite renderer can sample
pub fn create_canvas_image(pixels: &[u8], size: UVec2) -> Image {
    let extent = Extent3d {
        width: size.x,
        height: size.y,
        depth_or_array_layers: 1,
    };

    Image::new(
        extent,
        TextureDimension::D2,
        pixels.to_vec(),
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::RENDER_WORLD | RenderAssetUsages::MAIN_WORLD,
    )
}

/// Spawn the camera and the sprite the map is painted into
pub fn setup(
    mut commands: Commands,
    mut images: ResMut<Assets<Image>>,
    mut view: ResMut<MapView>,
    settings: Res<MapSettings>,
    debug_settings: Res<DebugSettings>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    let mut logical_size = None;
    if let Ok(window) = windows.get_single() {
        view.viewport = window.physical_size().max(UVec2::ONE);
        logical_size = Some(Vec2::new(window.width(), window.height()));
    }

    let mut canvas = MapCanvas::new(view.viewport, settings.tile_size, Handle::default());
    let size = UVec2::new(canvas.surface.width(), canvas.surface.height());
    canvas.image = images.add(create_canvas_image(canvas.surface.as_raw(), size));

    commands.spawn(Camera2d);
    commands.spawn((
        Sprite {
            custom_size: logical_size,
            ..Sprite::from_image(canvas.image.clone())
        },
        Transform::default(),
        MapCanvasSprite,
    ));

    let lon_lat = view.lon_lat();
    info!(
        "Map centered on {:.4}, {:.4} at zoom {:.2} ({}x{} px)",
        lon_lat.x, lon_lat.y, view.zoom, size.x, size.y
    );
    debug_log!(
        debug_settings,
        "Viewport grid {}x{} cells, tile zoom {}",
        canvas.grid.tiles().x,
        canvas.grid.tiles().y,
        view.whole_zoom(settings.tile_size)
    );

    commands.insert_resource(canvas);
}
