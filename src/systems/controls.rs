use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::math::DVec2;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::resources::constants::{MIN_VIEW_ZOOM, PAN_SPEED, WHEEL_ZOOM_STEP, ZOOM_SPEED};
use crate::resources::{MapSettings, MapView};
use crate::utils::coordinate_conversion::{pan_by_pixels, zoom_around};

/// Pixel-mode wheel deltas per line-mode step
const PIXELS_PER_LINE: f64 = 100.0;

/// Arrow keys / WASD pan, +/- (or Q/E) zoom around the view center
pub fn keyboard_controls(
    time: Res<Time>,
    keyboard_input: Res<ButtonInput<KeyCode>>,
    settings: Res<MapSettings>,
    mut view: ResMut<MapView>,
) {
    let delta = time.delta_secs() as f64;
    let boost = if keyboard_input.pressed(KeyCode::ShiftLeft) { 3.0 } else { 1.0 };

    let mut direction = DVec2::ZERO;
    if keyboard_input.any_pressed([KeyCode::ArrowLeft, KeyCode::KeyA]) {
        direction.x -= 1.0;
    }
    if keyboard_input.any_pressed([KeyCode::ArrowRight, KeyCode::KeyD]) {
        direction.x += 1.0;
    }
    if keyboard_input.any_pressed([KeyCode::ArrowUp, KeyCode::KeyW]) {
        direction.y -= 1.0;
    }
    if keyboard_input.any_pressed([KeyCode::ArrowDown, KeyCode::KeyS]) {
        direction.y += 1.0;
    }

    let mut zoom_change = 0.0;
    if keyboard_input.any_pressed([KeyCode::Equal, KeyCode::NumpadAdd, KeyCode::KeyE]) {
        zoom_change += ZOOM_SPEED * delta;
    }
    if keyboard_input.any_pressed([KeyCode::Minus, KeyCode::NumpadSubtract, KeyCode::KeyQ]) {
        zoom_change -= ZOOM_SPEED * delta;
    }

    if direction != DVec2::ZERO {
        let step = direction.normalize() * PAN_SPEED * boost * delta;
        pan_by_pixels(&mut view, step, settings.tile_size);
    }
    if zoom_change != 0.0 {
        let max_zoom = view.max_view_zoom(settings.tile_size, settings.max_zoom);
        let zoom = (view.zoom + zoom_change).clamp(MIN_VIEW_ZOOM, max_zoom);
        if zoom != view.zoom {
            view.zoom = zoom;
        }
    }
}

/// Mouse wheel zooms around the cursor, left-drag pans
pub fn mouse_controls(
    mut wheel_events: EventReader<MouseWheel>,
    mut motion_events: EventReader<MouseMotion>,
    mouse_input: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    settings: Res<MapSettings>,
    mut view: ResMut<MapView>,
) {
    let Ok(window) = windows.get_single() else {
        wheel_events.clear();
        motion_events.clear();
        return;
    };
    let scale = window.scale_factor() as f64;

    let steps: f64 = wheel_events
        .read()
        .map(|event| match event.unit {
            MouseScrollUnit::Line => event.y as f64,
            MouseScrollUnit::Pixel => event.y as f64 / PIXELS_PER_LINE,
        })
        .sum();
    if steps != 0.0 {
        let max_zoom = view.max_view_zoom(settings.tile_size, settings.max_zoom);
        let zoom = (view.zoom + steps * WHEEL_ZOOM_STEP).clamp(MIN_VIEW_ZOOM, max_zoom);
        if zoom != view.zoom {
            match window.physical_cursor_position() {
                Some(cursor) => zoom_around(&mut view, cursor.as_dvec2(), zoom, settings.tile_size),
                None => view.zoom = zoom,
            }
        }
    }

    let dragged: Vec2 = motion_events.read().map(|event| event.delta).sum();
    if mouse_input.pressed(MouseButton::Left) && dragged != Vec2::ZERO {
        // Content follows the cursor, so the center moves the other way
        pan_by_pixels(&mut view, -dragged.as_dvec2() * scale, settings.tile_size);
    }
}
