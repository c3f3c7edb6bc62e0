use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::window::WindowResolution;

use tilecanvas::plugins::AppPlugins;
use tilecanvas::resources::constants::DEFAULT_WINDOW_SIZE;

fn main() {
    App::new()
        .add_plugins(
            DefaultPlugins
                .set(LogPlugin {
                    filter: "info,wgpu=error,naga=warn,tilecanvas=debug".to_string(),
                    ..default()
                })
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "tilecanvas".to_string(),
                        resolution: WindowResolution::new(
                            DEFAULT_WINDOW_SIZE.x as f32,
                            DEFAULT_WINDOW_SIZE.y as f32,
                        ),
                        ..default()
                    }),
                    ..default()
                }),
        )
        .add_plugins(AppPlugins)
        .run();
}
