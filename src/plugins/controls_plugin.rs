use bevy::prelude::*;
use bevy::time::common_conditions::on_timer;
use std::time::Duration;

use crate::systems::controls::{keyboard_controls, mouse_controls};
use crate::systems::debug::{debug_info, toggle_debug_mode};
use crate::systems::window::sync_viewport;

/// Plugin for panning and zooming the map
pub struct ControlsPlugin;

impl Plugin for ControlsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                (keyboard_controls, mouse_controls).before(sync_viewport),
                toggle_debug_mode,
                debug_info.run_if(on_timer(Duration::from_secs(5))),
            ),
        );
    }
}
