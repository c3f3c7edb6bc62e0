use bevy::prelude::*;
use bevy::time::common_conditions::on_timer;
use std::time::Duration;

use crate::systems::ui::{setup_ui, update_zoom_level_text};

/// Plugin for the on-screen zoom and scale readout
pub struct UIPlugin;

impl Plugin for UIPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_ui)
            // Update the readout at 4 Hz (250ms)
            .add_systems(
                Update,
                update_zoom_level_text.run_if(on_timer(Duration::from_millis(250))),
            );
    }
}
