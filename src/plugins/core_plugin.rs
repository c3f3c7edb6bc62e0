use bevy::prelude::*;

use crate::resources::{DebugSettings, MapSettings, MapView, TokioRuntime};
use crate::systems::setup::setup;

/// Core plugin that handles settings, the async runtime and the initial view
pub struct CorePlugin;

impl Plugin for CorePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(MapSettings::from_env())
            .insert_resource(TokioRuntime::new())
            .init_resource::<MapView>()
            .init_resource::<DebugSettings>()
            .add_systems(Startup, setup);
    }
}
