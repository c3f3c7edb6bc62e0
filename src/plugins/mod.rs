mod controls_plugin;
mod core_plugin;
mod tiles_plugin;
mod ui_plugin;

use bevy::app::PluginGroupBuilder;
use bevy::prelude::*;

pub use controls_plugin::ControlsPlugin;
pub use core_plugin::CorePlugin;
pub use tiles_plugin::TilesPlugin;
pub use ui_plugin::UIPlugin;

/// Consolidated plugin struct that groups all application plugins
pub struct AppPlugins;

impl PluginGroup for AppPlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::start::<Self>()
            .add(CorePlugin)
            .add(TilesPlugin::default())
            .add(ControlsPlugin)
            .add(UIPlugin)
    }
}
