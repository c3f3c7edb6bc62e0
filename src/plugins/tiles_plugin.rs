use bevy::prelude::*;
use std::sync::Arc;

use crate::resources::MapView;
use crate::systems::tiles::{fetch_tiles, receive_tiles, render_map};
use crate::systems::window::{fit_canvas, sync_viewport};
use crate::tile_system::{TileLoader, TileSystemPlugin};

/// Plugin for fetching, caching and compositing map tiles
#[derive(Default)]
pub struct TilesPlugin {
    loader: Option<Arc<dyn TileLoader>>,
}

impl TilesPlugin {
    /// Load tiles through `loader` instead of HTTP
    pub fn with_loader(loader: Arc<dyn TileLoader>) -> Self {
        Self { loader: Some(loader) }
    }
}

impl Plugin for TilesPlugin {
    fn build(&self, app: &mut App) {
        let tile_system = match &self.loader {
            Some(loader) => TileSystemPlugin::with_loader(Arc::clone(loader)),
            None => TileSystemPlugin::default(),
        };

        app.add_plugins(tile_system).add_systems(
            Update,
            (
                sync_viewport,
                (fit_canvas, fetch_tiles).chain().run_if(resource_changed::<MapView>),
                receive_tiles,
                render_map,
            )
                .chain(),
        );
    }
}
