//! Slippy-map tile engine: coordinate math, viewport grid, tile cache,
//! asynchronous fetching and multi-resolution compositing.

use bevy::prelude::*;
use std::sync::Arc;

pub mod cache;
pub mod coords;
pub mod fetcher;
pub mod grid;
pub mod loader;
pub mod rendering;
pub mod types;

// Re-export main types
pub use cache::TileImageCache;
pub use coords::{Projection, ProjectionCode};
pub use fetcher::{FetchStats, FetchToken, FetcherConfig, TileFetcher};
pub use grid::{spiral_offsets, tiles_across, ViewportGrid};
pub use loader::{decode_tile, HttpTileLoader, TileLoader, UrlTemplate};
pub use rendering::{paint, plan_frame, DrawCommand, DrawingSurface, FrameParams, RasterSurface};
pub use types::{PixelRect, ReferenceTile, TileError, TileImage, TileKey, WrapMode};

use crate::resources::{MapSettings, TokioRuntime};

/// Installs the tile cache and fetcher resources.
///
/// Uses the app's [`MapSettings`] and [`TokioRuntime`], inserting defaults
/// when they are missing. Loads go over HTTP unless a loader is supplied.
#[derive(Default)]
pub struct TileSystemPlugin {
    loader: Option<Arc<dyn TileLoader>>,
}

impl TileSystemPlugin {
    pub fn with_loader(loader: Arc<dyn TileLoader>) -> Self {
        Self { loader: Some(loader) }
    }
}

impl Plugin for TileSystemPlugin {
    fn build(&self, app: &mut App) {
        let settings = match app.world().get_resource::<MapSettings>() {
            Some(settings) => settings.clone(),
            None => {
                let settings = MapSettings::from_env();
                app.insert_resource(settings.clone());
                settings
            }
        };
        let runtime = app
            .world_mut()
            .get_resource_or_insert_with(TokioRuntime::new)
            .handle();

        let loader = match &self.loader {
            Some(loader) => Arc::clone(loader),
            None => {
                let http = HttpTileLoader::new(&settings.user_agent, settings.request_timeout)
                    .unwrap_or_else(|e| panic!("Failed to build HTTP client: {e}"));
                Arc::new(http) as Arc<dyn TileLoader>
            }
        };

        info!(
            "Tile source {} (max zoom {}, cache {} tiles, {} concurrent loads)",
            settings.url_template.as_str(),
            settings.max_zoom,
            settings.cache_capacity,
            settings.max_concurrent_fetches
        );

        app.insert_resource(TileImageCache::with_capacity(settings.cache_capacity))
            .insert_resource(TileFetcher::new(loader, runtime, settings.fetcher_config()));
    }
}
