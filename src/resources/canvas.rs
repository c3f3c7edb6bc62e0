use bevy::math::UVec2;
use bevy::prelude::*;
use image::Rgba;

use crate::resources::constants::BACKGROUND_RGBA;
use crate::tile_system::{RasterSurface, ViewportGrid};

/// The raster the map is composited into, and the texture that shows it
#[derive(Resource)]
pub struct MapCanvas {
    pub surface: RasterSurface,
    pub grid: ViewportGrid,
    /// Texture shown by the canvas sprite
    pub image: Handle<Image>,
    /// Cache version the surface was last painted from
    pub painted_version: Option<u64>,
}

impl MapCanvas {
    pub fn new(viewport: UVec2, tile_size: u32, image: Handle<Image>) -> Self {
        let viewport = viewport.max(UVec2::ONE);
        Self {
            surface: RasterSurface::new(viewport.x, viewport.y, Rgba(BACKGROUND_RGBA)),
            grid: ViewportGrid::new(viewport, tile_size),
            image,
            painted_version: None,
        }
    }

    /// Rebuild the grid and surface after a viewport or tile size change.
    /// Returns whether anything changed.
    pub fn fit(&mut self, viewport: UVec2, tile_size: u32) -> bool {
        let viewport = viewport.max(UVec2::ONE);
        if self.grid.matches(viewport, tile_size) {
            return false;
        }
        self.grid = ViewportGrid::new(viewport, tile_size);
        self.surface.resize(viewport.x, viewport.y);
        self.painted_version = None;
        true
    }
}
