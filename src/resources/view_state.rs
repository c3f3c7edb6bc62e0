use bevy::math::{DVec2, UVec2};
use bevy::prelude::*;

use crate::resources::constants::{DEFAULT_VIEW_ZOOM, DEFAULT_WINDOW_SIZE, GRONINGEN_LAT, GRONINGEN_LON, MIN_VIEW_ZOOM};
use crate::tile_system::coords::{base_zoom_for_viewport, fractional_tile_numbers, Projection, ProjectionCode};
use crate::tile_system::{FrameParams, ReferenceTile, WrapMode};

/// The view the map is drawn for. Systems that change any of these fields
/// trigger a re-render through change detection.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct MapView {
    /// View center in `projection` coordinates
    pub center: DVec2,
    /// View zoom; 0 shows the whole world across the viewport width
    pub zoom: f64,
    /// Viewport size in physical pixels
    pub viewport: UVec2,
    pub projection: ProjectionCode,
    pub wrap: WrapMode,
}

impl Default for MapView {
    fn default() -> Self {
        Self::centered_on(
            DVec2::new(GRONINGEN_LON, GRONINGEN_LAT),
            DEFAULT_VIEW_ZOOM,
            DEFAULT_WINDOW_SIZE,
        )
    }
}

impl MapView {
    /// Web-Mercator view centered on a longitude/latitude
    pub fn centered_on(lon_lat: DVec2, zoom: f64, viewport: UVec2) -> Self {
        let projection = ProjectionCode::WebMercator;
        Self {
            center: projection.from_lon_lat(lon_lat),
            zoom,
            viewport,
            projection,
            wrap: WrapMode::default(),
        }
    }

    /// Fractional tile zoom the view maps onto
    pub fn tile_zoom(&self, tile_size: u32) -> f64 {
        base_zoom_for_viewport(self.viewport.x, tile_size) as f64 + self.zoom
    }

    /// Whole tile zoom used for fetching
    pub fn whole_zoom(&self, tile_size: u32) -> u8 {
        self.tile_zoom(tile_size).floor().clamp(0.0, u8::MAX as f64) as u8
    }

    /// Largest view zoom whose tiles the server still has
    pub fn max_view_zoom(&self, tile_size: u32, max_zoom: u8) -> f64 {
        (max_zoom as f64 - base_zoom_for_viewport(self.viewport.x, tile_size) as f64).max(MIN_VIEW_ZOOM)
    }

    /// View center as a fractional tile position at the whole tile zoom
    pub fn reference_tile(&self, tile_size: u32) -> ReferenceTile {
        let zoom = self.whole_zoom(tile_size);
        ReferenceTile::new(fractional_tile_numbers(self.center, &self.projection, zoom), zoom)
    }

    pub fn frame_params(&self, tile_size: u32, max_zoom: u8) -> FrameParams {
        FrameParams::new(self.reference_tile(tile_size), self.tile_zoom(tile_size), self.wrap, max_zoom)
    }

    pub fn lon_lat(&self) -> DVec2 {
        self.projection.to_lon_lat(self.center)
    }
}
