//! Slippy-map viewer: composites raster tiles from a tile server onto a
//! pannable, zoomable canvas, filling gaps with coarser or finer cached tiles
//! while loads are in flight.

pub mod components;
pub mod plugins;
pub mod resources;
pub mod systems;
pub mod tile_system;
pub mod utils;
