use bevy::prelude::*;
use std::time::Duration;

/// Constants for the tile map
pub const DEFAULT_TILE_SIZE: u32 = 256;
pub const MIN_VIEW_ZOOM: f64 = 0.0;
pub const MAX_ZOOM_LEVEL: u8 = 19; // Deepest tile zoom most servers offer

pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const DEFAULT_USER_AGENT: &str = concat!("tilecanvas/", env!("CARGO_PKG_VERSION"));
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// Maximum number of tiles to keep in the cache
pub const MAX_CACHED_TILES: usize = 1000;
// Maximum number of concurrent tile loads
pub const MAX_CONCURRENT_FETCHES: usize = 8;

// Groningen, Netherlands
pub const GRONINGEN_LON: f64 = 6.5665;
pub const GRONINGEN_LAT: f64 = 53.2194;
pub const DEFAULT_VIEW_ZOOM: f64 = 9.0;

/// Window size the app opens with
pub const DEFAULT_WINDOW_SIZE: UVec2 = UVec2::new(1280, 720);

/// Canvas fill where no tile is available
pub const BACKGROUND_RGBA: [u8; 4] = [224, 224, 224, 255];

// Panning speed in screen pixels per second
pub const PAN_SPEED: f64 = 600.0;
// View zoom change per second while a zoom key is held
pub const ZOOM_SPEED: f64 = 1.5;
// View zoom change per mouse wheel line
pub const WHEEL_ZOOM_STEP: f64 = 0.25;

