use bevy::math::{DVec2, I64Vec2, IVec2};
use image::RgbaImage;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Decoded tile pixels, shared between the cache and whoever draws them
pub type TileImage = Arc<RgbaImage>;

/// Represents a unique tile in the slippy map pyramid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    /// Zoom level (0-19 for most servers)
    pub z: u8,
    /// Column, increasing eastward
    pub x: i64,
    /// Row, increasing southward
    pub y: i64,
}

impl TileKey {
    /// Create a new tile key
    pub fn new(z: u8, x: i64, y: i64) -> Self {
        Self { z, x, y }
    }

    /// Number of tiles along one axis at this key's zoom level, or `None`
    /// past the deepest level an `i64` column can address
    pub fn tiles_per_axis(&self) -> Option<i64> {
        1_i64.checked_shl(self.z as u32).filter(|&n| n > 0)
    }

    /// Check that the key addresses an existing tile
    pub fn is_valid(&self, max_zoom: u8) -> bool {
        if self.z > max_zoom {
            return false;
        }
        self.tiles_per_axis()
            .is_some_and(|n| (0..n).contains(&self.x) && (0..n).contains(&self.y))
    }

    /// The tile at a lower zoom level that contains this one.
    ///
    /// Uses arithmetic shifts, so negative (unwrapped) indices still land in
    /// the correct quadrant. Asking for a higher level returns `self`.
    pub fn ancestor_at(&self, zoom: u8) -> TileKey {
        if zoom >= self.z {
            return *self;
        }
        let shift = (self.z - zoom) as u32;
        let shr = |v: i64| v.checked_shr(shift).unwrap_or(if v < 0 { -1 } else { 0 });
        TileKey::new(zoom, shr(self.x), shr(self.y))
    }

    /// Return the children tiles (one zoom level deeper)
    pub fn children(&self) -> [TileKey; 4] {
        let z = self.z + 1;
        let x = self.x * 2;
        let y = self.y * 2;

        [
            TileKey::new(z, x, y),
            TileKey::new(z, x + 1, y),
            TileKey::new(z, x, y + 1),
            TileKey::new(z, x + 1, y + 1),
        ]
    }

    /// Apply the wrap flags and validate.
    ///
    /// Returns `None` for keys that can never be requested, which callers treat
    /// as "nothing to show here".
    pub fn normalized(self, wrap: WrapMode, max_zoom: u8) -> Option<TileKey> {
        if self.z > max_zoom {
            return None;
        }
        let n = self.tiles_per_axis()?;
        let key = TileKey {
            z: self.z,
            x: if wrap.horizontal { self.x.rem_euclid(n) } else { self.x },
            y: if wrap.vertical { self.y.rem_euclid(n) } else { self.y },
        };
        key.is_valid(max_zoom).then_some(key)
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Where the view center sits, recorded at one whole zoom level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceTile {
    /// Fractional tile position of the view center
    pub position: DVec2,
    /// Zoom level the position was computed at
    pub zoom: u8,
}

impl ReferenceTile {
    pub fn new(position: DVec2, zoom: u8) -> Self {
        Self { position, zoom }
    }

    /// The same point expressed at another zoom level
    pub fn position_at(&self, zoom: u8) -> DVec2 {
        crate::tile_system::coords::rescale(self.position, self.zoom, zoom)
    }

    /// Whole tile numbers of the view center at `zoom`
    pub fn whole_at(&self, zoom: u8) -> I64Vec2 {
        crate::tile_system::coords::whole_tile_numbers(self.position_at(zoom))
    }

    /// Unwrapped, unvalidated key of the tile `offset` cells away from the
    /// center tile at `zoom`
    pub fn key_at(&self, zoom: u8, offset: IVec2) -> TileKey {
        let whole = self.whole_at(zoom);
        TileKey::new(
            zoom,
            whole.x.saturating_add(offset.x as i64),
            whole.y.saturating_add(offset.y as i64),
        )
    }
}

/// Horizontal/vertical wraparound flags supplied with the view state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapMode {
    pub horizontal: bool,
    pub vertical: bool,
}

impl Default for WrapMode {
    fn default() -> Self {
        Self {
            horizontal: true,
            vertical: false,
        }
    }
}

impl WrapMode {
    pub const NONE: WrapMode = WrapMode {
        horizontal: false,
        vertical: false,
    };
}

/// A destination rectangle on the drawing surface, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Whether any part of the rectangle falls inside `0..width x 0..height`
    pub fn intersects_viewport(&self, width: f64, height: f64) -> bool {
        self.x < width && self.y < height && self.x + self.width > 0.0 && self.y + self.height > 0.0
    }
}

/// Error type for tile-related operations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TileError {
    /// Tile wasn't found (404)
    #[error("tile not found")]
    NotFound,
    /// Failed to download the tile
    #[error("download failed: {0}")]
    DownloadFailed(String),
    /// Bytes arrived but are not a decodable image
    #[error("failed to decode tile image: {0}")]
    Decode(String),
    /// URL template lacks a required placeholder
    #[error("invalid tile url template `{0}`: expected {{z}}, {{x}} and {{y}}")]
    InvalidTemplate(String),
    /// Projection code we have no transform for
    #[error("unknown projection code `{0}`")]
    UnknownProjection(String),
}
