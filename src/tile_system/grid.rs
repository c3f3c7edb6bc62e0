use bevy::math::{IVec2, UVec2};

/// Extra rings of cells kept around the visible area so a view center sitting
/// anywhere inside the center tile still leaves no uncovered edge.
const MARGIN_RINGS: u32 = 1;

/// Step directions of the spiral in screen space (y grows downward):
/// right, up, left, down.
const SPIRAL_DIRECTIONS: [IVec2; 4] = [IVec2::new(1, 0), IVec2::new(0, -1), IVec2::new(-1, 0), IVec2::new(0, 1)];

/// Offsets around the center cell ordered center-outward.
///
/// Starts at (0,0), steps right, then turns counter-clockwise with run
/// lengths 1,1,2,2,3,3,... The square of side `max(width, height)` is then
/// cut down to `dx in (-ceil(w/2), floor(w/2)]` and likewise for `dy`.
///
/// # Panics
///
/// When either dimension is zero.
pub fn spiral_offsets(width: u32, height: u32) -> Vec<IVec2> {
    assert!(width > 0 && height > 0, "spiral dimensions must be positive, got {width}x{height}");

    let side = width.max(height);
    // Even sides are generated as the next odd square and trimmed
    let odd_side = side | 1;
    let total = (odd_side as usize) * (odd_side as usize);

    let (min_x, max_x) = axis_bounds(width);
    let (min_y, max_y) = axis_bounds(height);
    let in_bounds = |p: IVec2| (min_x..=max_x).contains(&p.x) && (min_y..=max_y).contains(&p.y);

    let mut offsets = Vec::with_capacity((width * height) as usize);
    let mut pos = IVec2::ZERO;
    let mut visited = 1;
    let mut run = 1;
    let mut direction = 0;
    offsets.push(pos);

    while visited < total {
        for _ in 0..2 {
            for _ in 0..run {
                if visited == total {
                    break;
                }
                pos += SPIRAL_DIRECTIONS[direction];
                visited += 1;
                if in_bounds(pos) {
                    offsets.push(pos);
                }
            }
            direction = (direction + 1) % SPIRAL_DIRECTIONS.len();
        }
        run += 1;
    }

    offsets
}

fn axis_bounds(count: u32) -> (i32, i32) {
    let count = count as i32;
    (1 - (count + 1) / 2, count / 2)
}

/// Odd number of tiles needed across `viewport_px`, centered on the view
pub fn tiles_across(viewport_px: u32, tile_px: u32) -> u32 {
    assert!(tile_px > 0, "tile size must be positive");
    1 + 2 * (viewport_px as f64 / 2.0 / tile_px as f64).round() as u32
}

/// The set of cells a frame works over, for one viewport/tile size pair
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportGrid {
    pixel_size: UVec2,
    tile_size: u32,
    tiles: UVec2,
    cells: Vec<IVec2>,
}

impl ViewportGrid {
    pub fn new(pixel_size: UVec2, tile_size: u32) -> Self {
        let tiles = UVec2::new(
            tiles_across(pixel_size.x, tile_size) + 2 * MARGIN_RINGS,
            tiles_across(pixel_size.y, tile_size) + 2 * MARGIN_RINGS,
        );
        Self {
            pixel_size,
            tile_size,
            tiles,
            cells: spiral_offsets(tiles.x, tiles.y),
        }
    }

    pub fn pixel_size(&self) -> UVec2 {
        self.pixel_size
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Grid dimensions in cells, margin rings included; see [`tiles_across`]
    /// for the bare count that spans the viewport
    pub fn tiles(&self) -> UVec2 {
        self.tiles
    }

    /// Cell offsets, closest to the center first
    pub fn cells(&self) -> &[IVec2] {
        &self.cells
    }

    /// Whether this grid was built for the given sizes
    pub fn matches(&self, pixel_size: UVec2, tile_size: u32) -> bool {
        self.pixel_size == pixel_size && self.tile_size == tile_size
    }
}
