//! Multi-resolution compositing of cached tiles.
//!
//! [`plan_frame`] decides, per grid cell and cached zoom level, which tiles to
//! draw and where. It reads the cache and view but never mutates anything,
//! so it can run whenever the cache version or the view changes. [`paint`]
//! replays the plan against a [`DrawingSurface`].

use bevy::math::{DVec2, IVec2};
use image::{Pixel, Rgba, RgbaImage};
use std::collections::HashSet;

use crate::tile_system::cache::TileImageCache;
use crate::tile_system::grid::ViewportGrid;
use crate::tile_system::types::{PixelRect, ReferenceTile, TileKey, WrapMode};

/// Everything about the view a frame depends on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    /// View center recorded at the whole tile zoom
    pub reference: ReferenceTile,
    /// Fractional tile zoom; `reference.zoom` is its floor
    pub zoom: f64,
    pub wrap: WrapMode,
    pub max_zoom: u8,
}

impl FrameParams {
    pub fn new(reference: ReferenceTile, zoom: f64, wrap: WrapMode, max_zoom: u8) -> Self {
        Self {
            reference,
            zoom,
            wrap,
            max_zoom,
        }
    }

    /// Where the tile `cell` steps from the center tile lands at `level`
    fn destination(&self, grid: &ViewportGrid, level: u8, cell: IVec2) -> PixelRect {
        let size = 2.0_f64.powf(self.zoom - level as f64) * grid.tile_size() as f64;
        let position = self.reference.position_at(level);
        let fraction = position - position.floor();
        let center = grid.pixel_size().as_dvec2() / 2.0;
        let origin = center + (cell.as_dvec2() - fraction) * size;
        PixelRect::new(origin.x, origin.y, size, size)
    }
}

/// One step of a frame, in the order it must be applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    /// Wipe a cell nothing was selected for
    Clear(PixelRect),
    /// Draw the cached image for `key` scaled into `dest`. `bottom` is set
    /// when no selected coarser tile lies beneath it this frame.
    Draw { key: TileKey, dest: PixelRect, bottom: bool },
}

/// A 2D raster target sized to the viewport
pub trait DrawingSurface {
    /// Composite `image` over what is already in `dest`
    fn draw_image(&mut self, image: &RgbaImage, dest: PixelRect);
    fn clear(&mut self, dest: PixelRect);

    /// Draw with nothing of the previous frame showing through transparent pixels
    fn replace_image(&mut self, image: &RgbaImage, dest: PixelRect) {
        self.clear(dest);
        self.draw_image(image, dest);
    }
}

/// Plan a frame: clears first, then draws from the lowest zoom level up so
/// sharper tiles land on top of their blurrier stand-ins.
pub fn plan_frame(frame: &FrameParams, cache: &TileImageCache, grid: &ViewportGrid) -> Vec<DrawCommand> {
    let viewport = grid.pixel_size().as_dvec2();
    let levels = cache.available_zoom_levels();

    let mut selected: HashSet<TileKey> = HashSet::new();
    let mut draws = Vec::new();

    for (index, &level) in levels.iter().enumerate() {
        let lower = &levels[..index];
        for &cell in grid.cells() {
            let Some(key) = frame
                .reference
                .key_at(level, cell)
                .normalized(frame.wrap, frame.max_zoom)
            else {
                continue;
            };
            if !cache.has(&key) {
                continue;
            }
            if !should_render(key, frame.zoom, lower, cache) {
                continue;
            }

            let bottom = !lower.iter().any(|&l| selected.contains(&key.ancestor_at(l)));
            selected.insert(key);
            let dest = frame.destination(grid, level, cell);
            if dest.intersects_viewport(viewport.x, viewport.y) {
                draws.push(DrawCommand::Draw { key, dest, bottom });
            }
        }
    }

    let mut commands = clears(frame, grid, &selected);
    commands.append(&mut draws);
    commands
}

/// Selection rules for a cached tile at `key.z`, given the cached levels
/// below it (ascending).
fn should_render(key: TileKey, zoom: f64, lower: &[u8], cache: &TileImageCache) -> bool {
    let ancestor = lower
        .iter()
        .rev()
        .copied()
        .find(|&level| cache.has(&key.ancestor_at(level)));

    let Some(ancestor) = ancestor else {
        // Nothing coarser covers this spot
        return true;
    };
    let level = key.z as f64;
    if level > zoom {
        // Scaled-down tiles stacked on a coarser one
        return false;
    }
    (level - zoom).abs() <= (ancestor as f64 - zoom).abs()
}

/// Clears for on-screen cells at the whole zoom that no selected tile at or
/// below that zoom covers
fn clears(frame: &FrameParams, grid: &ViewportGrid, selected: &HashSet<TileKey>) -> Vec<DrawCommand> {
    let viewport = grid.pixel_size().as_dvec2();
    let whole = frame.reference.zoom;
    let covering_levels: Vec<u8> = {
        let mut levels: Vec<u8> = selected.iter().map(|key| key.z).filter(|&z| z <= whole).collect();
        levels.sort_unstable();
        levels.dedup();
        levels
    };

    grid.cells()
        .iter()
        .filter_map(|&cell| {
            let dest = frame.destination(grid, whole, cell);
            if !dest.intersects_viewport(viewport.x, viewport.y) {
                return None;
            }
            let covered = frame
                .reference
                .key_at(whole, cell)
                .normalized(frame.wrap, frame.max_zoom)
                .is_some_and(|key| {
                    covering_levels
                        .iter()
                        .any(|&level| selected.contains(&key.ancestor_at(level)))
                });
            (!covered).then_some(DrawCommand::Clear(dest))
        })
        .collect()
}

/// Apply planned commands. Draws whose tile was evicted since planning are skipped.
pub fn paint(commands: &[DrawCommand], cache: &TileImageCache, surface: &mut dyn DrawingSurface) {
    for command in commands {
        match *command {
            DrawCommand::Clear(dest) => surface.clear(dest),
            DrawCommand::Draw { key, dest, bottom } => {
                let Some(image) = cache.get(&key) else {
                    continue;
                };
                if bottom {
                    surface.replace_image(image, dest);
                } else {
                    surface.draw_image(image, dest);
                }
            }
        }
    }
}

/// Software drawing surface backed by an RGBA buffer
pub struct RasterSurface {
    pixels: RgbaImage,
    background: Rgba<u8>,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32, background: Rgba<u8>) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, background),
            background,
        }
    }

    /// Reallocate for a new viewport size, filled with the background
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.pixels.dimensions() != (width, height) {
            self.pixels = RgbaImage::from_pixel(width, height, self.background);
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Raw RGBA8 bytes, row-major
    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Integer pixel span of `dest` clipped to the surface
    fn clip(&self, dest: PixelRect) -> Option<(u32, u32, u32, u32)> {
        let x0 = dest.x.floor().max(0.0);
        let y0 = dest.y.floor().max(0.0);
        let x1 = (dest.x + dest.width).ceil().min(self.width() as f64);
        let y1 = (dest.y + dest.height).ceil().min(self.height() as f64);
        (x0 < x1 && y0 < y1).then(|| (x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }

    #[cfg(feature = "tile_debug")]
    fn outline(&mut self, dest: PixelRect) {
        const OUTLINE: Rgba<u8> = Rgba([255, 0, 255, 255]);
        let Some((x0, y0, x1, y1)) = self.clip(dest) else {
            return;
        };
        let left = dest.x.round() as i64;
        let top = dest.y.round() as i64;
        for y in y0..y1 {
            for x in x0..x1 {
                if x as i64 == left || y as i64 == top {
                    self.pixels.put_pixel(x, y, OUTLINE);
                }
            }
        }
    }
}

impl RasterSurface {
    /// Nearest-neighbour scaled copy. Each covered pixel is blended over its
    /// current value, or over the background when `replace` is set.
    fn composite(&mut self, image: &RgbaImage, dest: PixelRect, replace: bool) {
        if image.width() == 0 || image.height() == 0 || dest.width <= 0.0 || dest.height <= 0.0 {
            return;
        }
        let Some((x0, y0, x1, y1)) = self.clip(dest) else {
            return;
        };

        let scale = DVec2::new(
            image.width() as f64 / dest.width,
            image.height() as f64 / dest.height,
        );
        for y in y0..y1 {
            let v = ((y as f64 + 0.5 - dest.y) * scale.y).floor();
            if v < 0.0 || v >= image.height() as f64 {
                continue;
            }
            for x in x0..x1 {
                let u = ((x as f64 + 0.5 - dest.x) * scale.x).floor();
                if u < 0.0 || u >= image.width() as f64 {
                    continue;
                }
                let source = *image.get_pixel(u as u32, v as u32);
                let pixel = self.pixels.get_pixel_mut(x, y);
                if replace {
                    *pixel = self.background;
                }
                pixel.blend(&source);
            }
        }

        #[cfg(feature = "tile_debug")]
        self.outline(dest);
    }
}

impl DrawingSurface for RasterSurface {
    fn draw_image(&mut self, image: &RgbaImage, dest: PixelRect) {
        self.composite(image, dest, false);
    }

    /// Only pixels the image actually samples are reset, so neighbouring
    /// tiles sharing a fractional edge keep their pixels
    fn replace_image(&mut self, image: &RgbaImage, dest: PixelRect) {
        self.composite(image, dest, true);
    }

    fn clear(&mut self, dest: PixelRect) {
        let Some((x0, y0, x1, y1)) = self.clip(dest) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                self.pixels.put_pixel(x, y, self.background);
            }
        }
    }
}
