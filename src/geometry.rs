//! Tile tessellation for images larger than one hardware texture
//!
//! The rasterizer can only address a bounded window of texels per binding.
//! [`tessellate`] cuts the source rectangle of an image into cells aligned to
//! that limit and produces one transformed quad per cell, with texture
//! coordinates relative to the cell's own origin. [`draw_image`] binds each
//! cell and submits its quad.

use crate::math::{sin_cos_degrees, Vec2};
use crate::raster::{Quad, QuadVertex, RasterContext, Rasterizer, WrapMode};
use crate::texture::Image;

/// Largest texture window the hardware samples from, per axis
pub const HARDWARE_TILE_LIMIT: u32 = 512;

/// Maximum width and height of a single texture binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileLimit {
    pub width: u32,
    pub height: u32,
}

impl TileLimit {
    pub const HARDWARE: TileLimit = TileLimit {
        width: HARDWARE_TILE_LIMIT,
        height: HARDWARE_TILE_LIMIT,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn square(size: u32) -> Self {
        Self::new(size, size)
    }

    /// True when an image of this size fits one binding
    pub fn fits(&self, width: u32, height: u32) -> bool {
        width <= self.width && height <= self.height
    }
}

impl Default for TileLimit {
    fn default() -> Self {
        Self::HARDWARE
    }
}

/// Addressing window of one cell, in source pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// A cell's texture window and the quad that draws it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileQuad {
    pub tile: Tile,
    pub quad: Quad,
}

/// Maps a source coordinate on one axis to an offset from the anchor
///
/// `step` carries the scale with the sign of the axis direction, so a
/// mirrored rectangle runs the same arithmetic with a negative step.
/// Coordinates are widened to i64 so rectangles spanning the whole i32 range
/// stay representable.
#[derive(Debug, Clone, Copy)]
struct AxisMap {
    origin: i64,
    base: f32,
    step: f32,
}

impl AxisMap {
    fn new(first: i32, last: i32, scale: f32, pivot: f32) -> Self {
        let sign = if first > last { -1.0 } else { 1.0 };
        Self {
            origin: first as i64,
            base: -pivot * scale,
            step: sign * scale,
        }
    }

    fn offset(&self, coord: i64) -> f32 {
        self.base + (coord - self.origin) as f32 * self.step
    }
}

/// One limit-aligned slice of an axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Band {
    /// Aligned origin of the texture window
    start: i64,
    /// Sampled extent, `start <= lo < hi <= start + limit`
    lo: i64,
    hi: i64,
}

/// Walks [min, max) in bands aligned to multiples of `limit`
struct Bands {
    next_start: i64,
    lo: i64,
    end: i64,
    limit: i64,
}

impl Bands {
    fn new(min: i64, max: i64, limit: u32) -> Self {
        let limit = limit.max(1) as i64;
        Self {
            next_start: min - min.rem_euclid(limit),
            lo: min,
            end: max,
            limit,
        }
    }

    /// Bands of [min, max) whose aligned origin lies inside an axis of `size` pixels
    fn within(min: i32, max: i32, size: u32, limit: u32) -> Self {
        let step = limit.max(1) as i64;
        let covered = (size as i64 + step - 1) / step * step;
        Self::new((min as i64).max(0), (max as i64).min(covered), limit)
    }
}

impl Iterator for Bands {
    type Item = Band;

    fn next(&mut self) -> Option<Band> {
        if self.lo >= self.end {
            return None;
        }
        let start = self.next_start;
        let hi = (start + self.limit).min(self.end);
        let band = Band { start, lo: self.lo, hi };
        self.next_start = start + self.limit;
        self.lo = hi;
        Some(band)
    }
}

/// Whether `image` must be split into several texture windows
pub fn needs_tiling(image: &Image, limit: TileLimit) -> bool {
    !limit.fits(image.width(), image.height())
}

/// Cut the image's source rectangle into transformed, tile-bounded quads
///
/// Returns nothing for a zero scale or an empty rectangle. Cells whose
/// aligned origin falls outside the image are skipped; the remaining cells
/// are placed independently, so skipping never shifts their neighbours.
pub fn tessellate(image: &Image, limit: TileLimit) -> Vec<TileQuad> {
    let t = &image.transform;
    if t.is_degenerate() {
        tracing::trace!("skipping degenerate draw of {}x{} image", image.width(), image.height());
        return Vec::new();
    }

    let (sin, cos) = sin_cos_degrees(t.angle);
    let anchor = Vec2::new(t.x, t.y);
    let map_x = AxisMap::new(t.rect.x0, t.rect.x1, t.scale_x, t.center_x);
    let map_y = AxisMap::new(t.rect.y0, t.rect.y1, t.scale_y, t.center_y);
    let place = |cx: i64, cy: i64| Vec2::new(map_x.offset(cx), map_y.offset(cy)).rotate(sin, cos) + anchor;

    let corner = |u: i64, v: i64, origin: (i64, i64)| {
        let p = place(u, v);
        QuadVertex {
            u: (u - origin.0) as f32,
            v: (v - origin.1) as f32,
            x: p.x,
            y: p.y,
            z: 0.0,
        }
    };

    if !needs_tiling(image, limit) {
        let r = t.rect;
        let (x0, y0, x1, y1) = (r.x0 as i64, r.y0 as i64, r.x1 as i64, r.y1 as i64);
        let quad = Quad {
            vertices: [
                corner(x0, y0, (0, 0)),
                corner(x1, y0, (0, 0)),
                corner(x0, y1, (0, 0)),
                corner(x1, y1, (0, 0)),
            ],
        };
        let tile = Tile {
            x: 0,
            y: 0,
            width: image.real_width(),
            height: image.real_height(),
        };
        return vec![TileQuad { tile, quad }];
    }

    // Only cells whose origin lies inside the image are walked
    let (x_min, x_max) = t.rect.ordered_x();
    let (y_min, y_max) = t.rect.ordered_y();

    let mut out = Vec::new();
    for row in Bands::within(y_min, y_max, image.height(), limit.height) {
        for col in Bands::within(x_min, x_max, image.width(), limit.width) {
            let origin = (col.start, row.start);
            let quad = Quad {
                vertices: [
                    corner(col.lo, row.lo, origin),
                    corner(col.hi, row.lo, origin),
                    corner(col.lo, row.hi, origin),
                    corner(col.hi, row.hi, origin),
                ],
            };
            let tile = Tile {
                x: col.start as i32,
                y: row.start as i32,
                width: (col.hi - col.start) as u32,
                height: (row.hi - row.start) as u32,
            };
            out.push(TileQuad { tile, quad });
        }
    }
    out
}

/// Draw an image through `ctx`, tiling it when it exceeds `limit`
///
/// Tiled draws clamp texture addressing at cell edges and restore the
/// previous wrap modes before returning. Returns the number of quads drawn.
pub fn draw_image<R: Rasterizer>(ctx: &mut RasterContext<R>, image: &Image, limit: TileLimit) -> usize {
    if image.transform.is_degenerate() {
        return 0;
    }

    let cells = tessellate(image, limit);
    if !needs_tiling(image, limit) {
        for cell in &cells {
            ctx.set_texture_part(image, 0, 0, image.real_width(), image.real_height());
            ctx.draw_quad(&cell.quad);
        }
        return cells.len();
    }

    let mut ctx = ctx.scoped_wrap(WrapMode::Clamp, WrapMode::Clamp);
    for cell in &cells {
        ctx.set_texture_part(image, cell.tile.x as u32, cell.tile.y as u32, limit.width, limit.height);
        ctx.draw_quad(&cell.quad);
    }
    tracing::debug!(
        "drew {}x{} image as {} tiles of at most {}x{}",
        image.width(),
        image.height(),
        cells.len(),
        limit.width,
        limit.height
    );
    cells.len()
}
