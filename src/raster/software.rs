//! Software rasterizer backend
//! Fills textured quads into an RGBA framebuffer, sampling with the same
//! addressing rules as the hardware (nearest texel, clamp or repeat).

use super::{PaletteBinding, Quad, QuadVertex, Rasterizer, TextureBinding, TextureKey, WrapMode};
use crate::format::{Color, PixelFormat};
use crate::math::{barycentric, Vec2};

/// Owned copy of the last texture binding
struct BoundTexture {
    key: TextureKey,
    format: PixelFormat,
    swizzled: bool,
    data: Vec<u8>,
    origin: (u32, u32),
    stride: u32,
    width: u32,
    height: u32,
}

impl BoundTexture {
    fn view(&self) -> TextureBinding<'_> {
        TextureBinding {
            key: self.key,
            format: self.format,
            swizzled: self.swizzled,
            data: &self.data,
            origin: self.origin,
            stride: self.stride,
            width: self.width,
            height: self.height,
        }
    }
}

/// Framebuffer for software rendering
pub struct Framebuffer {
    pub pixels: Vec<u8>, // RGBA, 4 bytes per pixel
    pub width: usize,
    pub height: usize,
    texture: Option<BoundTexture>,
    palette: Vec<u32>,
    wrap: (WrapMode, WrapMode),
    /// Quads submitted since creation
    pub quads_drawn: usize,
    pub texture_binds: usize,
    pub palette_binds: usize,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0; width * height * 4],
            width,
            height,
            texture: None,
            palette: Vec::new(),
            wrap: (WrapMode::Repeat, WrapMode::Repeat),
            quads_drawn: 0,
            texture_binds: 0,
            palette_binds: 0,
        }
    }

    pub fn clear(&mut self, color: Color) {
        let bytes = color.to_bytes();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&bytes);
        }
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        if x < self.width && y < self.height {
            let idx = (y * self.width + x) * 4;
            self.pixels[idx..idx + 4].copy_from_slice(&color.to_bytes());
        }
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> Color {
        if x < self.width && y < self.height {
            let idx = (y * self.width + x) * 4;
            let p = &self.pixels[idx..idx + 4];
            Color::with_alpha(p[0], p[1], p[2], p[3])
        } else {
            Color::TRANSPARENT
        }
    }

    pub fn wrap(&self) -> (WrapMode, WrapMode) {
        self.wrap
    }

    fn sample(&self, u: f32, v: f32) -> Color {
        let Some(tex) = &self.texture else {
            return Color::WHITE;
        };
        let tx = wrap_coord(u.floor() as i64, tex.width, self.wrap.0);
        let ty = wrap_coord(v.floor() as i64, tex.height, self.wrap.1);
        tex.view().texel(tx, ty, &self.palette)
    }

    /// Rasterize a single triangle
    fn rasterize_triangle(&mut self, a: &QuadVertex, b: &QuadVertex, c: &QuadVertex) {
        let (pa, pb, pc) = (Vec2::new(a.x, a.y), Vec2::new(b.x, b.y), Vec2::new(c.x, c.y));

        // Bounding box
        let min_x = pa.x.min(pb.x).min(pc.x).max(0.0) as usize;
        let max_x = (pa.x.max(pb.x).max(pc.x) + 1.0).min(self.width as f32).max(0.0) as usize;
        let min_y = pa.y.min(pb.y).min(pc.y).max(0.0) as usize;
        let max_y = (pa.y.max(pb.y).max(pc.y) + 1.0).min(self.height as f32).max(0.0) as usize;

        for y in min_y..max_y {
            for x in min_x..max_x {
                // Sample at the pixel center
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let (ba, bb, bc) = barycentric(p, pa, pb, pc);

                const ERR: f32 = -0.0001;
                if ba >= ERR && bb >= ERR && bc >= ERR {
                    let u = ba * a.u + bb * b.u + bc * c.u;
                    let v = ba * a.v + bb * b.v + bc * c.v;
                    let color = self.sample(u, v);

                    // Alpha test: fully transparent texels leave the target untouched
                    if color.a != 0 {
                        self.set_pixel(x, y, color);
                    }
                }
            }
        }
    }
}

fn wrap_coord(t: i64, size: u32, mode: WrapMode) -> u32 {
    let size = size.max(1) as i64;
    match mode {
        WrapMode::Clamp => t.clamp(0, size - 1) as u32,
        WrapMode::Repeat => t.rem_euclid(size) as u32,
    }
}

impl Rasterizer for Framebuffer {
    fn bind_texture(&mut self, texture: &TextureBinding<'_>) {
        self.texture_binds += 1;
        self.texture = Some(BoundTexture {
            key: texture.key,
            format: texture.format,
            swizzled: texture.swizzled,
            data: texture.data.to_vec(),
            origin: texture.origin,
            stride: texture.stride,
            width: texture.width,
            height: texture.height,
        });
    }

    fn bind_palette(&mut self, palette: &PaletteBinding<'_>) {
        self.palette_binds += 1;
        self.palette = palette.entries.to_vec();
    }

    fn set_wrap(&mut self, u: WrapMode, v: WrapMode) {
        self.wrap = (u, v);
    }

    fn draw_quad(&mut self, quad: &Quad) {
        self.quads_drawn += 1;
        let [v0, v1, v2, v3] = &quad.vertices;
        self.rasterize_triangle(v0, v1, v2);
        self.rasterize_triangle(v1, v3, v2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::RasterContext;
    use crate::texture::{Image, Location};

    fn vertex(u: f32, v: f32, x: f32, y: f32) -> QuadVertex {
        QuadVertex { u, v, x, y, z: 0.0 }
    }

    #[test]
    fn test_untextured_quad_is_white() {
        let mut fb = Framebuffer::new(8, 8);
        fb.draw_quad(&Quad {
            vertices: [
                vertex(0.0, 0.0, 2.0, 2.0),
                vertex(1.0, 0.0, 6.0, 2.0),
                vertex(0.0, 1.0, 2.0, 6.0),
                vertex(1.0, 1.0, 6.0, 6.0),
            ],
        });
        assert_eq!(fb.get_pixel(2, 2), Color::WHITE);
        assert_eq!(fb.get_pixel(5, 5), Color::WHITE);
        assert_eq!(fb.get_pixel(6, 6), Color::TRANSPARENT);
        assert_eq!(fb.get_pixel(1, 3), Color::TRANSPARENT);
    }

    #[test]
    fn test_textured_quad_copies_texels() {
        let mut img = Image::new(4, 4, PixelFormat::Rgba8888, Location::Ram).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                img.set_pixel(x, y, Color::new(x as u8 * 10, y as u8 * 10, 0).to_u32());
            }
        }

        let mut ctx = RasterContext::new(Framebuffer::new(4, 4));
        ctx.set_texture_part(&img, 0, 0, img.real_width(), img.real_height());
        ctx.draw_quad(&Quad {
            vertices: [
                vertex(0.0, 0.0, 0.0, 0.0),
                vertex(4.0, 0.0, 4.0, 0.0),
                vertex(0.0, 4.0, 0.0, 4.0),
                vertex(4.0, 4.0, 4.0, 4.0),
            ],
        });
        let fb = ctx.into_inner();
        assert_eq!(fb.get_pixel(3, 1), Color::new(30, 10, 0));
        assert_eq!(fb.get_pixel(0, 2), Color::new(0, 20, 0));
    }

    #[test]
    fn test_wrap_coordinates() {
        assert_eq!(wrap_coord(-1, 4, WrapMode::Clamp), 0);
        assert_eq!(wrap_coord(9, 4, WrapMode::Clamp), 3);
        assert_eq!(wrap_coord(-1, 4, WrapMode::Repeat), 3);
        assert_eq!(wrap_coord(9, 4, WrapMode::Repeat), 1);
    }
}
