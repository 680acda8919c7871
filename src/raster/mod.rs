//! Rasterizer submission boundary
//!
//! The hardware (or any backend standing in for it) is driven through the
//! [`Rasterizer`] trait. [`RasterContext`] owns the backend together with the
//! currently bound texture, palette and wrap modes, and skips redundant
//! rebinds the way a display-list builder would.

mod software;

pub use software::Framebuffer;

use std::ops::{Deref, DerefMut};

use crate::format::{unpack, Color, PixelFormat};
use crate::texture::{read_raw, swizzled_offset, Image, ImageId};

/// Texture addressing outside [0, size)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    #[default]
    Repeat,
    Clamp,
}

/// One corner of a quad: texture coordinate (texels) plus screen position
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QuadVertex {
    pub u: f32,
    pub v: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Four vertices in triangle-strip order: top-left, top-right, bottom-left, bottom-right
///
/// "Top" and "left" refer to the source cell, not to the screen.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Quad {
    pub vertices: [QuadVertex; 4],
}

/// Identity of a texture binding: which image, and where its base address sits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureKey {
    pub image: ImageId,
    pub offset: usize,
}

/// Everything the hardware needs to sample one texture window
#[derive(Debug, Clone, Copy)]
pub struct TextureBinding<'a> {
    pub key: TextureKey,
    pub format: PixelFormat,
    pub swizzled: bool,
    /// The whole image buffer; the window's base address is `key.offset`
    pub data: &'a [u8],
    /// Pixel coordinates of the window origin inside the buffer
    pub origin: (u32, u32),
    /// Row stride in pixels
    pub stride: u32,
    pub width: u32,
    pub height: u32,
}

impl TextureBinding<'_> {
    pub fn stride_bytes(&self) -> usize {
        self.format.bytes_for(self.stride as usize)
    }

    /// Decode the texel at (tx, ty) relative to the window origin
    ///
    /// Texels outside the allocated buffer read as transparent black.
    pub fn texel(&self, tx: u32, ty: u32, palette: &[u32]) -> Color {
        let x = self.origin.0 + tx;
        let y = self.origin.1 + ty;
        let stride_bytes = self.stride_bytes();
        if x >= self.stride || stride_bytes == 0 || (y as usize + 1) * stride_bytes > self.data.len() {
            return Color::TRANSPARENT;
        }

        let x_bytes = self.format.bytes_for(x as usize);
        let offset = if self.swizzled {
            swizzled_offset(x_bytes, y as usize, stride_bytes)
        } else {
            y as usize * stride_bytes + x_bytes
        };

        match read_raw(self.data, self.format, offset, x) {
            Some(raw) if self.format.needs_palette() => palette
                .get(raw as usize)
                .map(|&c| Color::from_u32(c))
                .unwrap_or(Color::TRANSPARENT),
            Some(raw) => unpack(self.format, raw),
            None => Color::TRANSPARENT,
        }
    }
}

/// A color lookup table upload
#[derive(Debug, Clone, Copy)]
pub struct PaletteBinding<'a> {
    pub format: PixelFormat,
    pub entries: &'a [u32],
}

/// Fixed-function rasterizer interface
pub trait Rasterizer {
    fn bind_texture(&mut self, texture: &TextureBinding<'_>);
    fn bind_palette(&mut self, palette: &PaletteBinding<'_>);
    fn set_wrap(&mut self, u: WrapMode, v: WrapMode);
    /// Draw 4 vertices as a two-triangle strip
    fn draw_quad(&mut self, quad: &Quad);
}

/// A backend plus the binding state last sent to it
pub struct RasterContext<R: Rasterizer> {
    backend: R,
    texture: Option<TextureKey>,
    palette: Option<ImageId>,
    wrap: (WrapMode, WrapMode),
}

impl<R: Rasterizer> RasterContext<R> {
    pub fn new(mut backend: R) -> Self {
        let wrap = (WrapMode::default(), WrapMode::default());
        backend.set_wrap(wrap.0, wrap.1);
        Self {
            backend,
            texture: None,
            palette: None,
            wrap,
        }
    }

    pub fn backend(&self) -> &R {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut R {
        &mut self.backend
    }

    pub fn into_inner(self) -> R {
        self.backend
    }

    pub fn wrap(&self) -> (WrapMode, WrapMode) {
        self.wrap
    }

    pub fn set_wrap(&mut self, u: WrapMode, v: WrapMode) {
        if self.wrap != (u, v) {
            self.wrap = (u, v);
            self.backend.set_wrap(u, v);
        }
    }

    /// Set wrap modes until the returned guard is dropped
    pub fn scoped_wrap(&mut self, u: WrapMode, v: WrapMode) -> WrapGuard<'_, R> {
        let saved = self.wrap;
        self.set_wrap(u, v);
        WrapGuard { ctx: self, saved }
    }

    /// Forget cached bindings, e.g. after an image buffer was modified in place
    pub fn invalidate(&mut self) {
        self.texture = None;
        self.palette = None;
    }

    /// Bind the `width` x `height` window of `image` whose origin is pixel (x, y)
    ///
    /// The image palette is uploaded first when it differs from the bound one.
    pub fn set_texture_part(&mut self, image: &Image, x: u32, y: u32, width: u32, height: u32) {
        if let Some(palette) = image.palette() {
            if self.palette != Some(image.id()) {
                self.palette = Some(image.id());
                self.backend.bind_palette(&PaletteBinding {
                    format: palette.pixel_format(),
                    entries: palette.entries(),
                });
            }
        }

        let key = TextureKey {
            image: image.id(),
            offset: image.pixel_offset(x, y),
        };
        if self.texture != Some(key) {
            self.texture = Some(key);
            self.backend.bind_texture(&TextureBinding {
                key,
                format: image.format(),
                swizzled: image.is_swizzled(),
                data: image.data(),
                origin: (x, y),
                stride: image.real_width(),
                width,
                height,
            });
        }
    }

    pub fn draw_quad(&mut self, quad: &Quad) {
        self.backend.draw_quad(quad);
    }
}

/// Restores the wrap modes captured by [`RasterContext::scoped_wrap`] on drop
pub struct WrapGuard<'a, R: Rasterizer> {
    ctx: &'a mut RasterContext<R>,
    saved: (WrapMode, WrapMode),
}

impl<R: Rasterizer> Deref for WrapGuard<'_, R> {
    type Target = RasterContext<R>;
    fn deref(&self) -> &RasterContext<R> {
        &*self.ctx
    }
}

impl<R: Rasterizer> DerefMut for WrapGuard<'_, R> {
    fn deref_mut(&mut self) -> &mut RasterContext<R> {
        &mut *self.ctx
    }
}

impl<R: Rasterizer> Drop for WrapGuard<'_, R> {
    fn drop(&mut self) {
        let (u, v) = self.saved;
        self.ctx.set_wrap(u, v);
    }
}
