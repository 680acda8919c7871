//! In-memory images
//!
//! An [`Image`] owns a padded pixel buffer in one [`PixelFormat`], an optional
//! palette, and the transform state used when it is drawn.

mod swizzle;

pub use swizzle::swizzled_offset;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::format::{convert_color_with_palette, Color, PixelFormat};
use crate::palette::Palette;

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an image buffer, used by binding caches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(u64);

impl ImageId {
    fn next() -> Self {
        ImageId(NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Memory tier an image lives in (passed through to the rasterizer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Location {
    #[default]
    Ram,
    Vram,
}

/// Sampled region of the pixel buffer
///
/// `x0 > x1` mirrors the horizontal axis, `y0 > y1` the vertical one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl SourceRect {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Whole image, unmirrored
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    pub fn is_mirrored_x(&self) -> bool {
        self.x0 > self.x1
    }

    pub fn is_mirrored_y(&self) -> bool {
        self.y0 > self.y1
    }

    pub fn width(&self) -> u32 {
        (self.x1 as i64 - self.x0 as i64).unsigned_abs() as u32
    }

    pub fn height(&self) -> u32 {
        (self.y1 as i64 - self.y0 as i64).unsigned_abs() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.x0 == self.x1 || self.y0 == self.y1
    }

    /// Horizontal bounds as (min, max)
    pub fn ordered_x(&self) -> (i32, i32) {
        (self.x0.min(self.x1), self.x0.max(self.x1))
    }

    /// Vertical bounds as (min, max)
    pub fn ordered_y(&self) -> (i32, i32) {
        (self.y0.min(self.y1), self.y0.max(self.y1))
    }
}

/// Placement of an image on screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageTransform {
    /// Anchor position
    pub x: f32,
    pub y: f32,
    /// Pivot offset in source pixels
    pub center_x: f32,
    pub center_y: f32,
    /// Rotation in degrees, clockwise in screen space
    pub angle: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub rect: SourceRect,
}

impl ImageTransform {
    pub fn identity(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            center_x: 0.0,
            center_y: 0.0,
            angle: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rect: SourceRect::full(width, height),
        }
    }

    /// Zero scale on either axis draws nothing
    pub fn is_degenerate(&self) -> bool {
        self.scale_x == 0.0 || self.scale_y == 0.0 || self.rect.is_empty()
    }
}

/// Smallest power of two >= `v`
fn next_power_of_two(v: u32) -> u32 {
    v.max(1).next_power_of_two()
}

/// A pixel buffer plus everything needed to draw it
#[derive(Debug)]
pub struct Image {
    id: ImageId,
    width: u32,
    height: u32,
    real_width: u32,
    real_height: u32,
    format: PixelFormat,
    palette: Option<Palette>,
    location: Location,
    swizzled: bool,
    data: Vec<u8>,
    pub transform: ImageTransform,
}

impl Clone for Image {
    fn clone(&self) -> Self {
        Self {
            id: ImageId::next(),
            width: self.width,
            height: self.height,
            real_width: self.real_width,
            real_height: self.real_height,
            format: self.format,
            palette: self.palette.clone(),
            location: self.location,
            swizzled: self.swizzled,
            data: self.data.clone(),
            transform: self.transform,
        }
    }
}

/// Read one packed value at byte `offset`; `x` selects the nibble for 4-bit data
pub(crate) fn read_raw(data: &[u8], format: PixelFormat, offset: usize, x: u32) -> Option<u32> {
    let bytes = data.get(offset..offset + format.bytes_for(1).max(1))?;
    Some(match format.bits_per_pixel() {
        32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        16 => u16::from_le_bytes([bytes[0], bytes[1]]) as u32,
        8 => bytes[0] as u32,
        _ => ((bytes[0] >> ((x & 1) * 4)) & 0xf) as u32,
    })
}

/// Allocate a zeroed buffer, reporting failure instead of aborting
pub(crate) fn alloc_zeroed(len: usize) -> Result<Vec<u8>, DecodeError> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| DecodeError::AllocationFailure(len))?;
    data.resize(len, 0);
    Ok(data)
}

impl Image {
    /// Allocate a zeroed image
    ///
    /// The buffer is padded to a power-of-two width and height, with rows of
    /// at least 16 bytes and at least 8 rows, so it can always be swizzled.
    pub fn new(width: u32, height: u32, format: PixelFormat, location: Location) -> Result<Self, DecodeError> {
        if width == 0 || height == 0 {
            return Err(DecodeError::CorruptData(format!(
                "image dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }

        let min_row_pixels = 128 / format.bits_per_pixel();
        let real_width = next_power_of_two(width).max(min_row_pixels);
        let real_height = next_power_of_two(height).max(8);
        let len = format.bytes_for(real_width as usize) * real_height as usize;
        let data = alloc_zeroed(len)?;

        Ok(Self {
            id: ImageId::next(),
            width,
            height,
            real_width,
            real_height,
            format,
            palette: None,
            location,
            swizzled: false,
            data,
            transform: ImageTransform::identity(width, height),
        })
    }

    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Allocated width in pixels (the row stride)
    pub fn real_width(&self) -> u32 {
        self.real_width
    }

    pub fn real_height(&self) -> u32 {
        self.real_height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn is_swizzled(&self) -> bool {
        self.swizzled
    }

    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }

    /// Attach a palette, keeping at most as many entries as the format addresses
    pub fn set_palette(&mut self, palette: Palette) {
        let mut owned = Palette::new(self.format);
        for &entry in palette.entries() {
            if !owned.push(entry) {
                break;
            }
        }
        self.palette = Some(owned);
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Bytes per padded row
    pub fn stride_bytes(&self) -> usize {
        self.format.bytes_for(self.real_width as usize)
    }

    /// Byte offset of pixel (x, y), honoring the swizzled layout
    pub fn pixel_offset(&self, x: u32, y: u32) -> usize {
        let x_bytes = self.format.bytes_for(x as usize);
        if self.swizzled {
            swizzled_offset(x_bytes, y as usize, self.stride_bytes())
        } else {
            y as usize * self.stride_bytes() + x_bytes
        }
    }

    /// Raw packed value at (x, y); `None` outside the logical size
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        read_raw(&self.data, self.format, self.pixel_offset(x, y), x)
    }

    /// Store a raw packed value; returns false outside the logical size
    pub fn set_pixel(&mut self, x: u32, y: u32, value: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let off = self.pixel_offset(x, y);
        let d = &mut self.data;
        match self.format.bits_per_pixel() {
            32 => d[off..off + 4].copy_from_slice(&value.to_le_bytes()),
            16 => d[off..off + 2].copy_from_slice(&(value as u16).to_le_bytes()),
            8 => d[off] = value as u8,
            _ => {
                let shift = (x & 1) * 4;
                d[off] &= !(0xf << shift);
                d[off] |= ((value & 0xf) as u8) << shift;
            }
        }
        true
    }

    /// Color at (x, y), resolved through the palette for indexed formats
    pub fn pixel_color(&self, x: u32, y: u32) -> Option<Color> {
        let value = self.get_pixel(x, y)?;
        if self.format.needs_palette() {
            Some(match &self.palette {
                Some(p) => p.color(value as usize),
                None => Color::TRANSPARENT,
            })
        } else {
            Some(crate::format::unpack(self.format, value))
        }
    }

    /// Fill every logical pixel with a raw packed value
    pub fn clear(&mut self, value: u32) {
        for y in 0..self.height {
            for x in 0..self.width {
                self.set_pixel(x, y, value);
            }
        }
    }

    /// Back to the identity transform over the whole image
    pub fn reset_transform(&mut self) {
        self.transform = ImageTransform::identity(self.width, self.height);
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.transform.x = x;
        self.transform.y = y;
    }

    pub fn set_center(&mut self, center_x: f32, center_y: f32) {
        self.transform.center_x = center_x;
        self.transform.center_y = center_y;
    }

    pub fn set_angle(&mut self, degrees: f32) {
        self.transform.angle = degrees;
    }

    pub fn set_scale(&mut self, scale_x: f32, scale_y: f32) {
        self.transform.scale_x = scale_x;
        self.transform.scale_y = scale_y;
    }

    /// Scale so the source rectangle covers `width` x `height` screen pixels
    pub fn set_stretch(&mut self, width: f32, height: f32) {
        let rect = self.transform.rect;
        self.transform.scale_x = if rect.width() == 0 { 0.0 } else { width / rect.width() as f32 };
        self.transform.scale_y = if rect.height() == 0 { 0.0 } else { height / rect.height() as f32 };
    }

    pub fn set_source_rect(&mut self, rect: SourceRect) {
        self.transform.rect = rect;
    }

    pub fn mirror_horizontal(&mut self) {
        let r = &mut self.transform.rect;
        std::mem::swap(&mut r.x0, &mut r.x1);
    }

    pub fn mirror_vertical(&mut self) {
        let r = &mut self.transform.rect;
        std::mem::swap(&mut r.y0, &mut r.y1);
    }

    /// Reformat into `format`, producing a new image
    ///
    /// Converting to an indexed format synthesizes a palette in first-seen
    /// order. Once the palette is full, unseen colors map to index 0.
    pub fn convert_to(&self, format: PixelFormat) -> Result<Image, DecodeError> {
        let mut out = Image::new(self.width, self.height, format, self.location)?;
        out.transform = self.transform;

        if format.needs_palette() {
            let mut palette = Palette::new(format);
            let mut lookup: HashMap<u32, u32> = HashMap::new();
            let mut overflowed = 0usize;

            for y in 0..self.height {
                for x in 0..self.width {
                    let color = self.pixel_color(x, y).unwrap_or(Color::TRANSPARENT).to_u32();
                    let index = match lookup.get(&color) {
                        Some(&i) => i,
                        None if palette.push(color) => {
                            let i = (palette.len() - 1) as u32;
                            lookup.insert(color, i);
                            i
                        }
                        None => {
                            overflowed += 1;
                            0
                        }
                    };
                    out.set_pixel(x, y, index);
                }
            }

            if overflowed > 0 {
                tracing::warn!(
                    "palette full ({} entries) converting to {:?}, {} pixels fell back to index 0",
                    palette.len(),
                    format,
                    overflowed
                );
            }
            out.palette = Some(palette);
        } else {
            let palette = self.palette.as_ref();
            for y in 0..self.height {
                for x in 0..self.width {
                    let raw = self.get_pixel(x, y).unwrap_or(0);
                    out.set_pixel(x, y, convert_color_with_palette(palette, format, self.format, raw));
                }
            }
        }

        if self.swizzled {
            out.swizzle()?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_rules() {
        let img = Image::new(300, 5, PixelFormat::Rgba8888, Location::Ram).unwrap();
        assert_eq!(img.real_width(), 512);
        assert_eq!(img.real_height(), 8);
        assert_eq!(img.stride_bytes(), 2048);
        assert_eq!(img.data().len(), 2048 * 8);

        let tiny = Image::new(3, 3, PixelFormat::Indexed4, Location::Ram).unwrap();
        assert_eq!(tiny.real_width(), 32);
        assert_eq!(tiny.stride_bytes(), 16);
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(Image::new(0, 4, PixelFormat::Rgb565, Location::Ram).is_err());
    }

    #[test]
    fn test_pixel_access_all_formats() {
        for format in PixelFormat::ALL {
            let mut img = Image::new(9, 4, format, Location::Ram).unwrap();
            let value = match format.bits_per_pixel() {
                32 => 0x11223344,
                16 => 0xabcd,
                8 => 0xee,
                _ => 0x9,
            };
            assert!(img.set_pixel(7, 3, value));
            assert!(img.set_pixel(8, 3, 1));
            assert_eq!(img.get_pixel(7, 3), Some(value));
            assert_eq!(img.get_pixel(8, 3), Some(1));
            assert_eq!(img.get_pixel(6, 3), Some(0));
            assert!(!img.set_pixel(9, 0, value));
            assert_eq!(img.get_pixel(0, 4), None);
        }
    }

    #[test]
    fn test_nibbles_do_not_clobber_neighbours() {
        let mut img = Image::new(4, 1, PixelFormat::Indexed4, Location::Ram).unwrap();
        img.set_pixel(0, 0, 0xa);
        img.set_pixel(1, 0, 0x5);
        assert_eq!(img.data()[0], 0x5a);
        img.set_pixel(0, 0, 0x3);
        assert_eq!(img.get_pixel(1, 0), Some(0x5));
    }

    #[test]
    fn test_convert_to_indexed_synthesizes_palette() {
        let mut img = Image::new(4, 2, PixelFormat::Rgba8888, Location::Ram).unwrap();
        let red = Color::new(255, 0, 0);
        let blue = Color::new(0, 0, 255);
        img.clear(red.to_u32());
        img.set_pixel(2, 1, blue.to_u32());

        let indexed = img.convert_to(PixelFormat::Indexed8).unwrap();
        let palette = indexed.palette().unwrap();
        assert_eq!(palette.len(), 2);
        assert_eq!(indexed.get_pixel(0, 0), Some(0));
        assert_eq!(indexed.get_pixel(2, 1), Some(1));
        assert_eq!(indexed.pixel_color(2, 1), Some(blue));
        assert_ne!(indexed.id(), img.id());
    }

    #[test]
    fn test_convert_to_indexed_overflow_falls_back_to_zero() {
        let mut img = Image::new(20, 1, PixelFormat::Rgba8888, Location::Ram).unwrap();
        for x in 0..20 {
            img.set_pixel(x, 0, Color::new(x as u8, 0, 0).to_u32());
        }
        let indexed = img.convert_to(PixelFormat::Indexed4).unwrap();
        assert_eq!(indexed.palette().unwrap().len(), 16);
        assert_eq!(indexed.get_pixel(15, 0), Some(15));
        assert_eq!(indexed.get_pixel(19, 0), Some(0));
    }

    #[test]
    fn test_convert_to_direct_formats() {
        let mut img = Image::new(2, 2, PixelFormat::Rgba8888, Location::Ram).unwrap();
        img.clear(Color::with_alpha(0xf8, 0xfc, 0xf8, 0xff).to_u32());
        let c565 = img.convert_to(PixelFormat::Rgb565).unwrap();
        assert_eq!(c565.get_pixel(1, 1), Some(0xffff));
        let back = c565.convert_to(PixelFormat::Rgba8888).unwrap();
        assert_eq!(back.pixel_color(0, 0), Some(Color::WHITE));
    }

    #[test]
    fn test_convert_indexed_to_direct_resolves_palette() {
        let mut img = Image::new(3, 1, PixelFormat::Indexed4, Location::Ram).unwrap();
        let mut palette = Palette::new(PixelFormat::Indexed4);
        palette.push(Color::with_alpha(0xff, 0, 0, 0).to_u32());
        palette.push(Color::new(0, 0xff, 0).to_u32());
        img.set_palette(palette);
        img.set_pixel(0, 0, 1);
        img.set_pixel(1, 0, 0);
        img.set_pixel(2, 0, 9);

        let out = img.convert_to(PixelFormat::Rgba5551).unwrap();
        assert!(out.palette().is_none());
        assert_eq!(out.pixel_color(0, 0), Some(Color::new(0, 0xff, 0)));
        assert_eq!(out.pixel_color(1, 0), Some(Color::with_alpha(0xff, 0, 0, 0)));
        // Past the palette end
        assert_eq!(out.pixel_color(2, 0), Some(Color::TRANSPARENT));
    }

    #[test]
    fn test_transform_setters() {
        let mut img = Image::new(64, 32, PixelFormat::Rgb565, Location::Vram).unwrap();
        img.set_stretch(128.0, 16.0);
        assert_eq!(img.transform.scale_x, 2.0);
        assert_eq!(img.transform.scale_y, 0.5);

        img.mirror_horizontal();
        assert!(img.transform.rect.is_mirrored_x());
        assert_eq!(img.transform.rect.ordered_x(), (0, 64));

        img.move_to(5.0, 6.0);
        img.set_angle(90.0);
        img.reset_transform();
        assert_eq!(img.transform, ImageTransform::identity(64, 32));
        assert_eq!(img.location(), Location::Vram);
    }

    #[test]
    fn test_set_palette_caps_entries() {
        let mut big = Palette::new(PixelFormat::Indexed8);
        for i in 0..40 {
            big.push(i);
        }
        let mut img = Image::new(4, 4, PixelFormat::Indexed4, Location::Ram).unwrap();
        img.set_palette(big);
        assert_eq!(img.palette().unwrap().len(), 16);
    }
}
