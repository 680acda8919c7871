//! Pixel formats and color packing
//!
//! Every format the hardware samples from is a variant of [`PixelFormat`].
//! Per-format behaviour lives in a small table of [`FormatInfo`] records so
//! the bit layouts are defined in exactly one place.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::palette::Palette;

/// RGBA color (0-255 per channel)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Pack into the 32-bit palette encoding (`r | g<<8 | b<<16 | a<<24`)
    pub fn to_u32(self) -> u32 {
        (self.r as u32) | ((self.g as u32) << 8) | ((self.b as u32) << 16) | ((self.a as u32) << 24)
    }

    pub fn from_u32(value: u32) -> Self {
        Self {
            r: (value & 0xff) as u8,
            g: ((value >> 8) & 0xff) as u8,
            b: ((value >> 16) & 0xff) as u8,
            a: ((value >> 24) & 0xff) as u8,
        }
    }

    /// Convert to [u8; 4] for framebuffers and encoders
    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// Fixed bit-packing schemes understood by the rasterizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 32-bit, 8 bits per channel
    Rgba8888,
    /// 16-bit, 5/6/5 with no alpha
    Rgb565,
    /// 16-bit, 5/5/5 with a 1-bit alpha
    Rgba5551,
    /// 16-bit, 4 bits per channel
    Rgba4444,
    /// 8-bit palette index
    Indexed8,
    /// 4-bit palette index, two pixels per byte (low nibble first)
    Indexed4,
}

/// Static description of one pixel format
#[derive(Clone, Copy)]
pub struct FormatInfo {
    pub bits_per_pixel: u32,
    /// log2 of the palette capacity, 0 for direct-color formats
    pub palette_bits: u32,
    pub pack: Option<fn(Color) -> u32>,
    pub unpack: Option<fn(u32) -> Color>,
}

const FORMAT_TABLE: [FormatInfo; 6] = [
    FormatInfo { bits_per_pixel: 32, palette_bits: 0, pack: Some(pack_8888), unpack: Some(unpack_8888) },
    FormatInfo { bits_per_pixel: 16, palette_bits: 0, pack: Some(pack_5650), unpack: Some(unpack_5650) },
    FormatInfo { bits_per_pixel: 16, palette_bits: 0, pack: Some(pack_5551), unpack: Some(unpack_5551) },
    FormatInfo { bits_per_pixel: 16, palette_bits: 0, pack: Some(pack_4444), unpack: Some(unpack_4444) },
    FormatInfo { bits_per_pixel: 8, palette_bits: 8, pack: None, unpack: None },
    FormatInfo { bits_per_pixel: 4, palette_bits: 4, pack: None, unpack: None },
];

impl PixelFormat {
    pub const ALL: [PixelFormat; 6] = [
        PixelFormat::Rgba8888,
        PixelFormat::Rgb565,
        PixelFormat::Rgba5551,
        PixelFormat::Rgba4444,
        PixelFormat::Indexed8,
        PixelFormat::Indexed4,
    ];

    pub fn info(self) -> &'static FormatInfo {
        let idx = match self {
            PixelFormat::Rgba8888 => 0,
            PixelFormat::Rgb565 => 1,
            PixelFormat::Rgba5551 => 2,
            PixelFormat::Rgba4444 => 3,
            PixelFormat::Indexed8 => 4,
            PixelFormat::Indexed4 => 5,
        };
        &FORMAT_TABLE[idx]
    }

    pub fn bits_per_pixel(self) -> u32 {
        self.info().bits_per_pixel
    }

    pub fn needs_palette(self) -> bool {
        self.info().palette_bits > 0
    }

    /// Number of palette slots a pixel of this format can address
    pub fn palette_capacity(self) -> usize {
        match self.info().palette_bits {
            0 => 0,
            bits => 1 << bits,
        }
    }

    /// Bytes occupied by `pixels` consecutive pixels
    pub fn bytes_for(self, pixels: usize) -> usize {
        (pixels * self.bits_per_pixel() as usize) >> 3
    }

    /// Parse the legacy numeric format codes (`0x8888`, `0x5650`, ... `8`, `4`)
    pub fn from_code(code: u32) -> Result<Self, DecodeError> {
        match code {
            0x8888 => Ok(PixelFormat::Rgba8888),
            0x5650 => Ok(PixelFormat::Rgb565),
            0x5551 => Ok(PixelFormat::Rgba5551),
            0x4444 => Ok(PixelFormat::Rgba4444),
            8 => Ok(PixelFormat::Indexed8),
            4 => Ok(PixelFormat::Indexed4),
            other => Err(DecodeError::UnsupportedPixelFormat(format!("code {:#x}", other))),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            PixelFormat::Rgba8888 => 0x8888,
            PixelFormat::Rgb565 => 0x5650,
            PixelFormat::Rgba5551 => 0x5551,
            PixelFormat::Rgba4444 => 0x4444,
            PixelFormat::Indexed8 => 8,
            PixelFormat::Indexed4 => 4,
        }
    }
}

fn pack_8888(c: Color) -> u32 {
    c.to_u32()
}

fn unpack_8888(v: u32) -> Color {
    Color::from_u32(v)
}

fn pack_5650(c: Color) -> u32 {
    (((c.b as u32) >> 3) << 11) | (((c.g as u32) >> 2) << 5) | ((c.r as u32) >> 3)
}

fn unpack_5650(v: u32) -> Color {
    Color {
        r: expand5(v & 0x1f),
        g: expand6((v >> 5) & 0x3f),
        b: expand5((v >> 11) & 0x1f),
        a: 0xff,
    }
}

fn pack_5551(c: Color) -> u32 {
    (((c.a as u32) >> 7) << 15)
        | (((c.b as u32) >> 3) << 10)
        | (((c.g as u32) >> 3) << 5)
        | ((c.r as u32) >> 3)
}

fn unpack_5551(v: u32) -> Color {
    Color {
        r: expand5(v & 0x1f),
        g: expand5((v >> 5) & 0x1f),
        b: expand5((v >> 10) & 0x1f),
        a: if (v >> 15) & 1 != 0 { 0xff } else { 0 },
    }
}

fn pack_4444(c: Color) -> u32 {
    (((c.a as u32) >> 4) << 12)
        | (((c.b as u32) >> 4) << 8)
        | (((c.g as u32) >> 4) << 4)
        | ((c.r as u32) >> 4)
}

fn unpack_4444(v: u32) -> Color {
    Color {
        r: expand4(v & 0xf),
        g: expand4((v >> 4) & 0xf),
        b: expand4((v >> 8) & 0xf),
        a: expand4((v >> 12) & 0xf),
    }
}

// Bit replication: the top bits are copied into the freed low bits
fn expand4(v: u32) -> u8 {
    ((v << 4) | v) as u8
}

fn expand5(v: u32) -> u8 {
    ((v << 3) | (v >> 2)) as u8
}

fn expand6(v: u32) -> u8 {
    ((v << 2) | (v >> 4)) as u8
}

/// Pack a color into a direct-color format
///
/// Indexed formats carry indices, not colors; passing one is a caller bug.
pub fn pack(format: PixelFormat, color: Color) -> u32 {
    match format.info().pack {
        Some(f) => f(color),
        None => {
            debug_assert!(false, "pack called with indexed format {:?}", format);
            0
        }
    }
}

/// Recover 8-bit channels from a packed direct-color value
pub fn unpack(format: PixelFormat, value: u32) -> Color {
    match format.info().unpack {
        Some(f) => f(value),
        None => {
            debug_assert!(false, "unpack called with indexed format {:?}", format);
            Color::TRANSPARENT
        }
    }
}

/// Convert a packed value between two direct-color formats
pub fn convert_color(dst: PixelFormat, src: PixelFormat, value: u32) -> u32 {
    if dst == src {
        return value;
    }
    pack(dst, unpack(src, value))
}

/// Convert a packed value, resolving indexed formats through `palette`
///
/// An indexed destination receives the first palette slot holding the exact
/// color, or 0 when the palette has no match.
pub fn convert_color_with_palette(
    palette: Option<&Palette>,
    dst: PixelFormat,
    src: PixelFormat,
    value: u32,
) -> u32 {
    if dst == src {
        return value;
    }
    if !src.needs_palette() && !dst.needs_palette() {
        return convert_color(dst, src, value);
    }
    let color = if src.needs_palette() {
        match palette {
            Some(p) => p.color(value as usize),
            None => Color::TRANSPARENT,
        }
    } else {
        unpack(src, value)
    };

    if dst.needs_palette() {
        palette
            .and_then(|p| p.find(color.to_u32()))
            .map(|i| i as u32)
            .unwrap_or(0)
    } else {
        pack(dst, color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_table() {
        assert_eq!(PixelFormat::Rgba8888.bits_per_pixel(), 32);
        assert_eq!(PixelFormat::Rgb565.bits_per_pixel(), 16);
        assert_eq!(PixelFormat::Indexed4.bits_per_pixel(), 4);
        assert_eq!(PixelFormat::Indexed8.palette_capacity(), 256);
        assert_eq!(PixelFormat::Indexed4.palette_capacity(), 16);
        assert_eq!(PixelFormat::Rgba4444.palette_capacity(), 0);
        assert!(PixelFormat::Indexed8.needs_palette());
        assert!(!PixelFormat::Rgba5551.needs_palette());
        assert_eq!(PixelFormat::Indexed4.bytes_for(5), 2);
    }

    #[test]
    fn test_pack_8888_layout() {
        let c = Color::with_alpha(1, 2, 3, 4);
        assert_eq!(pack(PixelFormat::Rgba8888, c), 0x04030201);
        assert_eq!(unpack(PixelFormat::Rgba8888, 0x04030201), c);
    }

    #[test]
    fn test_pack_16bit_layouts() {
        let c = Color::with_alpha(0xff, 0x80, 0x08, 0xff);
        assert_eq!(pack(PixelFormat::Rgb565, c), (1 << 11) | (0x20 << 5) | 0x1f);
        assert_eq!(pack(PixelFormat::Rgba5551, c), (1 << 15) | (1 << 10) | (0x10 << 5) | 0x1f);
        assert_eq!(pack(PixelFormat::Rgba4444, c), (0xf << 12) | (0x8 << 4) | 0xf);
    }

    #[test]
    fn test_unpack_bit_replication() {
        let white = unpack(PixelFormat::Rgb565, 0xffff);
        assert_eq!(white, Color::WHITE);
        let c = unpack(PixelFormat::Rgba5551, 0x10);
        assert_eq!(c.r, (0x10 << 3) | (0x10 >> 2));
        assert_eq!(c.a, 0);
        let c = unpack(PixelFormat::Rgba4444, 0xa000);
        assert_eq!(c.a, 0xaa);
    }

    #[test]
    fn test_alpha_defaults_to_opaque_without_channel() {
        let c = unpack(PixelFormat::Rgb565, 0);
        assert_eq!(c.a, 0xff);
    }

    #[test]
    fn test_convert_color_roundtrips_exact_values() {
        for format in [PixelFormat::Rgb565, PixelFormat::Rgba5551, PixelFormat::Rgba4444] {
            let packed = pack(format, Color::with_alpha(0xf8, 0xf0, 0x08, 0xff));
            let wide = convert_color(PixelFormat::Rgba8888, format, packed);
            assert_eq!(convert_color(format, PixelFormat::Rgba8888, wide), packed);
        }
    }

    #[test]
    fn test_convert_with_palette() {
        let mut palette = Palette::new(PixelFormat::Indexed4);
        palette.push(Color::new(10, 20, 30).to_u32());
        palette.push(Color::new(40, 50, 60).to_u32());

        let wide = convert_color_with_palette(Some(&palette), PixelFormat::Rgba8888, PixelFormat::Indexed4, 1);
        assert_eq!(Color::from_u32(wide), Color::new(40, 50, 60));

        let idx = convert_color_with_palette(
            Some(&palette),
            PixelFormat::Indexed4,
            PixelFormat::Rgba8888,
            Color::new(40, 50, 60).to_u32(),
        );
        assert_eq!(idx, 1);
    }

    #[test]
    fn test_format_codes() {
        for format in PixelFormat::ALL {
            assert_eq!(PixelFormat::from_code(format.code()).unwrap(), format);
        }
        assert!(matches!(
            PixelFormat::from_code(0x1234),
            Err(DecodeError::UnsupportedPixelFormat(_))
        ));
    }
}
