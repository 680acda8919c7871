//! Image decoding
//!
//! Turns a compressed file into an [`Image`] in a requested [`PixelFormat`].
//! PNG and GIF keep palette indices intact so indexed targets can store them
//! directly; JPEG and BMP arrive as truecolor and are reformatted when an
//! indexed format is requested.

mod native;

pub use native::{ColorModel, NativeImage};

use std::fs;
use std::io::Read;
use std::path::Path;

use crate::error::DecodeError;
use crate::format::{pack, Color, PixelFormat};
use crate::palette::{ColorKey, PaletteBuilder};
use crate::texture::{Image, Location};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Container recognized from the leading bytes of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
}

impl SourceFormat {
    /// Identify the container, or `None` for an unknown signature
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&PNG_SIGNATURE) {
            Some(SourceFormat::Png)
        } else if bytes.starts_with(&[0xff, 0xd8, 0xff]) {
            Some(SourceFormat::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(SourceFormat::Gif)
        } else if bytes.starts_with(b"BM") {
            Some(SourceFormat::Bmp)
        } else {
            None
        }
    }
}

/// Caller choices that apply to every decode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Pixels (or palette entries) of this RGB become fully transparent
    pub color_key: Option<ColorKey>,
    pub location: Location,
    /// Return the buffer in the hardware-tiled layout
    pub swizzle: bool,
}

/// Decode `bytes` into an image stored as `requested`
pub fn decode(bytes: &[u8], requested: PixelFormat, options: &DecodeOptions) -> Result<Image, DecodeError> {
    let source = SourceFormat::sniff(bytes).ok_or(DecodeError::InvalidFormat)?;
    let native = match source {
        SourceFormat::Png => native::read_png(bytes)?,
        SourceFormat::Gif => native::read_gif(bytes)?,
        SourceFormat::Jpeg => native::read_with_image(bytes, image::ImageFormat::Jpeg)?,
        SourceFormat::Bmp => native::read_with_image(bytes, image::ImageFormat::Bmp)?,
    };
    tracing::debug!(
        "decoded {:?} header: {}x{} {:?} at {} bits, {} palette entries",
        source,
        native.width,
        native.height,
        native.model,
        native.depth,
        native.palette.len()
    );

    // Indexed targets need a native table to index into
    let resolved = if requested.needs_palette() && !native.model.is_indexed() {
        PixelFormat::Rgba8888
    } else {
        requested
    };

    let mut image = Image::new(native.width, native.height, resolved, options.location)?;
    write_pixels(&mut image, &native, options.color_key);

    if resolved != requested {
        tracing::debug!("reformatting {:?} to {:?}", resolved, requested);
        image = image.convert_to(requested)?;
    }
    if options.swizzle {
        image.swizzle()?;
    }
    Ok(image)
}

/// Store every native pixel into `image`, which must be in linear layout
fn write_pixels(image: &mut Image, native: &NativeImage, key: Option<ColorKey>) {
    let format = image.format();

    if native.model.is_indexed() {
        let table_format = if format.needs_palette() {
            format
        } else {
            PixelFormat::Indexed8
        };
        let palette = PaletteBuilder::new(table_format)
            .color_key(key)
            .transparent_index(native.transparent)
            .build(&native.palette);

        if format.needs_palette() {
            let mask = (format.palette_capacity() - 1) as u32;
            for y in 0..native.height {
                for x in 0..native.width {
                    image.set_pixel(x, y, native.pixel(x, y)[0] as u32 & mask);
                }
            }
            image.set_palette(palette);
        } else {
            for y in 0..native.height {
                for x in 0..native.width {
                    let color = palette.color(native.pixel(x, y)[0] as usize);
                    image.set_pixel(x, y, pack(format, color));
                }
            }
        }
        return;
    }

    for y in 0..native.height {
        for x in 0..native.width {
            let color = keyed(native_color(native.model, native.pixel(x, y)), key);
            image.set_pixel(x, y, pack(format, color));
        }
    }
}

fn native_color(model: ColorModel, px: &[u8]) -> Color {
    match model {
        ColorModel::Gray => Color::new(px[0], px[0], px[0]),
        ColorModel::GrayAlpha => Color::with_alpha(px[0], px[0], px[0], px[1]),
        ColorModel::Rgb => Color::new(px[0], px[1], px[2]),
        ColorModel::Rgba => Color::with_alpha(px[0], px[1], px[2], px[3]),
        // Resolved through the palette by the caller
        ColorModel::Indexed => Color::TRANSPARENT,
    }
}

fn keyed(color: Color, key: Option<ColorKey>) -> Color {
    match key {
        Some(k) if k.matches(color.r, color.g, color.b) => Color { a: 0, ..color },
        _ => color,
    }
}

/// Read a whole stream and decode it
pub fn decode_reader<R: Read>(mut reader: R, requested: PixelFormat, options: &DecodeOptions) -> Result<Image, DecodeError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    decode(&bytes, requested, options)
}

/// Load and decode an image file
pub fn load_image_file(path: impl AsRef<Path>, requested: PixelFormat, options: &DecodeOptions) -> Result<Image, DecodeError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let image = decode(&bytes, requested, options)?;
    tracing::info!(
        "loaded {}: {}x{} as {:?}",
        path.display(),
        image.width(),
        image.height(),
        image.format()
    );
    Ok(image)
}
