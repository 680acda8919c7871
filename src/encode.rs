//! PNG output of an image's visible rectangle

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::EncodeError;
use crate::format::Color;
use crate::texture::Image;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Write an alpha channel (RGBA instead of RGB)
    pub alpha: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self { alpha: true }
    }
}

/// Source coordinates along one axis, clipped to `[0, size)` and walked from
/// the first raw bound toward the second
fn axis(first: i32, last: i32, size: u32) -> Vec<u32> {
    let size = size as i32;
    let lo = first.min(last).clamp(0, size);
    let hi = first.max(last).clamp(0, size);
    let coords = (lo..hi).map(|c| c as u32);
    if first > last {
        coords.rev().collect()
    } else {
        coords.collect()
    }
}

/// Encode the image's source rectangle as an 8-bit RGB or RGBA PNG
///
/// A mirrored rectangle is written mirrored. Parts of the rectangle outside
/// the image are dropped.
pub fn encode_png<W: Write>(image: &Image, writer: W, options: EncodeOptions) -> Result<(), EncodeError> {
    let rect = image.transform.rect;
    let xs = axis(rect.x0, rect.x1, image.width());
    let ys = axis(rect.y0, rect.y1, image.height());
    if xs.is_empty() || ys.is_empty() {
        return Err(EncodeError::EmptyRect);
    }

    let channels = if options.alpha { 4 } else { 3 };
    let mut data = Vec::with_capacity(xs.len() * ys.len() * channels);
    for &y in &ys {
        for &x in &xs {
            let c = image.pixel_color(x, y).unwrap_or(Color::TRANSPARENT);
            data.extend_from_slice(&c.to_bytes()[..channels]);
        }
    }

    let mut encoder = png::Encoder::new(writer, xs.len() as u32, ys.len() as u32);
    encoder.set_color(if options.alpha {
        png::ColorType::Rgba
    } else {
        png::ColorType::Rgb
    });
    encoder.set_depth(png::BitDepth::Eight);
    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(&data)?;
    png_writer.finish()?;

    tracing::debug!("encoded {}x{} PNG (alpha: {})", xs.len(), ys.len(), options.alpha);
    Ok(())
}

/// Write the image's source rectangle to a PNG file
pub fn write_image_file(image: &Image, path: impl AsRef<Path>, options: EncodeOptions) -> Result<(), EncodeError> {
    let path = path.as_ref();
    let file = File::create(path)?;
    encode_png(image, BufWriter::new(file), options)?;
    tracing::info!("saved {}", path.display());
    Ok(())
}
