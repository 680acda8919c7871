//! Container parsing into a normalized native representation
//!
//! Whatever the file stores, samples come out as one byte per channel:
//! 16-bit channels are stripped and sub-byte samples are unpacked. Indexed
//! PNG and GIF images keep their indices alongside the color table.

use std::io::Cursor;

use crate::error::DecodeError;
use crate::texture::alloc_zeroed;

/// Channel layout of a decoded file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorModel {
    Gray,
    GrayAlpha,
    Rgb,
    Rgba,
    Indexed,
}

impl ColorModel {
    /// Bytes per pixel in [`NativeImage::samples`]
    pub fn channels(self) -> usize {
        match self {
            ColorModel::Gray | ColorModel::Indexed => 1,
            ColorModel::GrayAlpha => 2,
            ColorModel::Rgb => 3,
            ColorModel::Rgba => 4,
        }
    }

    pub fn is_indexed(self) -> bool {
        self == ColorModel::Indexed
    }
}

/// A decoded file before conversion to a [`PixelFormat`](crate::format::PixelFormat)
#[derive(Debug, Clone)]
pub struct NativeImage {
    pub width: u32,
    pub height: u32,
    pub model: ColorModel,
    /// Bit depth as stored in the file
    pub depth: u8,
    /// Row-major, `model.channels()` bytes per pixel, no row padding
    pub samples: Vec<u8>,
    /// Native color table, only for indexed images
    pub palette: Vec<[u8; 3]>,
    /// Table entry the container itself marks as transparent
    pub transparent: Option<usize>,
}

impl NativeImage {
    /// Channel bytes of pixel (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let n = self.model.channels();
        let i = (y as usize * self.width as usize + x as usize) * n;
        &self.samples[i..i + n]
    }
}

/// Parse a PNG stream, keeping palette indices intact
pub fn read_png(bytes: &[u8]) -> Result<NativeImage, DecodeError> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::STRIP_16);
    let mut reader = decoder.read_info()?;

    let (depth, palette) = {
        let info = reader.info();
        let palette: Vec<[u8; 3]> = info
            .palette
            .as_ref()
            .map(|p| p.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect())
            .unwrap_or_default();
        (info.bit_depth as u8, palette)
    };

    let mut buf = alloc_zeroed(reader.output_buffer_size())?;
    let frame = reader.next_frame(&mut buf)?;

    let model = match frame.color_type {
        png::ColorType::Grayscale => ColorModel::Gray,
        png::ColorType::GrayscaleAlpha => ColorModel::GrayAlpha,
        png::ColorType::Rgb => ColorModel::Rgb,
        png::ColorType::Rgba => ColorModel::Rgba,
        png::ColorType::Indexed => ColorModel::Indexed,
    };
    let bits = frame.bit_depth as u8;
    let (width, height) = (frame.width, frame.height);

    let samples = if bits >= 8 {
        let row_bytes = width as usize * model.channels();
        if frame.line_size == row_bytes {
            buf.truncate(row_bytes * height as usize);
            buf
        } else {
            let mut out = alloc_zeroed(row_bytes * height as usize)?;
            for (dst, src) in out.chunks_exact_mut(row_bytes).zip(buf.chunks(frame.line_size)) {
                dst.copy_from_slice(&src[..row_bytes]);
            }
            out
        }
    } else {
        // Sub-byte depths only exist for gray and indexed images
        let mut out = alloc_zeroed(width as usize * height as usize)?;
        let scale_gray = model == ColorModel::Gray;
        for (y, row) in buf.chunks(frame.line_size).take(height as usize).enumerate() {
            for x in 0..width as usize {
                let v = unpack_sample(row, x, bits);
                out[y * width as usize + x] = if scale_gray { scale_to_byte(v, bits) } else { v };
            }
        }
        out
    };

    if model.is_indexed() && palette.is_empty() {
        return Err(DecodeError::CorruptData("indexed image without a color table".to_string()));
    }

    Ok(NativeImage {
        width,
        height,
        model,
        depth,
        samples,
        palette,
        transparent: None,
    })
}

/// Parse the first frame of a GIF stream as indices into its color table
///
/// The image takes the frame's size; its position on the logical screen is
/// ignored. The frame's local table wins over the global one.
pub fn read_gif(bytes: &[u8]) -> Result<NativeImage, DecodeError> {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::Indexed);
    let mut decoder = options.read_info(Cursor::new(bytes))?;
    let global: Option<Vec<u8>> = decoder.global_palette().map(|p| p.to_vec());

    let frame = decoder
        .read_next_frame()?
        .ok_or_else(|| DecodeError::CorruptData("GIF stream holds no image frame".to_string()))?;

    let table = frame
        .palette
        .as_deref()
        .or(global.as_deref())
        .ok_or_else(|| DecodeError::CorruptData("GIF frame without a color table".to_string()))?;
    let palette: Vec<[u8; 3]> = table.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();

    let (width, height) = (frame.width as u32, frame.height as u32);
    let mut samples = alloc_zeroed(width as usize * height as usize)?;
    let n = samples.len().min(frame.buffer.len());
    samples[..n].copy_from_slice(&frame.buffer[..n]);

    Ok(NativeImage {
        width,
        height,
        model: ColorModel::Indexed,
        depth: 8,
        samples,
        palette,
        transparent: frame.transparent.map(usize::from),
    })
}

/// Sample `x` of a row packed MSB-first at `bits` per sample
fn unpack_sample(row: &[u8], x: usize, bits: u8) -> u8 {
    let bits = bits as usize;
    let bit = x * bits;
    let shift = 8 - bits - (bit % 8);
    let mask = ((1u16 << bits) - 1) as u8;
    row.get(bit / 8).map(|b| (b >> shift) & mask).unwrap_or(0)
}

/// Stretch a `bits`-wide value over 0..=255
fn scale_to_byte(v: u8, bits: u8) -> u8 {
    let max = (1u16 << bits) - 1;
    (v as u16 * 255 / max) as u8
}

/// Parse a truecolor container (JPEG, BMP) through the `image` crate
pub fn read_with_image(bytes: &[u8], format: image::ImageFormat) -> Result<NativeImage, DecodeError> {
    let decoded = image::load_from_memory_with_format(bytes, format)?;
    let (width, height) = (decoded.width(), decoded.height());

    let (model, samples) = match decoded {
        image::DynamicImage::ImageLuma8(buf) => (ColorModel::Gray, buf.into_raw()),
        image::DynamicImage::ImageLumaA8(buf) => (ColorModel::GrayAlpha, buf.into_raw()),
        image::DynamicImage::ImageRgb8(buf) => (ColorModel::Rgb, buf.into_raw()),
        other => (ColorModel::Rgba, other.to_rgba8().into_raw()),
    };

    Ok(NativeImage {
        width,
        height,
        model,
        depth: 8,
        samples,
        palette: Vec::new(),
        transparent: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpack_sample_msb_first() {
        let row = [0b1011_0001u8, 0b1100_0000];
        assert_eq!(unpack_sample(&row, 0, 1), 1);
        assert_eq!(unpack_sample(&row, 1, 1), 0);
        assert_eq!(unpack_sample(&row, 7, 1), 1);
        assert_eq!(unpack_sample(&row, 0, 2), 0b10);
        assert_eq!(unpack_sample(&row, 3, 2), 0b01);
        assert_eq!(unpack_sample(&row, 4, 2), 0b11);
        assert_eq!(unpack_sample(&row, 0, 4), 0xb);
        assert_eq!(unpack_sample(&row, 1, 4), 0x1);
        assert_eq!(unpack_sample(&row, 9, 4), 0);
    }

    #[test]
    fn test_scale_to_byte() {
        assert_eq!(scale_to_byte(1, 1), 255);
        assert_eq!(scale_to_byte(0, 1), 0);
        assert_eq!(scale_to_byte(2, 2), 170);
        assert_eq!(scale_to_byte(15, 4), 255);
    }
}
