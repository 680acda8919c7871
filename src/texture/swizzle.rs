//! Hardware-tiled ("swizzled") memory layout
//!
//! The buffer is cut into blocks of 16 bytes x 8 rows. Blocks are stored
//! contiguously, left to right and then top to bottom, so one texture fetch
//! pulls a compact 2-D neighbourhood into the cache.

use super::{alloc_zeroed, Image};
use crate::error::DecodeError;

const BLOCK_WIDTH: usize = 16;
const BLOCK_HEIGHT: usize = 8;
const BLOCK_SIZE: usize = BLOCK_WIDTH * BLOCK_HEIGHT;

/// Byte offset of (x_bytes, y) inside a swizzled buffer with the given stride
pub fn swizzled_offset(x_bytes: usize, y: usize, stride_bytes: usize) -> usize {
    let blocks_per_row = stride_bytes / BLOCK_WIDTH;
    let block = (y / BLOCK_HEIGHT) * blocks_per_row + x_bytes / BLOCK_WIDTH;
    block * BLOCK_SIZE + (y % BLOCK_HEIGHT) * BLOCK_WIDTH + x_bytes % BLOCK_WIDTH
}

impl Image {
    fn check_swizzle_geometry(&self) -> Result<(), DecodeError> {
        if self.stride_bytes() % BLOCK_WIDTH != 0 || self.real_height as usize % BLOCK_HEIGHT != 0 {
            return Err(DecodeError::UnsupportedPixelFormat(format!(
                "{:?} buffer of {} bytes x {} rows cannot be swizzled",
                self.format,
                self.stride_bytes(),
                self.real_height
            )));
        }
        Ok(())
    }

    /// Reorder the buffer into the hardware-tiled layout (no-op if already done)
    pub fn swizzle(&mut self) -> Result<(), DecodeError> {
        if self.swizzled {
            return Ok(());
        }
        self.check_swizzle_geometry()?;

        let stride = self.stride_bytes();
        let mut out = alloc_zeroed(self.data.len())?;
        for y in 0..self.real_height as usize {
            let row = &self.data[y * stride..(y + 1) * stride];
            for (xb, &byte) in row.iter().enumerate() {
                out[swizzled_offset(xb, y, stride)] = byte;
            }
        }
        self.data = out;
        self.swizzled = true;
        Ok(())
    }

    /// Restore the linear row-major layout (no-op if not swizzled)
    pub fn unswizzle(&mut self) -> Result<(), DecodeError> {
        if !self.swizzled {
            return Ok(());
        }
        self.check_swizzle_geometry()?;

        let stride = self.stride_bytes();
        let mut out = alloc_zeroed(self.data.len())?;
        for y in 0..self.real_height as usize {
            for xb in 0..stride {
                out[y * stride + xb] = self.data[swizzled_offset(xb, y, stride)];
            }
        }
        self.data = out;
        self.swizzled = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::PixelFormat;
    use crate::texture::Location;

    #[test]
    fn test_block_addressing() {
        assert_eq!(swizzled_offset(0, 0, 64), 0);
        assert_eq!(swizzled_offset(15, 0, 64), 15);
        assert_eq!(swizzled_offset(16, 0, 64), 128);
        assert_eq!(swizzled_offset(0, 1, 64), 16);
        assert_eq!(swizzled_offset(0, 8, 64), 4 * 128);
    }

    #[test]
    fn test_block_aligned_origin_matches_scaled_linear_address() {
        // A block-aligned origin lands where the linear address of (8x, y) would
        let stride = 2048;
        for &(xb, y) in &[(0usize, 0usize), (1024, 0), (0, 512), (1024, 512)] {
            assert_eq!(swizzled_offset(xb, y, stride), y * stride + xb * 8);
        }
    }

    #[test]
    fn test_pixels_survive_swizzle() {
        let mut img = Image::new(40, 20, PixelFormat::Rgb565, Location::Ram).unwrap();
        for y in 0..20 {
            for x in 0..40 {
                img.set_pixel(x, y, x * 100 + y);
            }
        }
        let linear = img.data().to_vec();

        img.swizzle().unwrap();
        assert!(img.is_swizzled());
        assert_ne!(img.data(), &linear[..]);
        assert_eq!(img.get_pixel(33, 17), Some(33 * 100 + 17));

        img.set_pixel(1, 1, 7);
        img.unswizzle().unwrap();
        assert_eq!(img.get_pixel(1, 1), Some(7));
        assert_eq!(img.get_pixel(39, 19), Some(39 * 100 + 19));
    }

    #[test]
    fn test_swizzle_nibbles() {
        let mut img = Image::new(50, 9, PixelFormat::Indexed4, Location::Ram).unwrap();
        img.set_pixel(49, 8, 0xc);
        img.set_pixel(48, 8, 0x3);
        img.swizzle().unwrap();
        assert_eq!(img.get_pixel(49, 8), Some(0xc));
        assert_eq!(img.get_pixel(48, 8), Some(0x3));
    }
}
