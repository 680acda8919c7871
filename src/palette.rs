//! Indexed-color palettes and color-key transparency

use serde::{Deserialize, Serialize};

use crate::format::{Color, PixelFormat};

/// RGB value treated as fully transparent while decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorKey {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ColorKey {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn matches(self, r: u8, g: u8, b: u8) -> bool {
        self.r == r && self.g == g && self.b == b
    }
}

impl From<[u8; 3]> for ColorKey {
    fn from(rgb: [u8; 3]) -> Self {
        Self::new(rgb[0], rgb[1], rgb[2])
    }
}

/// Ordered color table owned by an indexed image
///
/// Entries are stored in the 32-bit `Rgba8888` encoding. The entry count is
/// capped at the addressing capacity of the format the palette serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: Vec<u32>,
    capacity: usize,
}

impl Palette {
    /// Empty palette sized for `format`
    pub fn new(format: PixelFormat) -> Self {
        let capacity = format.palette_capacity();
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Storage encoding of every entry
    pub fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Rgba8888
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn entries(&self) -> &[u32] {
        &self.entries
    }

    /// Append an entry; returns false once the capacity is reached
    pub fn push(&mut self, value: u32) -> bool {
        if self.is_full() {
            return false;
        }
        self.entries.push(value);
        true
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        self.entries.get(index).copied()
    }

    /// Color at `index`, transparent black past the end
    pub fn color(&self, index: usize) -> Color {
        self.get(index).map(Color::from_u32).unwrap_or(Color::TRANSPARENT)
    }

    /// Index of the first entry equal to `value`
    pub fn find(&self, value: u32) -> Option<usize> {
        self.entries.iter().position(|&e| e == value)
    }
}

/// Builds a [`Palette`] from a decoded file's native color table
#[derive(Debug, Clone, Copy)]
pub struct PaletteBuilder {
    format: PixelFormat,
    color_key: Option<ColorKey>,
    transparent_index: Option<usize>,
}

impl PaletteBuilder {
    pub fn new(format: PixelFormat) -> Self {
        Self {
            format,
            color_key: None,
            transparent_index: None,
        }
    }

    pub fn color_key(mut self, key: Option<ColorKey>) -> Self {
        self.color_key = key;
        self
    }

    /// Entry the source container marks as transparent (GIF graphic control)
    pub fn transparent_index(mut self, index: Option<usize>) -> Self {
        self.transparent_index = index;
        self
    }

    /// Copy `native` in order, truncated to the format's capacity
    ///
    /// Alpha is opaque except for the transparent index and entries whose RGB
    /// equals the color key.
    pub fn build(&self, native: &[[u8; 3]]) -> Palette {
        let mut palette = Palette::new(self.format);
        let count = native.len().min(palette.capacity());
        if count < native.len() {
            tracing::debug!(
                "native palette has {} entries, keeping {} for {:?}",
                native.len(),
                count,
                self.format
            );
        }

        for (i, &[r, g, b]) in native[..count].iter().enumerate() {
            let keyed = self.color_key.map(|k| k.matches(r, g, b)).unwrap_or(false);
            let a = if keyed || self.transparent_index == Some(i) { 0 } else { 0xff };
            palette.push(Color::with_alpha(r, g, b, a).to_u32());
        }
        palette
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(n: usize) -> Vec<[u8; 3]> {
        (0..n).map(|i| [i as u8, (i * 2) as u8, (i * 3) as u8]).collect()
    }

    #[test]
    fn test_build_preserves_order() {
        let native = table(5);
        let palette = PaletteBuilder::new(PixelFormat::Indexed8).build(&native);
        assert_eq!(palette.len(), 5);
        for (i, rgb) in native.iter().enumerate() {
            let c = palette.color(i);
            assert_eq!(c.rgb(), *rgb);
            assert_eq!(c.a, 0xff);
        }
    }

    #[test]
    fn test_build_truncates_to_capacity() {
        let palette = PaletteBuilder::new(PixelFormat::Indexed4).build(&table(40));
        assert_eq!(palette.len(), 16);
        assert_eq!(palette.color(15).rgb(), [15, 30, 45]);
    }

    #[test]
    fn test_color_key_clears_alpha() {
        let native = vec![[255, 0, 255], [1, 2, 3], [255, 0, 255]];
        let palette = PaletteBuilder::new(PixelFormat::Indexed8)
            .color_key(Some(ColorKey::new(255, 0, 255)))
            .build(&native);
        assert_eq!(palette.color(0).a, 0);
        assert_eq!(palette.color(1).a, 0xff);
        assert_eq!(palette.color(2).a, 0);
        assert_eq!(palette.color(2).rgb(), [255, 0, 255]);
    }

    #[test]
    fn test_transparent_index_clears_only_that_entry() {
        let native = vec![[9, 9, 9], [9, 9, 9], [4, 5, 6]];
        let palette = PaletteBuilder::new(PixelFormat::Indexed8)
            .transparent_index(Some(1))
            .build(&native);
        assert_eq!(palette.color(0).a, 0xff);
        assert_eq!(palette.color(1), Color::with_alpha(9, 9, 9, 0));
        assert_eq!(palette.color(2).a, 0xff);

        // An index past the table changes nothing
        let palette = PaletteBuilder::new(PixelFormat::Indexed8)
            .transparent_index(Some(200))
            .build(&native);
        assert!(palette.entries().iter().all(|&e| Color::from_u32(e).a == 0xff));
    }

    #[test]
    fn test_push_respects_capacity() {
        let mut palette = Palette::new(PixelFormat::Indexed4);
        for i in 0..16 {
            assert!(palette.push(i));
        }
        assert!(!palette.push(99));
        assert_eq!(palette.len(), 16);
        assert_eq!(palette.find(7), Some(7));
        assert_eq!(palette.find(99), None);
    }

    #[test]
    fn test_direct_formats_have_no_slots() {
        let mut palette = Palette::new(PixelFormat::Rgba8888);
        assert!(!palette.push(0));
        assert!(palette.is_empty());
    }
}
