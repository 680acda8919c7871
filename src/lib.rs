//! tilegfx: image pipeline for a fixed-function rasterizer with bounded textures
//!
//! - Decodes PNG, JPEG, GIF and BMP into padded buffers in one of six pixel formats
//! - Builds palettes with color-key transparency for indexed formats
//! - Tessellates images larger than the hardware texture limit into tile quads
//! - Draws under translation, rotation about a pivot, scale and mirroring

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod format;
pub mod geometry;
pub mod math;
pub mod palette;
pub mod raster;
pub mod texture;

pub use config::PipelineConfig;
pub use decode::{decode, load_image_file, DecodeOptions};
pub use encode::{encode_png, write_image_file, EncodeOptions};
pub use error::{ConfigError, DecodeError, EncodeError};
pub use format::{Color, PixelFormat};
pub use geometry::{draw_image, tessellate, TileLimit};
pub use palette::{ColorKey, Palette, PaletteBuilder};
pub use raster::{Framebuffer, RasterContext, Rasterizer};
pub use texture::{Image, Location};
