//! Pipeline configuration stored as RON

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::decode::DecodeOptions;
use crate::error::ConfigError;
use crate::format::PixelFormat;
use crate::geometry::{TileLimit, HARDWARE_TILE_LIMIT};
use crate::palette::ColorKey;
use crate::texture::Location;

/// Decode and draw settings shared by a whole run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Largest texture window per binding
    pub tile_width: u32,
    pub tile_height: u32,
    /// Format images are decoded into
    pub pixel_format: PixelFormat,
    /// RGB made transparent on decode
    pub color_key: Option<[u8; 3]>,
    pub location: Location,
    pub swizzle: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tile_width: HARDWARE_TILE_LIMIT,
            tile_height: HARDWARE_TILE_LIMIT,
            pixel_format: PixelFormat::Rgba8888,
            color_key: None,
            location: Location::Ram,
            swizzle: false,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(ConfigError::InvalidTileLimit(self.tile_width, self.tile_height));
        }
        Ok(())
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            color_key: self.color_key.map(ColorKey::from),
            location: self.location,
            swizzle: self.swizzle,
        }
    }

    pub fn tile_limit(&self) -> TileLimit {
        TileLimit::new(self.tile_width, self.tile_height)
    }
}

/// Load a configuration from a RON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    config_from_str(&contents)
}

/// Save a configuration to a RON file
pub fn save_config<P: AsRef<Path>>(config: &PipelineConfig, path: P) -> Result<(), ConfigError> {
    config.validate()?;
    let pretty = ron::ser::PrettyConfig::new()
        .depth_limit(2)
        .indentor("  ".to_string());

    let contents = ron::ser::to_string_pretty(config, pretty)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Parse a configuration from a RON string (for embedded defaults or testing)
pub fn config_from_str(s: &str) -> Result<PipelineConfig, ConfigError> {
    let config: PipelineConfig = ron::from_str(s)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = config_from_str("(pixel_format: Indexed4)").unwrap();
        assert_eq!(config.pixel_format, PixelFormat::Indexed4);
        assert_eq!(config.tile_limit(), TileLimit::HARDWARE);
        assert_eq!(config.location, Location::Ram);
        assert!(!config.swizzle);
    }

    #[test]
    fn test_projection_into_options() {
        let config = config_from_str("(tile_width: 256, tile_height: 64, color_key: Some((255, 0, 255)), location: Vram, swizzle: true)").unwrap();
        assert_eq!(config.tile_limit(), TileLimit::new(256, 64));
        let opts = config.decode_options();
        assert_eq!(opts.color_key, Some(ColorKey::new(255, 0, 255)));
        assert_eq!(opts.location, Location::Vram);
        assert!(opts.swizzle);
    }

    #[test]
    fn test_zero_tile_limit_rejected() {
        let err = config_from_str("(tile_width: 0)").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTileLimit(0, 512)));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(config_from_str("(tile_width: \"wide\")"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_save_and_load() {
        let config = PipelineConfig {
            tile_width: 128,
            pixel_format: PixelFormat::Rgba5551,
            color_key: Some([1, 2, 3]),
            ..Default::default()
        };
        let path = std::env::temp_dir().join(format!("tilegfx-config-{}.ron", std::process::id()));
        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, config);
    }
}
