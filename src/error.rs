//! Error types shared by the decoder, encoder and configuration loader

use thiserror::Error;

/// Failure while decoding an image or allocating its buffers
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Missing or unrecognized file signature
    #[error("invalid image format: missing or unknown signature")]
    InvalidFormat,
    /// Stream ended early or failed to parse mid-way
    #[error("corrupt image data: {0}")]
    CorruptData(String),
    /// Pixel buffer or palette could not be obtained
    #[error("allocation of {0} bytes failed")]
    AllocationFailure(usize),
    /// Format or bit-depth combination the codec cannot represent
    #[error("unsupported pixel format: {0}")]
    UnsupportedPixelFormat(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<png::DecodingError> for DecodeError {
    fn from(e: png::DecodingError) -> Self {
        match e {
            png::DecodingError::IoError(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
                DecodeError::CorruptData("unexpected end of stream".to_string())
            }
            png::DecodingError::IoError(io) => DecodeError::Io(io),
            png::DecodingError::LimitsExceeded => DecodeError::AllocationFailure(0),
            other => DecodeError::CorruptData(other.to_string()),
        }
    }
}

impl From<image::ImageError> for DecodeError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::IoError(io) => DecodeError::Io(io),
            image::ImageError::Limits(_) => DecodeError::AllocationFailure(0),
            image::ImageError::Unsupported(u) => DecodeError::UnsupportedPixelFormat(u.to_string()),
            other => DecodeError::CorruptData(other.to_string()),
        }
    }
}

impl From<gif::DecodingError> for DecodeError {
    fn from(e: gif::DecodingError) -> Self {
        match e {
            gif::DecodingError::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
                DecodeError::CorruptData("unexpected end of stream".to_string())
            }
            gif::DecodingError::Io(io) => DecodeError::Io(io),
            gif::DecodingError::OutOfMemory | gif::DecodingError::MemoryLimit => DecodeError::AllocationFailure(0),
            other => DecodeError::CorruptData(other.to_string()),
        }
    }
}

/// Failure while writing an image back out
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The visible rectangle has no pixels inside the image
    #[error("source rectangle is empty")]
    EmptyRect,
    #[error("PNG encoder error: {0}")]
    Png(#[from] png::EncodingError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure while loading or saving a pipeline configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Serialize error: {0}")]
    Serialize(#[from] ron::Error),
    #[error("tile limit must be non-zero, got {0}x{1}")]
    InvalidTileLimit(u32, u32),
}
