//! Image loading errors
//!
//! Every reader and writer in this crate returns [`IoError`]. The verdict
//! engine never sees these directly: its file access wraps any `IoError`
//! into an image-load failure for the one test or baseline image that
//! could not be read, so a corrupt baseline costs only its own comparison.

use thiserror::Error;

/// Failure to read or write an image file
#[derive(Error, Debug)]
pub enum IoError {
    /// Opening, reading or writing the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unknown magic bytes, a format whose feature is disabled, or a
    /// sample layout the format cannot hold
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Header or raster contradicts itself: truncated data, zero or
    /// oversized extents, palette indices outside the color map
    #[error("invalid image data: {0}")]
    InvalidData(String),

    /// PNG, JPEG or TIFF decoder error
    #[error("decode error: {0}")]
    DecodeError(String),

    /// PNG, PNM or TIFF encoder error, including samples the target
    /// bit depth cannot represent
    #[error("encode error: {0}")]
    EncodeError(String),

    /// Decoded extents or sample count rejected by [`imgreg_core::PixelBuffer`]
    #[error("core error: {0}")]
    Core(#[from] imgreg_core::Error),
}

pub type IoResult<T> = Result<T, IoError>;
