//! imgreg-io - Image loading for regression tests
//!
//! Decodes image files into [`PixelBuffer`]s for the regression verdict
//! engine. The format is detected from the file contents, never from the
//! extension, so baselines named `name.1.ext` load the same way as
//! `name.ext`.
//!
//! # Supported formats
//!
//! | Format | Read | Write | Feature |
//! |--------|------|-------|---------|
//! | Native | yes  | yes   | always  |
//! | PNG    | yes  | yes   | `png-format` |
//! | TIFF   | yes (multi-page → 3-D) | yes | `tiff-format` |
//! | PNM    | yes  | yes   | `pnm` |
//! | JPEG   | yes  | no    | `jpeg` |

mod error;
mod format;

#[cfg(feature = "jpeg")]
pub mod jpeg;
#[cfg(feature = "png-format")]
pub mod png;
#[cfg(feature = "pnm")]
pub mod pnm;
#[cfg(feature = "tiff-format")]
pub mod tiff;

pub use error::{IoError, IoResult};
pub use format::{ImageFormat, detect_format, detect_format_from_bytes};

use imgreg_core::PixelBuffer;
#[cfg(any(feature = "pnm", feature = "tiff-format"))]
use imgreg_core::buffer::serial::MAX_SAMPLES;
use std::fs::File;
#[allow(unused_imports)]
use std::io::Cursor;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Number of samples in an image of the given extents
///
/// Header fields of a corrupt file can be arbitrarily large, so the product
/// is checked and capped at the native format's sample limit.
#[cfg(any(feature = "pnm", feature = "tiff-format"))]
pub(crate) fn checked_sample_count(factors: &[usize]) -> IoResult<usize> {
    let count = factors
        .iter()
        .try_fold(1usize, |acc, &f| acc.checked_mul(f))
        .filter(|&n| n as u64 <= MAX_SAMPLES)
        .ok_or_else(|| {
            IoError::InvalidData(format!(
                "image extents {:?} exceed the limit of {} samples",
                factors, MAX_SAMPLES
            ))
        })?;
    Ok(count)
}

/// Largest sample if every sample is an integer in 0..=65535
///
/// Used by the writers of integer formats to pick 8 or 16 bits.
#[cfg(any(feature = "pnm", feature = "png-format"))]
pub(crate) fn integral_max(buffer: &PixelBuffer) -> Option<f64> {
    if buffer.data().iter().any(|v| v.fract() != 0.0) {
        return None;
    }
    let (min, max) = buffer.min_max()?;
    (min >= 0.0 && max <= 65535.0).then_some(max)
}

/// Read an image from a file path
///
/// # Examples
///
/// ```no_run
/// let buffer = imgreg_io::read_image("output/segmentation.tif").unwrap();
/// println!("{} with {} components", buffer.shape(), buffer.components());
/// ```
pub fn read_image<P: AsRef<Path>>(path: P) -> IoResult<PixelBuffer> {
    let data = std::fs::read(path.as_ref())?;
    read_image_mem(&data)
}

/// Read an image from memory
pub fn read_image_mem(data: &[u8]) -> IoResult<PixelBuffer> {
    let format = detect_format_from_bytes(data)?;
    read_image_format(data, format)
}

/// Read an image from memory with a known format
pub fn read_image_format(data: &[u8], format: ImageFormat) -> IoResult<PixelBuffer> {
    match format {
        ImageFormat::Native => Ok(PixelBuffer::read_from_bytes(data)?),
        #[cfg(feature = "png-format")]
        ImageFormat::Png => png::read_png(Cursor::new(data)),
        #[cfg(feature = "tiff-format")]
        ImageFormat::Tiff => tiff::read_tiff(Cursor::new(data)),
        #[cfg(feature = "pnm")]
        ImageFormat::Pnm => pnm::read_pnm(data),
        #[cfg(feature = "jpeg")]
        ImageFormat::Jpeg => jpeg::read_jpeg(data),
        #[allow(unreachable_patterns)]
        other => Err(IoError::UnsupportedFormat(format!(
            "{:?} support not enabled",
            other
        ))),
    }
}

/// Write an image to a file path
pub fn write_image<P: AsRef<Path>>(
    buffer: &PixelBuffer,
    path: P,
    format: ImageFormat,
) -> IoResult<()> {
    let bytes = write_image_mem(buffer, format)?;
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Encode an image to memory
pub fn write_image_mem(buffer: &PixelBuffer, format: ImageFormat) -> IoResult<Vec<u8>> {
    match format {
        ImageFormat::Native => Ok(buffer.write_to_bytes()?),
        #[cfg(feature = "png-format")]
        ImageFormat::Png => {
            let mut out = Vec::new();
            png::write_png(buffer, &mut out)?;
            Ok(out)
        }
        #[cfg(feature = "tiff-format")]
        ImageFormat::Tiff => {
            let mut out = Cursor::new(Vec::new());
            tiff::write_tiff(buffer, &mut out)?;
            Ok(out.into_inner())
        }
        #[cfg(feature = "pnm")]
        ImageFormat::Pnm => {
            let mut out = Vec::new();
            pnm::write_pnm(buffer, &mut out)?;
            Ok(out)
        }
        ImageFormat::Jpeg => Err(IoError::UnsupportedFormat(
            "JPEG writing is not supported".to_string(),
        )),
        #[allow(unreachable_patterns)]
        other => Err(IoError::UnsupportedFormat(format!(
            "{:?} support not enabled",
            other
        ))),
    }
}
