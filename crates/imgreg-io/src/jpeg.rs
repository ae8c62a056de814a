//! JPEG image format support
//!
//! Reads JPEG images using the `jpeg-decoder` crate. Lossy baselines are
//! the usual reason to compare with an intensity tolerance, so only
//! decoding is provided.

use crate::{IoError, IoResult};
use imgreg_core::{PixelBuffer, Shape};
use jpeg_decoder::{Decoder, PixelFormat};
use std::io::Read;

/// Read a JPEG image from a reader.
///
/// # Returns
/// A 2-D buffer with 1 component (grayscale) or 3 components (RGB).
pub fn read_jpeg<R: Read>(reader: R) -> IoResult<PixelBuffer> {
    let mut decoder = Decoder::new(reader);
    let pixels = decoder
        .decode()
        .map_err(|e| IoError::DecodeError(format!("JPEG decode error: {}", e)))?;
    let info = decoder
        .info()
        .ok_or_else(|| IoError::DecodeError("JPEG metadata unavailable".to_string()))?;

    let shape = Shape::new_2d(info.width as usize, info.height as usize)?;
    let (components, samples): (usize, Vec<f64>) = match info.pixel_format {
        PixelFormat::L8 => (1, pixels.iter().map(|&v| v as f64).collect()),
        PixelFormat::L16 => (
            1,
            pixels
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]) as f64)
                .collect(),
        ),
        PixelFormat::RGB24 => (3, pixels.iter().map(|&v| v as f64).collect()),
        PixelFormat::CMYK32 => {
            return Err(IoError::UnsupportedFormat(
                "CMYK JPEG is not supported".to_string(),
            ));
        }
    };

    Ok(PixelBuffer::from_data(shape, components, samples)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_is_decode_error() {
        let err = read_jpeg(&[0xFF, 0xD8, 0xFF, 0x00, 0x01][..]).unwrap_err();
        assert!(matches!(err, IoError::DecodeError(_)));
    }
}
