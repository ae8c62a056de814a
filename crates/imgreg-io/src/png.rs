//! PNG image format support
//!
//! Decodes every PNG color type into a 2-D [`PixelBuffer`] whose component
//! count follows the color type. Indexed images are expanded through their
//! palette to RGB. Samples keep their stored integer values (no scaling to
//! a common range), so a 16-bit PNG compares on the 0..=65535 scale.

use crate::{IoError, IoResult, integral_max};
use imgreg_core::{PixelBuffer, Shape};
use png::{BitDepth, ColorType, Decoder, Encoder};
use std::io::{BufRead, Seek, Write};

/// Read a PNG image
pub fn read_png<R: BufRead + Seek>(reader: R) -> IoResult<PixelBuffer> {
    let decoder = Decoder::new(reader);
    let mut reader = decoder
        .read_info()
        .map_err(|e| IoError::DecodeError(format!("PNG decode error: {}", e)))?;

    let info = reader.info();
    let width = info.width as usize;
    let height = info.height as usize;
    let color_type = info.color_type;
    let bit_depth = info.bit_depth;
    let palette: Option<Vec<u8>> = info.palette.as_ref().map(|p| p.to_vec());

    let components = match color_type {
        ColorType::Grayscale => 1,
        ColorType::GrayscaleAlpha => 2,
        ColorType::Rgb | ColorType::Indexed => 3,
        ColorType::Rgba => 4,
        #[allow(unreachable_patterns)]
        _ => {
            return Err(IoError::UnsupportedFormat(format!(
                "unsupported PNG color type: {:?}",
                color_type
            )));
        }
    };

    let buf_size = reader
        .output_buffer_size()
        .ok_or_else(|| IoError::DecodeError("failed to get output buffer size".to_string()))?;
    let mut buf = vec![0; buf_size];
    let output_info = reader
        .next_frame(&mut buf)
        .map_err(|e| IoError::DecodeError(format!("PNG frame error: {}", e)))?;

    let bytes_per_row = output_info.line_size;
    let data = &buf[..output_info.buffer_size()];
    let shape = Shape::new_2d(width, height)?;
    let mut samples = Vec::with_capacity(width * height * components);

    match (color_type, bit_depth) {
        (
            ColorType::Grayscale | ColorType::Indexed,
            BitDepth::One | BitDepth::Two | BitDepth::Four,
        ) => {
            let bits = bit_depth as usize;
            let mask = (1u8 << bits) - 1;
            let per_byte = 8 / bits;
            for y in 0..height {
                let row = &data[y * bytes_per_row..(y + 1) * bytes_per_row];
                for x in 0..width {
                    let shift = 8 - bits * (x % per_byte + 1);
                    let val = (row[x / per_byte] >> shift) & mask;
                    push_sample(&mut samples, val, color_type, palette.as_deref())?;
                }
            }
        }
        (_, BitDepth::Eight) => {
            let per_pixel = if color_type == ColorType::Indexed { 1 } else { components };
            for y in 0..height {
                let row = &data[y * bytes_per_row..y * bytes_per_row + width * per_pixel];
                if color_type == ColorType::Indexed {
                    for &index in row {
                        push_sample(&mut samples, index, color_type, palette.as_deref())?;
                    }
                } else {
                    samples.extend(row.iter().map(|&v| v as f64));
                }
            }
        }
        (_, BitDepth::Sixteen) => {
            for y in 0..height {
                let row = &data[y * bytes_per_row..y * bytes_per_row + width * components * 2];
                samples.extend(
                    row.chunks_exact(2)
                        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]) as f64),
                );
            }
        }
        _ => {
            return Err(IoError::UnsupportedFormat(format!(
                "unsupported PNG format: {:?} {:?}",
                color_type, bit_depth
            )));
        }
    }

    Ok(PixelBuffer::from_data(shape, components, samples)?)
}

/// Append one decoded value, expanding palette indices to RGB
fn push_sample(
    samples: &mut Vec<f64>,
    value: u8,
    color_type: ColorType,
    palette: Option<&[u8]>,
) -> IoResult<()> {
    if color_type != ColorType::Indexed {
        samples.push(value as f64);
        return Ok(());
    }
    let palette =
        palette.ok_or_else(|| IoError::InvalidData("indexed PNG without palette".to_string()))?;
    let start = value as usize * 3;
    let rgb = palette.get(start..start + 3).ok_or_else(|| {
        IoError::InvalidData(format!("palette index {} out of range", value))
    })?;
    samples.extend(rgb.iter().map(|&v| v as f64));
    Ok(())
}

/// Write a 2-D buffer as PNG
///
/// The buffer must have 1 (gray), 2 (gray + alpha), 3 (RGB) or 4 (RGBA)
/// components and integral samples. Samples in 0..=255 are written at 8
/// bits, samples in 0..=65535 at 16 bits.
pub fn write_png<W: Write>(buffer: &PixelBuffer, writer: W) -> IoResult<()> {
    let shape = buffer.shape();
    if shape.ndim() != 2 {
        return Err(IoError::UnsupportedFormat(format!(
            "PNG holds 2-D images only, got shape {}",
            shape
        )));
    }
    let color_type = match buffer.components() {
        1 => ColorType::Grayscale,
        2 => ColorType::GrayscaleAlpha,
        3 => ColorType::Rgb,
        4 => ColorType::Rgba,
        n => {
            return Err(IoError::UnsupportedFormat(format!(
                "PNG cannot hold {} components per pixel",
                n
            )));
        }
    };
    let bit_depth = integral_depth(buffer).ok_or_else(|| {
        IoError::EncodeError("PNG needs integral samples in 0..=65535".to_string())
    })?;

    let width = u32::try_from(shape.extents()[0])
        .map_err(|_| IoError::EncodeError("width exceeds PNG limits".to_string()))?;
    let height = u32::try_from(shape.extents()[1])
        .map_err(|_| IoError::EncodeError("height exceeds PNG limits".to_string()))?;

    let mut encoder = Encoder::new(writer, width, height);
    encoder.set_color(color_type);
    encoder.set_depth(bit_depth);

    let mut writer = encoder
        .write_header()
        .map_err(|e| IoError::EncodeError(format!("PNG header error: {}", e)))?;

    let data: Vec<u8> = match bit_depth {
        BitDepth::Sixteen => buffer
            .data()
            .iter()
            .flat_map(|&v| (v as u16).to_be_bytes())
            .collect(),
        _ => buffer.data().iter().map(|&v| v as u8).collect(),
    };

    writer
        .write_image_data(&data)
        .map_err(|e| IoError::EncodeError(format!("PNG write error: {}", e)))?;
    writer
        .finish()
        .map_err(|e| IoError::EncodeError(format!("PNG finish error: {}", e)))?;

    Ok(())
}

/// Smallest PNG bit depth that holds every sample exactly
fn integral_depth(buffer: &PixelBuffer) -> Option<BitDepth> {
    let max = integral_max(buffer)?;
    if max <= 255.0 {
        Some(BitDepth::Eight)
    } else {
        Some(BitDepth::Sixteen)
    }
}
