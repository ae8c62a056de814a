//! PNM (Portable Any Map) format support
//!
//! Reads PGM (P2 ASCII, P5 binary) and PPM (P3 ASCII, P6 binary) at 8 or
//! 16 bits per sample, and writes binary P5/P6. Bitmaps (P1/P4) and PAM
//! (P7) are not supported.

use crate::{IoError, IoResult, checked_sample_count, integral_max};
use imgreg_core::{PixelBuffer, Shape};
use std::io::{Read, Write};

/// Parsed PNM header
struct PnmHeader {
    magic: [u8; 2],
    width: usize,
    height: usize,
    maxval: u32,
    /// Offset of the first raster byte
    data_start: usize,
}

/// Read a PNM image (P2/P3/P5/P6) from a reader.
///
/// # Returns
/// A 2-D buffer with 1 component (PGM) or 3 components (PPM).
pub fn read_pnm<R: Read>(mut reader: R) -> IoResult<PixelBuffer> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;

    let header = parse_header(&data)?;
    let components = match &header.magic {
        b"P2" | b"P5" => 1,
        b"P3" | b"P6" => 3,
        other => {
            return Err(IoError::UnsupportedFormat(format!(
                "unsupported PNM type: {}",
                String::from_utf8_lossy(other)
            )));
        }
    };
    let count = checked_sample_count(&[header.width, header.height, components])?;
    let raster = &data[header.data_start..];

    let samples: Vec<f64> = if matches!(&header.magic, b"P2" | b"P3") {
        let text = std::str::from_utf8(raster)
            .map_err(|e| IoError::InvalidData(format!("ASCII PNM is not valid text: {}", e)))?;
        let values = text
            .split_whitespace()
            .take(count)
            .map(|tok| {
                tok.parse::<u32>()
                    .map(|v| v as f64)
                    .map_err(|e| IoError::InvalidData(format!("bad PNM sample '{}': {}", tok, e)))
            })
            .collect::<IoResult<Vec<f64>>>()?;
        if values.len() < count {
            return Err(IoError::InvalidData(format!(
                "PNM raster truncated: {} of {} samples",
                values.len(),
                count
            )));
        }
        values
    } else {
        let bytes_per_sample = if header.maxval > 255 { 2 } else { 1 };
        let needed = checked_sample_count(&[count, bytes_per_sample])?;
        if raster.len() < needed {
            return Err(IoError::InvalidData(format!(
                "PNM raster truncated: need {} bytes, have {}",
                needed,
                raster.len()
            )));
        }
        if bytes_per_sample == 2 {
            raster[..needed]
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]) as f64)
                .collect()
        } else {
            raster[..needed].iter().map(|&b| b as f64).collect()
        }
    };

    let shape = Shape::new_2d(header.width, header.height)?;
    Ok(PixelBuffer::from_data(shape, components, samples)?)
}

/// Parse magic, width, height and maxval, skipping `#` comments
fn parse_header(data: &[u8]) -> IoResult<PnmHeader> {
    if data.len() < 2 {
        return Err(IoError::InvalidData("PNM header truncated".to_string()));
    }
    let magic = [data[0], data[1]];
    let mut pos = 2;
    let mut fields = [0u32; 3];

    for field in &mut fields {
        // skip whitespace and comments
        loop {
            match data.get(pos) {
                Some(b) if b.is_ascii_whitespace() => pos += 1,
                Some(b'#') => {
                    while data.get(pos).is_some_and(|&b| b != b'\n') {
                        pos += 1;
                    }
                }
                Some(_) => break,
                None => return Err(IoError::InvalidData("PNM header truncated".to_string())),
            }
        }
        let start = pos;
        while data.get(pos).is_some_and(u8::is_ascii_digit) {
            pos += 1;
        }
        let text = std::str::from_utf8(&data[start..pos]).unwrap_or_default();
        *field = text
            .parse()
            .map_err(|_| IoError::InvalidData(format!("bad PNM header field at byte {}", start)))?;
    }
    // exactly one whitespace byte separates the header from the raster
    pos += 1;

    let [width, height, maxval] = fields;
    if width == 0 || height == 0 || maxval == 0 || maxval > 65535 {
        return Err(IoError::InvalidData(format!(
            "invalid PNM header: {}x{} maxval {}",
            width, height, maxval
        )));
    }

    Ok(PnmHeader {
        magic,
        width: width as usize,
        height: height as usize,
        maxval,
        data_start: pos.min(data.len()),
    })
}

/// Write a 2-D buffer as binary PNM to a writer.
///
/// Chooses P5 (1 component) or P6 (3 components); samples must be
/// integral in 0..=65535 and maxval is 255 or 65535 accordingly.
pub fn write_pnm<W: Write>(buffer: &PixelBuffer, mut writer: W) -> IoResult<()> {
    let shape = buffer.shape();
    let [width, height] = shape.extents() else {
        return Err(IoError::UnsupportedFormat(format!(
            "PNM holds 2-D images only, got shape {}",
            shape
        )));
    };
    let magic = match buffer.components() {
        1 => "P5",
        3 => "P6",
        n => {
            return Err(IoError::UnsupportedFormat(format!(
                "PNM cannot hold {} components per pixel",
                n
            )));
        }
    };

    let maxval = integral_max(buffer).ok_or_else(|| {
        IoError::EncodeError("PNM needs integral samples in 0..=65535".to_string())
    })?;
    let wide = maxval > 255.0;

    write!(
        writer,
        "{}\n{} {}\n{}\n",
        magic,
        width,
        height,
        if wide { 65535 } else { 255 }
    )?;
    let raster: Vec<u8> = if wide {
        buffer
            .data()
            .iter()
            .flat_map(|&v| (v as u16).to_be_bytes())
            .collect()
    } else {
        buffer.data().iter().map(|&v| v as u8).collect()
    };
    writer.write_all(&raster)?;
    Ok(())
}
