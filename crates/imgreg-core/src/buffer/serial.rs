//! Native serialization for PixelBuffer
//!
//! Mixed text header + binary data format, the only on-disk format that
//! keeps all of a buffer's axes and its exact `f64` samples.
//!
//! ```text
//! \nImgBuf Version 1\n
//! ndim = N, components = C, nbytes = B\n
//! shape = E0 E1 ... E(N-1)\n
//! <raw f64 data, little-endian, B bytes>
//! \n
//! ```

use crate::buffer::{PixelBuffer, Shape};
use crate::error::{Error, Result};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Leading bytes of every native buffer file
pub const NATIVE_MAGIC: &[u8] = b"\nImgBuf Version ";

/// Format version
const IMGBUF_VERSION: i32 = 1;

/// Maximum sample count of a decoded buffer (2^28)
pub const MAX_SAMPLES: u64 = 1 << 28;

/// Maximum input size in bytes.
const MAX_INPUT_SIZE: u64 = 500_000_000;

/// Number of non-empty text lines in the header
const HEADER_LINES: usize = 3;

impl PixelBuffer {
    /// Read a buffer from a reader.
    pub fn read_from_reader(reader: &mut impl Read) -> Result<Self> {
        let mut buf = Vec::new();
        reader.take(MAX_INPUT_SIZE + 1).read_to_end(&mut buf)?;
        if buf.len() as u64 > MAX_INPUT_SIZE {
            return Err(Error::DecodeError(format!(
                "input too large: exceeds maximum allowed size of {MAX_INPUT_SIZE} bytes"
            )));
        }
        Self::read_from_bytes(&buf)
    }

    /// Read a buffer from a file.
    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::read_from_reader(&mut BufReader::new(file))
    }

    /// Read a buffer from a byte slice.
    pub fn read_from_bytes(data: &[u8]) -> Result<Self> {
        let header = parse_header(data)?;

        let samples =
            (header.shape.num_coordinates() as u64).saturating_mul(header.components as u64);
        if samples > MAX_SAMPLES {
            return Err(Error::DecodeError(format!(
                "buffer too large: {samples} samples exceeds maximum {MAX_SAMPLES}"
            )));
        }
        let expected_nbytes = samples * 8;
        if header.nbytes != expected_nbytes {
            return Err(Error::DecodeError(format!(
                "nbytes mismatch: header says {} but samples*8 = {expected_nbytes}",
                header.nbytes
            )));
        }

        let binary_end = header.end + header.nbytes as usize;
        if data.len() < binary_end {
            return Err(Error::DecodeError(format!(
                "data truncated: need {binary_end} bytes but only have {}",
                data.len()
            )));
        }

        let samples: Vec<f64> = data[header.end..binary_end]
            .chunks_exact(8)
            .map(|chunk| {
                f64::from_le_bytes([
                    chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
                ])
            })
            .collect();

        PixelBuffer::from_data(header.shape, header.components, samples)
    }

    /// Write a buffer to a writer.
    pub fn write_to_writer(&self, writer: &mut impl Write) -> Result<()> {
        let nbytes = self.data.len() as u64 * 8;
        writeln!(writer, "\nImgBuf Version {IMGBUF_VERSION}")?;
        writeln!(
            writer,
            "ndim = {}, components = {}, nbytes = {nbytes}",
            self.shape.ndim(),
            self.components
        )?;
        let extents: Vec<String> = self.shape.extents().iter().map(|e| e.to_string()).collect();
        writeln!(writer, "shape = {}", extents.join(" "))?;

        for &val in &self.data {
            writer.write_all(&val.to_le_bytes())?;
        }

        writeln!(writer)?;
        Ok(())
    }

    /// Write a buffer to a file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        self.write_to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write a buffer to a byte vector.
    pub fn write_to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_to_writer(&mut buf)?;
        Ok(buf)
    }
}

// ============================================================================
// Internal helpers
// ============================================================================

struct Header {
    shape: Shape,
    components: usize,
    nbytes: u64,
    /// Offset of the first binary byte
    end: usize,
}

fn parse_header(data: &[u8]) -> Result<Header> {
    let end = find_header_end(data)?;
    let text = std::str::from_utf8(&data[..end])
        .map_err(|e| Error::DecodeError(format!("header is not valid UTF-8: {e}")))?;
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    let version: i32 = lines[0]
        .strip_prefix("ImgBuf Version ")
        .ok_or_else(|| Error::DecodeError("version line not found".into()))?
        .trim()
        .parse()
        .map_err(|e| Error::DecodeError(format!("failed to parse version: {e}")))?;
    if version != IMGBUF_VERSION {
        return Err(Error::DecodeError(format!("invalid version: {version}")));
    }

    let parts: Vec<&str> = lines[1].split(',').collect();
    if parts.len() != 3 {
        return Err(Error::DecodeError(format!(
            "invalid layout line: '{}'",
            lines[1]
        )));
    }
    let ndim = parse_key_value(parts[0], "ndim")? as usize;
    let components = parse_key_value(parts[1], "components")? as usize;
    let nbytes = parse_key_value(parts[2], "nbytes")?;

    let extents = lines[2]
        .strip_prefix("shape =")
        .ok_or_else(|| Error::DecodeError("shape line not found".into()))?
        .split_whitespace()
        .map(|e| {
            e.parse::<usize>()
                .map_err(|err| Error::DecodeError(format!("invalid extent '{e}': {err}")))
        })
        .collect::<Result<Vec<usize>>>()?;
    if extents.len() != ndim {
        return Err(Error::DecodeError(format!(
            "shape has {} extents but ndim = {ndim}",
            extents.len()
        )));
    }
    if components == 0 {
        return Err(Error::DecodeError("components must be positive".into()));
    }

    let shape = Shape::new(&extents).map_err(|e| Error::DecodeError(e.to_string()))?;
    Ok(Header {
        shape,
        components,
        nbytes,
        end,
    })
}

/// Find the byte offset where binary data begins.
///
/// Skips leading empty lines and returns the offset right after the
/// newline of the third non-empty line.
fn find_header_end(data: &[u8]) -> Result<usize> {
    let scan_limit = data.len().min(512);
    let mut found = 0;
    let mut pos = 0;

    while pos < scan_limit {
        let Some(offset) = data[pos..scan_limit].iter().position(|&b| b == b'\n') else {
            break;
        };
        let line_end = pos + offset;
        if data[pos..line_end]
            .iter()
            .any(|&b| b != b' ' && b != b'\r')
        {
            found += 1;
            if found == HEADER_LINES {
                return Ok(line_end + 1);
            }
        }
        pos = line_end + 1;
    }
    Err(Error::DecodeError(format!(
        "could not find end of text header (expected {HEADER_LINES} header lines)"
    )))
}

/// Parse "key = value"
fn parse_key_value(part: &str, key: &str) -> Result<u64> {
    let (k, v) = part
        .split_once('=')
        .ok_or_else(|| Error::DecodeError(format!("expected '{key} = ...', got '{part}'")))?;
    if k.trim() != key {
        return Err(Error::DecodeError(format!(
            "expected key '{key}', got '{}'",
            k.trim()
        )));
    }
    v.trim()
        .parse()
        .map_err(|e| Error::DecodeError(format!("failed to parse {key}: {e}")))
}
