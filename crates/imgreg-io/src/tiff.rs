//! TIFF image format support
//!
//! Single-page TIFFs decode to 2-D buffers. Multi-page TIFFs whose pages
//! agree on size and sample layout decode to a 3-D stack with the page
//! index as axis 2, which is how volumetric test output is usually stored.
//! Samples keep their stored numeric value, including floating point.
//! Palette pages are expanded to 3-component RGB through their color map.

use crate::{IoError, IoResult, checked_sample_count};
use imgreg_core::{PixelBuffer, Shape};
use std::io::{Read, Seek, SeekFrom, Write};
use tiff::{ColorType, TiffError};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::TiffEncoder;
use tiff::encoder::colortype::{Gray32Float, RGB8, RGBA8};
use tiff::tags::Tag;

/// PhotometricInterpretation value for inverted grayscale
const WHITE_IS_ZERO: u32 = 0;

/// PhotometricInterpretation value for palette color
const RGB_PALETTE: u32 = 3;

/// One decoded page
struct Page {
    width: usize,
    height: usize,
    components: usize,
    samples: Vec<f64>,
}

/// Read a TIFF image, stacking multiple pages along axis 2
pub fn read_tiff<R: Read + Seek>(reader: R) -> IoResult<PixelBuffer> {
    let mut pages = read_pages(reader)?;

    if pages.len() == 1 {
        let page = pages.remove(0);
        let shape = Shape::new_2d(page.width, page.height)?;
        return Ok(PixelBuffer::from_data(shape, page.components, page.samples)?);
    }

    let first = &pages[0];
    let (width, height, components) = (first.width, first.height, first.components);
    if let Some(idx) = pages
        .iter()
        .position(|p| (p.width, p.height, p.components) != (width, height, components))
    {
        return Err(IoError::InvalidData(format!(
            "TIFF page {} is {}x{}x{}, page 0 is {}x{}x{}",
            idx, pages[idx].width, pages[idx].height, pages[idx].components, width, height, components
        )));
    }

    let shape = Shape::new(&[width, height, pages.len()])?;
    let samples = pages.into_iter().flat_map(|p| p.samples).collect();
    Ok(PixelBuffer::from_data(shape, components, samples)?)
}

/// Get the number of pages in a TIFF file
pub fn tiff_page_count<R: Read + Seek>(reader: R) -> IoResult<usize> {
    let mut decoder = Decoder::new(reader)
        .map_err(|e| IoError::DecodeError(format!("TIFF decode error: {}", e)))?;

    let mut count = 1;
    while decoder.more_images() {
        decoder
            .next_image()
            .map_err(|e| IoError::DecodeError(format!("TIFF page navigation error: {}", e)))?;
        count += 1;
    }

    Ok(count)
}

fn read_pages<R: Read + Seek>(reader: R) -> IoResult<Vec<Page>> {
    let mut decoder = Decoder::new(reader)
        .map_err(|e| IoError::DecodeError(format!("TIFF decode error: {}", e)))?;

    let mut pages = Vec::new();
    loop {
        pages.push(decode_page(&mut decoder)?);

        if !decoder.more_images() {
            break;
        }
        decoder
            .next_image()
            .map_err(|e| IoError::DecodeError(format!("TIFF page navigation error: {}", e)))?;
    }
    Ok(pages)
}

/// Decode the page at the current decoder position
fn decode_page<R: Read + Seek>(decoder: &mut Decoder<R>) -> IoResult<Page> {
    let (width, height) = decoder
        .dimensions()
        .map_err(|e| IoError::DecodeError(format!("Failed to get TIFF dimensions: {}", e)))?;
    let (width, height) = (width as usize, height as usize);

    let photometric = decoder.get_tag_u32(Tag::PhotometricInterpretation).ok();
    if photometric == Some(RGB_PALETTE) {
        return decode_palette_page(decoder, width, height);
    }
    let white_is_zero = photometric == Some(WHITE_IS_ZERO);

    let color_type = decoder
        .colortype()
        .map_err(|e| IoError::DecodeError(format!("Failed to get TIFF color type: {}", e)))?;

    let (components, bits) = match color_type {
        ColorType::Gray(bits) => (1, bits),
        ColorType::GrayA(bits) => (2, bits),
        ColorType::RGB(bits) => (3, bits),
        ColorType::RGBA(bits) => (4, bits),
        _ => {
            return Err(IoError::UnsupportedFormat(format!(
                "unsupported TIFF color type: {:?}",
                color_type
            )));
        }
    };

    let image_data = decoder
        .read_image()
        .map_err(|e| IoError::DecodeError(format!("Failed to read TIFF image data: {}", e)))?;

    let mut samples = match image_data {
        DecodingResult::U8(data) if bits < 8 => {
            if components != 1 {
                return Err(IoError::UnsupportedFormat(format!(
                    "unsupported packed TIFF color type: {:?}",
                    color_type
                )));
            }
            unpack_bits(&data, width, height, bits)
        }
        DecodingResult::U8(data) => widen(&data),
        DecodingResult::U16(data) => widen(&data),
        DecodingResult::U32(data) => widen(&data),
        DecodingResult::U64(data) => data.iter().map(|&v| v as f64).collect(),
        DecodingResult::F32(data) => widen(&data),
        DecodingResult::F64(data) => data,
        DecodingResult::I8(data) => widen(&data),
        DecodingResult::I16(data) => widen(&data),
        DecodingResult::I32(data) => widen(&data),
        DecodingResult::I64(data) => data.iter().map(|&v| v as f64).collect(),
        DecodingResult::F16(data) => widen_f16(&data),
    };

    let expected = checked_sample_count(&[width, height, components])?;
    if samples.len() < expected {
        return Err(IoError::InvalidData(format!(
            "TIFF page has {} samples, expected {}",
            samples.len(),
            expected
        )));
    }
    samples.truncate(expected);

    // Bilevel and grayscale WhiteIsZero images store inverted intensities
    if white_is_zero && components == 1 && matches!(color_type, ColorType::Gray(_)) {
        let max = ((1u64 << bits.min(32)) - 1) as f64;
        for v in &mut samples {
            *v = max - *v;
        }
    }

    Ok(Page {
        width,
        height,
        components,
        samples,
    })
}

/// Decode an uncompressed palette page into RGB
///
/// The tiff decoder does not read palette images, so the strips are read
/// straight from the stream and their indices looked up in the color map.
fn decode_palette_page<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    width: usize,
    height: usize,
) -> IoResult<Page> {
    let unsupported = |what: String| IoError::UnsupportedFormat(format!("palette TIFF {}", what));

    let compression = decoder.get_tag_u32(Tag::Compression).unwrap_or(1);
    if compression != 1 {
        return Err(unsupported(format!("with compression {}", compression)));
    }
    if decoder.get_tag_u32(Tag::TileWidth).is_ok() {
        return Err(unsupported("in tiles".to_string()));
    }
    let samples_per_pixel = decoder.get_tag_u32(Tag::SamplesPerPixel).unwrap_or(1);
    let bits = decoder.get_tag_u32(Tag::BitsPerSample).unwrap_or(1);
    if samples_per_pixel != 1 || !matches!(bits, 1 | 2 | 4 | 8) {
        return Err(unsupported(format!(
            "with {} samples of {} bits",
            samples_per_pixel, bits
        )));
    }
    let bits = bits as u8;

    let tag_error = |e: TiffError| IoError::InvalidData(format!("palette TIFF tags: {}", e));
    let map = decoder.get_tag_u16_vec(Tag::ColorMap).map_err(tag_error)?;
    let offsets = decoder.get_tag_u64_vec(Tag::StripOffsets).map_err(tag_error)?;
    let lengths = decoder.get_tag_u64_vec(Tag::StripByteCounts).map_err(tag_error)?;

    checked_sample_count(&[width, height, 3])?;
    // Strips hold whole rows, each padded to a byte boundary
    let row_bytes = (width * usize::from(bits)).div_ceil(8);
    let needed = row_bytes * height;
    let mut raster = Vec::with_capacity(needed);
    let stream = decoder.inner();
    for (&offset, &length) in offsets.iter().zip(&lengths) {
        if raster.len() >= needed {
            break;
        }
        let take = (needed - raster.len()).min(usize::try_from(length).unwrap_or(usize::MAX));
        let start = raster.len();
        raster.resize(start + take, 0);
        stream.seek(SeekFrom::Start(offset))?;
        stream.read_exact(&mut raster[start..])?;
    }
    if raster.len() < needed {
        return Err(IoError::InvalidData(format!(
            "palette TIFF raster truncated: need {} bytes, have {}",
            needed,
            raster.len()
        )));
    }

    let indices = if bits < 8 {
        unpack_bits(&raster, width, height, bits)
    } else {
        widen(&raster)
    };
    Ok(Page {
        width,
        height,
        components: 3,
        samples: expand_palette(&indices, &map, bits)?,
    })
}

/// Replace palette indices by RGB triples
///
/// The color map holds all reds, then all greens, then all blues, with
/// 16-bit entries; the high byte gives the 8-bit value.
fn expand_palette(indices: &[f64], map: &[u16], bits: u8) -> IoResult<Vec<f64>> {
    let entries = 1usize << bits.min(16);
    if map.len() != 3 * entries {
        return Err(IoError::InvalidData(format!(
            "TIFF color map has {} entries, expected {}",
            map.len(),
            3 * entries
        )));
    }
    let (reds, rest) = map.split_at(entries);
    let (greens, blues) = rest.split_at(entries);

    let mut rgb = Vec::with_capacity(indices.len() * 3);
    for &index in indices {
        let i = index as usize;
        if i >= entries {
            return Err(IoError::InvalidData(format!(
                "TIFF palette index {} out of range",
                i
            )));
        }
        for channel in [reds, greens, blues] {
            rgb.push((channel[i] >> 8) as f64);
        }
    }
    Ok(rgb)
}

fn widen<T: Copy + Into<f64>>(data: &[T]) -> Vec<f64> {
    data.iter().map(|&v| v.into()).collect()
}

fn widen_f16(data: &[half::f16]) -> Vec<f64> {
    data.iter().map(|v| v.to_f64()).collect()
}

/// Unpack 1, 2 or 4 bit samples; each row starts on a byte boundary
fn unpack_bits(data: &[u8], width: usize, height: usize, bits: u8) -> Vec<f64> {
    let bits = bits as usize;
    let per_byte = 8 / bits;
    let mask = (1u8 << bits) - 1;
    let bytes_per_row = width.div_ceil(per_byte);
    let mut samples = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let byte_idx = y * bytes_per_row + x / per_byte;
            let shift = 8 - bits * (x % per_byte + 1);
            let val = data.get(byte_idx).map_or(0, |b| (b >> shift) & mask);
            samples.push(val as f64);
        }
    }
    samples
}

/// Write a buffer as TIFF
///
/// Scalar buffers are written as 32-bit float gray pages, 3- and
/// 4-component buffers as 8-bit RGB/RGBA pages (samples must lie in
/// 0..=255). A 3-D buffer becomes one page per index of axis 2.
pub fn write_tiff<W: Write + Seek>(buffer: &PixelBuffer, writer: W) -> IoResult<()> {
    let shape = buffer.shape();
    let (width, height, pages) = match shape.extents() {
        [w, h] => (*w, *h, 1),
        [w, h, d] => (*w, *h, *d),
        _ => {
            return Err(IoError::UnsupportedFormat(format!(
                "TIFF holds 2-D images or 3-D stacks, got shape {}",
                shape
            )));
        }
    };
    let w = u32::try_from(width)
        .map_err(|_| IoError::EncodeError("width exceeds TIFF limits".to_string()))?;
    let h = u32::try_from(height)
        .map_err(|_| IoError::EncodeError("height exceeds TIFF limits".to_string()))?;

    let components = buffer.components();
    if components != 1
        && buffer
            .data()
            .iter()
            .any(|&v| v.fract() != 0.0 || !(0.0..=255.0).contains(&v))
    {
        return Err(IoError::EncodeError(
            "TIFF color pages need integral samples in 0..=255".to_string(),
        ));
    }

    let mut encoder = TiffEncoder::new(writer)
        .map_err(|e| IoError::EncodeError(format!("TIFF encoder error: {}", e)))?;

    let page_len = width * height * components;
    for page in buffer.data().chunks_exact(page_len).take(pages) {
        let result = match components {
            1 => {
                let data: Vec<f32> = page.iter().map(|&v| v as f32).collect();
                encoder.write_image::<Gray32Float>(w, h, &data)
            }
            3 => {
                let data: Vec<u8> = page.iter().map(|&v| v as u8).collect();
                encoder.write_image::<RGB8>(w, h, &data)
            }
            4 => {
                let data: Vec<u8> = page.iter().map(|&v| v as u8).collect();
                encoder.write_image::<RGBA8>(w, h, &data)
            }
            n => {
                return Err(IoError::UnsupportedFormat(format!(
                    "TIFF writer does not handle {} components per pixel",
                    n
                )));
            }
        };
        result.map_err(|e| IoError::EncodeError(format!("TIFF write error: {}", e)))?;
    }

    Ok(())
}
