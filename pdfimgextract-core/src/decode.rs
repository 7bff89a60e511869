//! Image XObject decoding
//!
//! JPEG and JPEG 2000 payloads are handed back untouched, everything else is
//! run through the generic filters, interpreted with the image's colour space
//! and re-encoded as PNG.

use crate::error::{ExtractError, Result};
use crate::filters::{self, resolve, Filter};
use crate::task::ImageRef;
use image::{ImageBuffer, Luma, Rgb};
use lopdf::{Dictionary, Document, Object, Stream};
use std::io::Cursor;
use tracing::warn;

/// Native format of an extracted image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// DCT encoded stream, written as-is
    Jpeg,
    /// JPX encoded stream, written as-is
    Jpeg2000,
    /// Raw samples re-encoded as PNG
    Png,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Jpeg2000 => "jpx",
            ImageFormat::Png => "png",
        }
    }
}

/// Bytes ready to be written to disk
#[derive(Debug)]
pub struct DecodedImage {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Colour spaces that can be turned into gray or RGB pixels
#[derive(Debug, Clone, PartialEq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    Indexed {
        base: Box<ColorSpace>,
        hival: usize,
        lookup: Vec<u8>,
    },
}

impl ColorSpace {
    fn components(&self) -> usize {
        match self {
            ColorSpace::Gray | ColorSpace::Indexed { .. } => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
        }
    }
}

/// Decode one image XObject of `doc`
pub fn decode_image(doc: &Document, image: ImageRef) -> Result<DecodedImage> {
    let stream = match doc.get_object(image.object_id())? {
        Object::Stream(stream) if is_image(stream) => stream,
        _ => return Err(ExtractError::NotAnImage(image.number, image.generation)),
    };

    let width = dimension(doc, &stream.dict, b"Width")?;
    let height = dimension(doc, &stream.dict, b"Height")?;
    let steps = filters::filter_chain(doc, &stream.dict)?;

    let (format, data) = match steps.split_last() {
        Some((last, rest)) if last.filter == Filter::DCTDecode => {
            (ImageFormat::Jpeg, filters::decode_chain(&stream.content, rest)?)
        }
        Some((last, rest)) if last.filter == Filter::JPXDecode => (
            ImageFormat::Jpeg2000,
            filters::decode_chain(&stream.content, rest)?,
        ),
        _ => {
            let samples = filters::decode_chain(&stream.content, &steps)?;
            (ImageFormat::Png, encode_png(doc, &stream.dict, width, height, samples)?)
        }
    };

    Ok(DecodedImage {
        format,
        width,
        height,
        data,
    })
}

fn is_image(stream: &Stream) -> bool {
    matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(name)) if name.as_slice() == b"Image")
}

fn dimension(doc: &Document, dict: &Dictionary, key: &[u8]) -> Result<u32> {
    let value = match dict.get(key).ok().map(|v| resolve(doc, v)).transpose()? {
        Some(Object::Integer(value)) => *value,
        _ => {
            return Err(ExtractError::Decode(format!(
                "Missing or invalid /{}",
                String::from_utf8_lossy(key)
            )))
        }
    };
    u32::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| ExtractError::Decode(format!("Invalid image dimension: {value}")))
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn parse_color_space(doc: &Document, obj: &Object) -> Result<ColorSpace> {
    match resolve(doc, obj)? {
        Object::Name(name) => device_space(name),
        Object::Array(array) => {
            let family = match array.first().map(|f| resolve(doc, f)).transpose()? {
                Some(Object::Name(name)) => name.as_slice(),
                _ => return Err(ExtractError::Decode("Invalid ColorSpace array".to_string())),
            };
            match family {
                b"ICCBased" => {
                    let profile = match array.get(1).map(|p| resolve(doc, p)).transpose()? {
                        Some(Object::Stream(profile)) => profile,
                        _ => return Err(ExtractError::Decode("Invalid ICCBased profile".to_string())),
                    };
                    match profile.dict.get(b"N").ok().and_then(|n| n.as_i64().ok()) {
                        Some(1) => Ok(ColorSpace::Gray),
                        Some(3) => Ok(ColorSpace::Rgb),
                        Some(4) => Ok(ColorSpace::Cmyk),
                        _ => match profile.dict.get(b"Alternate") {
                            Ok(alternate) => parse_color_space(doc, alternate),
                            Err(_) => Err(ExtractError::Unsupported(
                                "ICCBased profile without /N".to_string(),
                            )),
                        },
                    }
                }
                b"Indexed" | b"I" => parse_indexed(doc, array),
                b"CalGray" | b"CalRGB" | b"CalCMYK" | b"DeviceGray" | b"DeviceRGB"
                | b"DeviceCMYK" => device_space(family),
                other => Err(ExtractError::Unsupported(format!(
                    "color space {}",
                    String::from_utf8_lossy(other)
                ))),
            }
        }
        _ => Err(ExtractError::Decode("Invalid ColorSpace".to_string())),
    }
}

fn device_space(name: &[u8]) -> Result<ColorSpace> {
    match name {
        b"DeviceGray" | b"G" | b"CalGray" => Ok(ColorSpace::Gray),
        b"DeviceRGB" | b"RGB" | b"CalRGB" => Ok(ColorSpace::Rgb),
        b"DeviceCMYK" | b"CMYK" | b"CalCMYK" => Ok(ColorSpace::Cmyk),
        other => Err(ExtractError::Unsupported(format!(
            "color space {}",
            String::from_utf8_lossy(other)
        ))),
    }
}

fn parse_indexed(doc: &Document, array: &[Object]) -> Result<ColorSpace> {
    let (base, hival, lookup) = match array {
        [_, base, hival, lookup] => (base, hival, lookup),
        _ => return Err(ExtractError::Decode("Invalid Indexed color space".to_string())),
    };

    let base = parse_color_space(doc, base)?;
    if matches!(base, ColorSpace::Indexed { .. }) {
        return Err(ExtractError::Decode("Nested Indexed color space".to_string()));
    }

    let hival = match resolve(doc, hival)? {
        Object::Integer(h) if (0..=255).contains(h) => *h as usize,
        _ => return Err(ExtractError::Decode("Invalid Indexed hival".to_string())),
    };

    let lookup = match resolve(doc, lookup)? {
        Object::String(bytes, _) => bytes.clone(),
        Object::Stream(stream) => {
            let steps = filters::filter_chain(doc, &stream.dict)?;
            filters::decode_chain(&stream.content, &steps)?
        }
        _ => return Err(ExtractError::Decode("Invalid Indexed lookup".to_string())),
    };

    Ok(ColorSpace::Indexed {
        base: Box::new(base),
        hival,
        lookup,
    })
}

/// Split a packed row into `count` samples of `bits` each
fn unpack_row(row: &[u8], count: usize, bits: u8) -> Vec<u16> {
    match bits {
        8 => row.iter().take(count).map(|&b| b as u16).collect(),
        16 => row
            .chunks_exact(2)
            .take(count)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect(),
        _ => {
            let mask = (1u16 << bits) - 1;
            let per_byte = 8 / bits as usize;
            (0..count)
                .map(|i| {
                    let byte = row.get(i / per_byte).copied().unwrap_or(0) as u16;
                    let shift = 8 - bits as usize * (i % per_byte + 1);
                    (byte >> shift) & mask
                })
                .collect()
        }
    }
}

fn encode_png(
    doc: &Document,
    dict: &Dictionary,
    width: u32,
    height: u32,
    mut samples: Vec<u8>,
) -> Result<Vec<u8>> {
    let image_mask = matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true)));

    let color_space = if image_mask {
        ColorSpace::Gray
    } else {
        match dict.get(b"ColorSpace") {
            Ok(cs) => parse_color_space(doc, cs)?,
            Err(_) => return Err(ExtractError::Unsupported("image without /ColorSpace".to_string())),
        }
    };

    let bits = if image_mask {
        1
    } else {
        match dict.get(b"BitsPerComponent").ok().and_then(|b| resolve(doc, b).ok()) {
            Some(Object::Integer(b @ (1 | 2 | 4 | 8 | 16))) => *b as u8,
            Some(other) => {
                return Err(ExtractError::Unsupported(format!(
                    "BitsPerComponent {other:?}"
                )))
            }
            None => 8,
        }
    };

    let components = color_space.components();
    let samples_per_row = (width as usize)
        .checked_mul(components)
        .ok_or_else(|| ExtractError::Decode("Image too large".to_string()))?;
    let row_bytes = (samples_per_row * bits as usize).div_ceil(8);
    let expected = row_bytes
        .checked_mul(height as usize)
        .ok_or_else(|| ExtractError::Decode("Image too large".to_string()))?;

    if samples.len() < expected {
        warn!(
            "image data is {} bytes, expected {}; padding with zeros",
            samples.len(),
            expected
        );
        samples.resize(expected, 0);
    }

    let max_value = ((1u32 << bits) - 1) as f32;
    let decode = decode_ranges(doc, dict, components, &color_space, image_mask);

    let mut gray = Vec::new();
    let mut rgb = Vec::new();

    for row in samples.chunks(row_bytes).take(height as usize) {
        let values = unpack_row(row, samples_per_row, bits);
        for pixel in values.chunks(components) {
            match &color_space {
                ColorSpace::Indexed { base, hival, lookup } => {
                    let index = (pixel[0] as usize).min(*hival);
                    let n = base.components();
                    let mut entry = [0u8; 4];
                    for (c, slot) in entry.iter_mut().enumerate().take(n) {
                        *slot = lookup.get(index * n + c).copied().unwrap_or(0);
                    }
                    push_pixel(base, &entry[..n], &mut gray, &mut rgb);
                }
                space => {
                    let mut scaled = [0u8; 4];
                    for (c, &value) in pixel.iter().enumerate() {
                        let (dmin, dmax) = decode[c];
                        let v = dmin + (value as f32) * (dmax - dmin) / max_value;
                        scaled[c] = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
                    }
                    push_pixel(space, &scaled[..components], &mut gray, &mut rgb);
                }
            }
        }
    }

    let mut out = Cursor::new(Vec::new());
    if !gray.is_empty() {
        let buffer = ImageBuffer::<Luma<u8>, _>::from_raw(width, height, gray)
            .ok_or_else(|| ExtractError::Decode("Gray buffer size mismatch".to_string()))?;
        buffer.write_to(&mut out, image::ImageFormat::Png)?;
    } else {
        let buffer = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, rgb)
            .ok_or_else(|| ExtractError::Decode("RGB buffer size mismatch".to_string()))?;
        buffer.write_to(&mut out, image::ImageFormat::Png)?;
    }
    Ok(out.into_inner())
}

/// `/Decode` ranges per component, `[0 1]` when absent or malformed
fn decode_ranges(
    doc: &Document,
    dict: &Dictionary,
    components: usize,
    color_space: &ColorSpace,
    image_mask: bool,
) -> Vec<(f32, f32)> {
    let identity = vec![(0.0, 1.0); components];
    if matches!(color_space, ColorSpace::Indexed { .. }) {
        return identity;
    }

    let values: Vec<f32> = match dict.get(b"Decode").ok().and_then(|d| resolve(doc, d).ok()) {
        Some(Object::Array(array)) => array.iter().filter_map(number).collect(),
        _ => Vec::new(),
    };

    if values.len() != components * 2 {
        // stencil masks paint where the sample is 0
        return if image_mask {
            vec![(0.0, 1.0)]
        } else {
            identity
        };
    }

    values.chunks(2).map(|pair| (pair[0], pair[1])).collect()
}

fn push_pixel(space: &ColorSpace, values: &[u8], gray: &mut Vec<u8>, rgb: &mut Vec<u8>) {
    match space {
        ColorSpace::Gray => gray.push(values[0]),
        ColorSpace::Rgb => rgb.extend_from_slice(&values[..3]),
        ColorSpace::Cmyk => {
            let k = 255 - values[3] as u16;
            for &c in &values[..3] {
                rgb.push(((255 - c as u16) * k / 255) as u8);
            }
        }
        ColorSpace::Indexed { .. } => gray.push(values[0]),
    }
}
