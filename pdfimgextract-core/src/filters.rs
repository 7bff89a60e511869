//! PDF stream filters for image data
//!
//! Handles the decoding side of ISO 32000-1 Section 7.4 for image XObjects:
//! the generic filters are undone here, while the image codecs (DCT, JPX)
//! are left to the caller, which writes those payloads out unchanged.

use crate::error::{ExtractError, Result};
use flate2::read::ZlibDecoder;
use lopdf::{Dictionary, Document, Object};
use std::io::Read;

/// Supported PDF filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// ASCII hex decode
    ASCIIHexDecode,

    /// ASCII 85 decode
    ASCII85Decode,

    /// LZW decode
    LZWDecode,

    /// Flate decode (zlib/deflate compression)
    FlateDecode,

    /// Run length decode
    RunLengthDecode,

    /// CCITT fax decode
    CCITTFaxDecode,

    /// JBIG2 decode
    JBIG2Decode,

    /// DCT decode (JPEG)
    DCTDecode,

    /// JPX decode (JPEG 2000)
    JPXDecode,

    /// Crypt filter
    Crypt,
}

impl Filter {
    /// Parse filter from name, accepting the abbreviations allowed in inline images
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"ASCIIHexDecode" | b"AHx" => Some(Filter::ASCIIHexDecode),
            b"ASCII85Decode" | b"A85" => Some(Filter::ASCII85Decode),
            b"LZWDecode" | b"LZW" => Some(Filter::LZWDecode),
            b"FlateDecode" | b"Fl" => Some(Filter::FlateDecode),
            b"RunLengthDecode" | b"RL" => Some(Filter::RunLengthDecode),
            b"CCITTFaxDecode" | b"CCF" => Some(Filter::CCITTFaxDecode),
            b"JBIG2Decode" => Some(Filter::JBIG2Decode),
            b"DCTDecode" | b"DCT" => Some(Filter::DCTDecode),
            b"JPXDecode" => Some(Filter::JPXDecode),
            b"Crypt" => Some(Filter::Crypt),
            _ => None,
        }
    }
}

/// A filter together with its `/DecodeParms` entry
#[derive(Debug, Clone)]
pub struct FilterStep {
    pub filter: Filter,
    pub params: Option<Dictionary>,
}

impl FilterStep {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            params: None,
        }
    }

    fn param(&self, key: &[u8], default: i64) -> i64 {
        self.params
            .as_ref()
            .and_then(|params| params.get(key).ok())
            .and_then(|value| value.as_i64().ok())
            .unwrap_or(default)
    }
}

/// Follow a single level of indirection
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Result<&'a Object> {
    match obj {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

/// Read the `/Filter` and `/DecodeParms` entries of a stream dictionary
pub fn filter_chain(doc: &Document, dict: &Dictionary) -> Result<Vec<FilterStep>> {
    let names: Vec<&[u8]> = match dict.get(b"Filter").ok().map(|f| resolve(doc, f)) {
        None => return Ok(Vec::new()),
        Some(filter) => match filter? {
            Object::Name(name) => vec![name.as_slice()],
            Object::Array(array) => {
                let mut filter_names = Vec::with_capacity(array.len());
                for obj in array {
                    match resolve(doc, obj)? {
                        Object::Name(name) => filter_names.push(name.as_slice()),
                        _ => return Err(ExtractError::Decode("Invalid filter in array".to_string())),
                    }
                }
                filter_names
            }
            Object::Null => return Ok(Vec::new()),
            _ => return Err(ExtractError::Decode("Invalid Filter type".to_string())),
        },
    };

    let params: Vec<Option<Dictionary>> = match dict.get(b"DecodeParms").ok() {
        None => Vec::new(),
        Some(obj) => match resolve(doc, obj)? {
            Object::Dictionary(params) => vec![Some(params.clone())],
            Object::Array(array) => array
                .iter()
                .map(|entry| match resolve(doc, entry) {
                    Ok(Object::Dictionary(params)) => Some(params.clone()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        },
    };

    names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let filter = Filter::from_name(name).ok_or_else(|| {
                ExtractError::Unsupported(format!(
                    "unknown filter {}",
                    String::from_utf8_lossy(name)
                ))
            })?;
            Ok(FilterStep {
                filter,
                params: params.get(idx).cloned().flatten(),
            })
        })
        .collect()
}

/// Apply filters in order
pub fn decode_chain(data: &[u8], steps: &[FilterStep]) -> Result<Vec<u8>> {
    let mut result = data.to_vec();
    for step in steps {
        result = apply_filter(&result, step)?;
    }
    Ok(result)
}

/// Apply a single filter to data
pub fn apply_filter(data: &[u8], step: &FilterStep) -> Result<Vec<u8>> {
    match step.filter {
        Filter::FlateDecode => {
            let inflated = decode_flate(data)?;
            apply_predictor(inflated, step)
        }
        Filter::ASCIIHexDecode => decode_ascii_hex(data),
        Filter::ASCII85Decode => decode_ascii85(data),
        Filter::RunLengthDecode => decode_run_length(data),
        other => Err(ExtractError::Unsupported(format!("filter {other:?}"))),
    }
}

/// Decode FlateDecode (zlib/deflate) compressed data
fn decode_flate(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut result = Vec::new();
    decoder
        .read_to_end(&mut result)
        .map_err(|e| ExtractError::Decode(format!("Flate decode error: {e}")))?;
    Ok(result)
}

/// Undo the `/Predictor` transformation of a Flate stream
fn apply_predictor(data: Vec<u8>, step: &FilterStep) -> Result<Vec<u8>> {
    let predictor = step.param(b"Predictor", 1);
    if predictor < 2 {
        return Ok(data);
    }

    let colors = step.param(b"Colors", 1).max(1) as usize;
    let bits = step.param(b"BitsPerComponent", 8).max(1) as usize;
    let columns = step.param(b"Columns", 1).max(1) as usize;
    let bytes_per_pixel = (colors * bits).div_ceil(8).max(1);
    let row_len = (colors * bits * columns).div_ceil(8);

    if predictor == 2 {
        return undo_tiff_predictor(data, bits, bytes_per_pixel, row_len);
    }
    undo_png_predictor(&data, bytes_per_pixel, row_len)
}

fn undo_tiff_predictor(
    mut data: Vec<u8>,
    bits: usize,
    bytes_per_pixel: usize,
    row_len: usize,
) -> Result<Vec<u8>> {
    if bits != 8 {
        return Err(ExtractError::Unsupported(format!(
            "TIFF predictor with {bits} bits per component"
        )));
    }
    for row in data.chunks_mut(row_len) {
        for i in bytes_per_pixel..row.len() {
            row[i] = row[i].wrapping_add(row[i - bytes_per_pixel]);
        }
    }
    Ok(data)
}

fn undo_png_predictor(data: &[u8], bytes_per_pixel: usize, row_len: usize) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len());
    let mut previous = vec![0u8; row_len];

    for encoded in data.chunks(row_len + 1) {
        let (&kind, raw) = match encoded.split_first() {
            Some(split) => split,
            None => break,
        };
        let mut row = raw.to_vec();
        row.resize(row_len, 0);

        for i in 0..row_len {
            let left = if i >= bytes_per_pixel { row[i - bytes_per_pixel] } else { 0 };
            let up = previous[i];
            let up_left = if i >= bytes_per_pixel { previous[i - bytes_per_pixel] } else { 0 };

            row[i] = match kind {
                0 => row[i],
                1 => row[i].wrapping_add(left),
                2 => row[i].wrapping_add(up),
                3 => row[i].wrapping_add(((left as u16 + up as u16) / 2) as u8),
                4 => row[i].wrapping_add(paeth(left, up, up_left)),
                other => {
                    return Err(ExtractError::Decode(format!(
                        "Invalid PNG predictor tag: {other}"
                    )))
                }
            };
        }

        result.extend_from_slice(&row);
        previous = row;
    }

    Ok(result)
}

fn paeth(left: u8, up: u8, up_left: u8) -> u8 {
    let p = left as i16 + up as i16 - up_left as i16;
    let pa = (p - left as i16).abs();
    let pb = (p - up as i16).abs();
    let pc = (p - up_left as i16).abs();
    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        up
    } else {
        up_left
    }
}

/// Decode ASCIIHexDecode data
fn decode_ascii_hex(data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::new();
    let mut chars = data.iter().filter(|&&b| !b.is_ascii_whitespace());

    loop {
        let high = match chars.next() {
            Some(&b'>') | None => break,
            Some(&ch) => ch,
        };

        // Odd number of digits, pad with 0
        let low = match chars.next() {
            Some(&ch) => ch,
            None => b'0',
        };

        let high_val = hex_digit_value(high).ok_or_else(|| {
            ExtractError::Decode(format!("Invalid hex digit: {}", high as char))
        })?;

        if low == b'>' {
            result.push(high_val << 4);
            break;
        }

        let low_val = hex_digit_value(low)
            .ok_or_else(|| ExtractError::Decode(format!("Invalid hex digit: {}", low as char)))?;

        result.push((high_val << 4) | low_val);
    }

    Ok(result)
}

fn hex_digit_value(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        _ => None,
    }
}

/// Decode ASCII85Decode data
fn decode_ascii85(data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::new();
    let mut group: Vec<u8> = Vec::with_capacity(5);
    let mut body = data;

    if let Some(rest) = body.strip_prefix(b"<~") {
        body = rest;
    }

    let mut chars = body.iter().copied().filter(|b| !b.is_ascii_whitespace());
    while let Some(c) = chars.next() {
        match c {
            b'~' => {
                if chars.next() == Some(b'>') {
                    break;
                }
                return Err(ExtractError::Decode("Invalid ASCII85 end marker".to_string()));
            }
            b'z' if group.is_empty() => result.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group.push(c);
                if group.len() == 5 {
                    result.extend_from_slice(&ascii85_group_value(&group).to_be_bytes());
                    group.clear();
                }
            }
            _ => {
                return Err(ExtractError::Decode(format!(
                    "Invalid ASCII85 character: {}",
                    c as char
                )))
            }
        }
    }

    if !group.is_empty() {
        let original_len = group.len();
        group.resize(5, b'u');
        let value = ascii85_group_value(&group).to_be_bytes();
        result.extend_from_slice(&value[..original_len - 1]);
    }

    Ok(result)
}

fn ascii85_group_value(group: &[u8]) -> u32 {
    group
        .iter()
        .fold(0u32, |acc, &ch| acc.wrapping_mul(85).wrapping_add((ch - b'!') as u32))
}

/// Decode RunLengthDecode data
fn decode_run_length(data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let length = data[pos] as usize;
        pos += 1;
        match length {
            128 => break,
            0..=127 => {
                let end = pos + length + 1;
                let literal = data.get(pos..end).ok_or_else(|| {
                    ExtractError::Decode("Truncated run length literal".to_string())
                })?;
                result.extend_from_slice(literal);
                pos = end;
            }
            _ => {
                let byte = *data
                    .get(pos)
                    .ok_or_else(|| ExtractError::Decode("Truncated run length repeat".to_string()))?;
                result.extend(std::iter::repeat(byte).take(257 - length));
                pos += 1;
            }
        }
    }

    Ok(result)
}
