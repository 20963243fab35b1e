//! Minimal JPEG marker walking
//!
//! Just enough structure awareness to read frame dimensions and locate the
//! entropy-coded scan. This is not a decoder; segment payloads other than
//! the frame header are skipped over by their declared lengths.

const MARKER_PREFIX: u8 = 0xFF;
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const TEM: u8 = 0x01;

/// Byte span of the entropy-coded region of a JPEG stream
///
/// `scan_start` is the first byte after the SOS header, `scan_end` the
/// offset of the closing EOI marker. The span may cover several scans of a
/// progressive stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanBounds {
    /// First byte of the entropy-coded data
    pub scan_start: usize,
    /// Offset of the EOI marker terminating the data
    pub scan_end: usize,
}

/// Reads the frame dimensions `(width, height)` from the first SOF header.
///
/// Returns `None` for truncated or non-JPEG buffers, which is the normal
/// case for early progressive chunks.
pub fn dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    let mut pos = start_of_segments(bytes)?;
    loop {
        let (marker, payload) = next_marker(bytes, pos)?;
        if is_sof(marker) {
            let height = read_u16(bytes, payload + 3)?;
            let width = read_u16(bytes, payload + 5)?;
            return Some((u32::from(width), u32::from(height)));
        }
        match marker {
            SOS | EOI => return None,
            _ => pos = skip_segment(bytes, marker, payload)?,
        }
    }
}

/// Locates the entropy-coded region of a JPEG stream.
///
/// The region runs from the end of the first SOS header to the last EOI
/// marker in the buffer. Searching for the EOI from the end keeps the
/// bounds stable when the region itself contains `FF D9` byte pairs, as a
/// scrambled scan may.
pub fn scan_bounds(bytes: &[u8]) -> Option<ScanBounds> {
    let mut pos = start_of_segments(bytes)?;
    let scan_start = loop {
        let (marker, payload) = next_marker(bytes, pos)?;
        if marker == SOS {
            let length = read_u16(bytes, payload)?;
            break payload.checked_add(usize::from(length))?;
        }
        if marker == EOI {
            return None;
        }
        pos = skip_segment(bytes, marker, payload)?;
    };
    if scan_start > bytes.len() {
        return None;
    }
    let scan_end = (scan_start..bytes.len().checked_sub(1)?)
        .rev()
        .find(|&i| bytes[i] == MARKER_PREFIX && bytes[i + 1] == EOI)?;
    Some(ScanBounds {
        scan_start,
        scan_end,
    })
}

fn start_of_segments(bytes: &[u8]) -> Option<usize> {
    if bytes.len() >= 2 && bytes[0] == MARKER_PREFIX && bytes[1] == SOI {
        Some(2)
    } else {
        None
    }
}

/// Reads the marker at `pos`, skipping FF fill bytes. Returns the marker
/// byte and the offset of its payload.
fn next_marker(bytes: &[u8], mut pos: usize) -> Option<(u8, usize)> {
    if *bytes.get(pos)? != MARKER_PREFIX {
        return None;
    }
    while *bytes.get(pos + 1)? == MARKER_PREFIX {
        pos += 1;
    }
    Some((bytes[pos + 1], pos + 2))
}

/// Advances past the segment whose marker payload starts at `payload`.
fn skip_segment(bytes: &[u8], marker: u8, payload: usize) -> Option<usize> {
    if is_standalone(marker) {
        return Some(payload);
    }
    let length = read_u16(bytes, payload)?;
    if length < 2 {
        return None;
    }
    payload.checked_add(usize::from(length))
}

fn is_standalone(marker: u8) -> bool {
    matches!(marker, SOI | TEM | 0xD0..=0xD7)
}

fn is_sof(marker: u8) -> bool {
    // every SOFn except DHT (C4), JPG (C8), and DAC (CC)
    matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

fn read_u16(bytes: &[u8], pos: usize) -> Option<u16> {
    let hi = *bytes.get(pos)?;
    let lo = *bytes.get(pos + 1)?;
    Some(u16::from_be_bytes([hi, lo]))
}
