// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Locates JPEG streams embedded in arbitrary bytes
//!
//! Camera RAW containers keep one or more JPEG previews somewhere in the file.
//! Instead of pairing the first `FF D8` with the first `FF D9` (which cuts a
//! preview short at the end of its own EXIF thumbnail), we walk the marker
//! segments of each candidate so nested thumbnails are skipped by length.

use std::ops::Range;

const MARKER: u8 = 0xFF;
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const TEM: u8 = 0x01;

/// Upper bound on start-of-image probes in one buffer
const MAX_SOI_PROBES: usize = 4096;

fn is_rst(marker: u8) -> bool {
    (0xD0..=0xD7).contains(&marker)
}

/// End offset (exclusive) of the JPEG stream starting at `start`, if it is well formed
pub fn jpeg_extent(data: &[u8], start: usize) -> Option<usize> {
    let len = data.len();
    if data.get(start..start + 2)? != [MARKER, SOI] {
        return None;
    }

    let mut pos = start + 2;
    loop {
        if *data.get(pos)? != MARKER {
            return None;
        }
        while pos < len && data[pos] == MARKER {
            pos += 1;
        }
        let marker = *data.get(pos)?;
        pos += 1;

        match marker {
            EOI => return Some(pos),
            TEM => continue,
            m if is_rst(m) => continue,
            SOI | 0x00 => return None,
            _ => {
                let hi = *data.get(pos)?;
                let lo = *data.get(pos + 1)?;
                let seg_len = u16::from_be_bytes([hi, lo]) as usize;
                if seg_len < 2 {
                    return None;
                }
                pos += seg_len;
                if pos > len {
                    return None;
                }
                if marker == SOS {
                    pos = skip_entropy_data(data, pos)?;
                }
            }
        }
    }
}

/// Advance past entropy-coded data to the next real marker
fn skip_entropy_data(data: &[u8], mut pos: usize) -> Option<usize> {
    let len = data.len();
    while pos + 1 < len {
        if data[pos] != MARKER {
            pos += 1;
            continue;
        }
        let next = data[pos + 1];
        if next == 0x00 || is_rst(next) {
            pos += 2;
        } else if next == MARKER {
            pos += 1;
        } else {
            return Some(pos);
        }
    }
    None
}

/// All well-formed top-level JPEG streams in `data`, in file order
pub fn find_embedded_jpegs(data: &[u8]) -> Vec<Range<usize>> {
    let mut found = Vec::new();
    let mut probes = 0;
    let mut i = 0;

    while i + 3 <= data.len() && probes < MAX_SOI_PROBES {
        if data[i] == MARKER && data[i + 1] == SOI && data[i + 2] == MARKER {
            probes += 1;
            if let Some(end) = jpeg_extent(data, i) {
                found.push(i..end);
                i = end;
                continue;
            }
        }
        i += 1;
    }

    found
}

/// True when `bytes` begin with a JPEG start-of-image marker
pub fn starts_with_soi(bytes: &[u8]) -> bool {
    bytes.len() >= 3 && bytes[0] == MARKER && bytes[1] == SOI && bytes[2] == MARKER
}
