//! Variable-length quantities as used by MIDI delta times and meta lengths.
//!
//! Seven bits per byte, most significant group first, high bit set on every
//! byte except the last. MIDI caps them at four bytes (28 bits).

use stickwork_core::{Error, Result};

pub const MAX_BYTES: usize = 4;
pub const MAX_VALUE: u32 = 0x0FFF_FFFF;

/// Read a quantity starting at `pos`, never looking at bytes at or past `end`.
///
/// Returns the value and the position just after it.
pub fn read(data: &[u8], pos: usize, end: usize) -> Result<(u32, usize)> {
    let end = end.min(data.len());
    let mut value: u32 = 0;
    let mut cursor = pos;

    for _ in 0..MAX_BYTES {
        if cursor >= end {
            return Err(Error::TruncatedFile {
                offset: cursor,
                needed: 1,
                available: 0,
            });
        }
        let byte = data[cursor];
        cursor += 1;
        value = (value << 7) | u32::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Ok((value, cursor));
        }
    }

    Err(Error::InvalidVarLen { offset: pos })
}

/// Append the shortest encoding of `value`. Bits above the 28-bit limit are dropped.
pub fn write(out: &mut Vec<u8>, value: u32) {
    debug_assert!(value <= MAX_VALUE, "VLQ value {} exceeds 28 bits", value);
    let mut value = value & MAX_VALUE;
    if value == 0 {
        out.push(0);
        return;
    }

    let mut buf = [0u8; MAX_BYTES];
    let mut len = 0;
    while value > 0 {
        buf[len] = (value & 0x7F) as u8;
        if len > 0 {
            buf[len] |= 0x80;
        }
        value >>= 7;
        len += 1;
    }
    out.extend(buf[..len].iter().rev());
}

/// Number of bytes `write` would produce
pub fn encoded_len(value: u32) -> usize {
    match value & MAX_VALUE {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        _ => 4,
    }
}
