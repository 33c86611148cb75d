//! Unsigned LEB128 varints.
//!
//! A varint is at most 10 bytes; a continuation that would shift past
//! 64 bits is a protocol error rather than a silent wrap.

use arcdb_core::{CoreError, CoreResult};
use bytes::{Buf, BufMut};

/// Appends `value` as an unsigned LEB128 varint.
pub fn write_varint(buf: &mut impl BufMut, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Reads an unsigned LEB128 varint.
///
/// # Errors
///
/// Returns `Protocol` when the buffer ends mid-varint or the encoding
/// runs past 64 bits.
pub fn read_varint(buf: &mut impl Buf) -> CoreResult<u64> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        if !buf.has_remaining() {
            return Err(CoreError::protocol("truncated varint"));
        }
        if shift >= 64 {
            return Err(CoreError::protocol("varint exceeds 64 bits"));
        }
        let byte = buf.get_u8();
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

/// Number of bytes `value` occupies as a varint.
#[must_use]
pub fn varint_len(value: u64) -> usize {
    // 1 byte per started 7-bit group.
    (64 - value.max(1).leading_zeros() as usize).div_ceil(7)
}
