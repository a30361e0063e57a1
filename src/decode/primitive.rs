// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Little-endian primitive reads over a borrowed buffer.
//!
//! SBE fields are addressed by absolute offset rather than by stream
//! position, so the codec is a set of checked `(buffer, offset)` reads.
//! No allocation; char arrays are returned as borrowed slices.

use byteorder::{ByteOrder, LittleEndian};

use crate::core::{CodecError, Result};

#[inline]
fn check(buf: &[u8], offset: usize, len: usize) -> Result<()> {
    if offset.checked_add(len).map_or(true, |end| end > buf.len()) {
        return Err(CodecError::decode(
            offset,
            format!(
                "read of {len} bytes past end of buffer ({} bytes)",
                buf.len()
            ),
        ));
    }
    Ok(())
}

/// Read a single byte.
#[inline]
pub fn read_u8(buf: &[u8], offset: usize) -> Result<u8> {
    check(buf, offset, 1)?;
    Ok(buf[offset])
}

/// Read a signed byte.
#[inline]
pub fn read_i8(buf: &[u8], offset: usize) -> Result<i8> {
    Ok(read_u8(buf, offset)? as i8)
}

/// Read a u16 value.
#[inline]
pub fn read_u16(buf: &[u8], offset: usize) -> Result<u16> {
    check(buf, offset, 2)?;
    Ok(LittleEndian::read_u16(&buf[offset..offset + 2]))
}

/// Read an i16 value.
#[inline]
pub fn read_i16(buf: &[u8], offset: usize) -> Result<i16> {
    Ok(read_u16(buf, offset)? as i16)
}

/// Read a u32 value.
#[inline]
pub fn read_u32(buf: &[u8], offset: usize) -> Result<u32> {
    check(buf, offset, 4)?;
    Ok(LittleEndian::read_u32(&buf[offset..offset + 4]))
}

/// Read an i32 value.
#[inline]
pub fn read_i32(buf: &[u8], offset: usize) -> Result<i32> {
    Ok(read_u32(buf, offset)? as i32)
}

/// Read a u64 value.
#[inline]
pub fn read_u64(buf: &[u8], offset: usize) -> Result<u64> {
    check(buf, offset, 8)?;
    Ok(LittleEndian::read_u64(&buf[offset..offset + 8]))
}

/// Read an i64 value.
#[inline]
pub fn read_i64(buf: &[u8], offset: usize) -> Result<i64> {
    Ok(read_u64(buf, offset)? as i64)
}

/// Read an f32 value.
#[inline]
pub fn read_f32(buf: &[u8], offset: usize) -> Result<f32> {
    check(buf, offset, 4)?;
    Ok(LittleEndian::read_f32(&buf[offset..offset + 4]))
}

/// Read an f64 value.
#[inline]
pub fn read_f64(buf: &[u8], offset: usize) -> Result<f64> {
    check(buf, offset, 8)?;
    Ok(LittleEndian::read_f64(&buf[offset..offset + 8]))
}

/// Read a fixed-length byte slice (char arrays).
#[inline]
pub fn read_bytes(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    check(buf, offset, len)?;
    Ok(&buf[offset..offset + len])
}
