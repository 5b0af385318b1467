//! Byte-level CBOR framing: header bytes, variable-length arguments and the
//! fixed one-byte simple values.
//!
//! For details of the representation, see RFC 8949 section 3.

use crate::error::Result;
use std::io::Write;

// CBOR major types
pub(crate) const MAJOR_UNSIGNED: u8 = 0;
pub(crate) const MAJOR_NEGATIVE: u8 = 1;
pub(crate) const MAJOR_BYTES: u8 = 2;
pub(crate) const MAJOR_TEXT: u8 = 3;
pub(crate) const MAJOR_ARRAY: u8 = 4;
pub(crate) const MAJOR_MAP: u8 = 5;
pub(crate) const MAJOR_TAG: u8 = 6;
pub(crate) const MAJOR_SIMPLE: u8 = 7;

// Additional info values
pub(crate) const ONE_BYTE: u8 = 24;
pub(crate) const TWO_BYTES: u8 = 25;
pub(crate) const FOUR_BYTES: u8 = 26;
pub(crate) const EIGHT_BYTES: u8 = 27;
pub(crate) const INDEFINITE: u8 = 31;

// Complete single-byte items
pub(crate) const FALSE: u8 = 0xf4;
pub(crate) const TRUE: u8 = 0xf5;
pub(crate) const NULL: u8 = 0xf6;
pub(crate) const UNDEFINED: u8 = 0xf7;
pub(crate) const NEXT_HALF: u8 = 0xf9;
pub(crate) const NEXT_FLOAT: u8 = 0xfa;
pub(crate) const NEXT_DOUBLE: u8 = 0xfb;
pub(crate) const EMPTY_MAP: u8 = 0xa0;
pub(crate) const BEGIN_ARRAY: u8 = 0x9f;
pub(crate) const BEGIN_MAP: u8 = 0xbf;
pub(crate) const BREAK: u8 = 0xff;

/// Upper bound for declared byte, text and array lengths.
pub(crate) const MAX_LENGTH: u64 = i32::MAX as u64;
/// Upper bound for declared map lengths (key/value pairs).
pub(crate) const MAX_MAP_PAIRS: u64 = (i32::MAX / 2) as u64;

#[inline]
pub(crate) fn major_type(header: u8) -> u8 {
    header >> 5
}

#[inline]
pub(crate) fn additional_info(header: u8) -> u8 {
    header & 0x1f
}

/// Number of argument bytes following a header, or `None` for reserved and
/// indefinite additional info values.
pub(crate) fn argument_width(info: u8) -> Option<usize> {
    match info {
        0..=23 => Some(0),
        ONE_BYTE => Some(1),
        TWO_BYTES => Some(2),
        FOUR_BYTES => Some(4),
        EIGHT_BYTES => Some(8),
        _ => None,
    }
}

/// Whether `header` opens an indefinite-length array, map, byte string or text string.
pub(crate) fn is_indefinite_start(header: u8) -> bool {
    additional_info(header) == INDEFINITE
        && matches!(
            major_type(header),
            MAJOR_BYTES | MAJOR_TEXT | MAJOR_ARRAY | MAJOR_MAP
        )
}

/// Human readable name of the item a header starts, used in diagnostics.
pub(crate) fn describe_major(major: u8) -> &'static str {
    match major {
        MAJOR_UNSIGNED => "unsigned integer",
        MAJOR_NEGATIVE => "negative integer",
        MAJOR_BYTES => "byte string",
        MAJOR_TEXT => "text string",
        MAJOR_ARRAY => "array",
        MAJOR_MAP => "map",
        MAJOR_TAG => "tag",
        _ => "simple value or float",
    }
}

/// Writes a header with the shortest argument encoding for `value`.
pub(crate) fn write_type_value<W: Write + ?Sized>(
    writer: &mut W,
    major: u8,
    value: u64,
) -> Result<()> {
    if value < 24 {
        writer.write_all(&[(major << 5) | value as u8])?;
    } else if value < 256 {
        writer.write_all(&[(major << 5) | ONE_BYTE, value as u8])?;
    } else if value < 65536 {
        writer.write_all(&[(major << 5) | TWO_BYTES])?;
        writer.write_all(&(value as u16).to_be_bytes())?;
    } else if value < 4294967296 {
        writer.write_all(&[(major << 5) | FOUR_BYTES])?;
        writer.write_all(&(value as u32).to_be_bytes())?;
    } else {
        writer.write_all(&[(major << 5) | EIGHT_BYTES])?;
        writer.write_all(&value.to_be_bytes())?;
    }
    Ok(())
}

pub(crate) fn write_text<W: Write + ?Sized>(writer: &mut W, value: &str) -> Result<()> {
    write_type_value(writer, MAJOR_TEXT, value.len() as u64)?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

pub(crate) fn write_bytes<W: Write + ?Sized>(writer: &mut W, value: &[u8]) -> Result<()> {
    write_type_value(writer, MAJOR_BYTES, value.len() as u64)?;
    writer.write_all(value)?;
    Ok(())
}

pub(crate) fn write_tag<W: Write + ?Sized>(writer: &mut W, tag: u64) -> Result<()> {
    write_type_value(writer, MAJOR_TAG, tag)
}

pub(crate) fn write_byte<W: Write + ?Sized>(writer: &mut W, byte: u8) -> Result<()> {
    writer.write_all(&[byte])?;
    Ok(())
}

pub(crate) fn write_bool<W: Write + ?Sized>(writer: &mut W, value: bool) -> Result<()> {
    write_byte(writer, if value { TRUE } else { FALSE })
}

pub(crate) fn write_f32<W: Write + ?Sized>(writer: &mut W, value: f32) -> Result<()> {
    writer.write_all(&[NEXT_FLOAT])?;
    writer.write_all(&value.to_bits().to_be_bytes())?;
    Ok(())
}

pub(crate) fn write_f64<W: Write + ?Sized>(writer: &mut W, value: f64) -> Result<()> {
    writer.write_all(&[NEXT_DOUBLE])?;
    writer.write_all(&value.to_bits().to_be_bytes())?;
    Ok(())
}

/// Widens an IEEE-754 half-precision bit pattern.
///
/// Zero, denormals, infinities and NaN payloads are carried over exactly.
pub(crate) fn f32_from_half_bits(bits: u16) -> f32 {
    half::f16::from_bits(bits).to_f32()
}
