//! # Column Value Parsing
//!
//! Per-type decoding of column bytes into [`Value`]s. The storage transforms
//! here are what make keys memcmp-ordered on disk:
//!
//! - signed integers are stored big-endian with a sign-bit bias
//!   (`stored = value + 2^(8w-1)`), so decoding subtracts the bias
//! - unsigned integers are plain big-endian
//! - FLOAT/DOUBLE are IEEE-754 big-endian
//! - `CHAR` under a single-byte charset is space-padded to its declared
//!   width; the padding is trimmed on decode
//! - binary types come back raw

use eyre::{bail, Result};

use crate::record::PageCursor;
use crate::types::{Charset, ColumnDef, ColumnType, Value};

/// Decodes one fixed-length value, consuming its bytes from the cursor.
pub fn read_fixed(cursor: &mut PageCursor<'_>, column: &ColumnDef, charset: Charset) -> Result<Value> {
    let ty = column.column_type();
    match ty {
        ColumnType::TinyInt
        | ColumnType::SmallInt
        | ColumnType::MediumInt
        | ColumnType::Int
        | ColumnType::BigInt => {
            let width = ty.fixed_size().unwrap();
            let raw = read_be_uint(cursor, width)?;
            if column.is_unsigned() {
                Ok(Value::UInt(raw))
            } else {
                Ok(Value::Int(decode_signed(raw, width)))
            }
        }
        ColumnType::Float => {
            let bytes: [u8; 4] = cursor.read_bytes(4)?.try_into().unwrap();
            Ok(Value::Float(f32::from_be_bytes(bytes) as f64))
        }
        ColumnType::Double => {
            let bytes: [u8; 8] = cursor.read_bytes(8)?.try_into().unwrap();
            Ok(Value::Float(f64::from_be_bytes(bytes)))
        }
        ColumnType::Char => {
            let width = match column.fixed_byte_length(charset) {
                Some(w) => w,
                None => bail!("CHAR column {:?} is not fixed-length here", column.name()),
            };
            let bytes = cursor.read_bytes(width)?;
            let trimmed = trim_char_padding(bytes);
            Ok(Value::Text(charset.decode(trimmed)?))
        }
        ColumnType::Binary => {
            let width = column
                .declared_length()
                .map(|n| n as usize)
                .unwrap_or_default();
            Ok(Value::Bytes(cursor.read_bytes(width)?.to_vec()))
        }
        _ => bail!("column type {:?} has no fixed-length encoding", ty),
    }
}

/// Decodes one variable-length value of `length` bytes from the cursor.
pub fn read_variable(
    cursor: &mut PageCursor<'_>,
    column: &ColumnDef,
    length: usize,
    charset: Charset,
) -> Result<Value> {
    let bytes = cursor.read_bytes(length)?;
    decode_bytes(column, bytes, charset)
}

/// Turns assembled column bytes (possibly from an overflow chain) into a
/// value, using the column's character semantics.
pub fn decode_bytes(column: &ColumnDef, bytes: &[u8], charset: Charset) -> Result<Value> {
    if column.column_type().is_character() {
        Ok(Value::Text(charset.decode(bytes)?))
    } else {
        Ok(Value::Bytes(bytes.to_vec()))
    }
}

fn read_be_uint(cursor: &mut PageCursor<'_>, width: usize) -> Result<u64> {
    let bytes = cursor.read_bytes(width)?;
    let mut raw = 0u64;
    for &b in bytes {
        raw = (raw << 8) | b as u64;
    }
    Ok(raw)
}

/// Removes the sign-bit bias from a stored signed integer: flip the top bit
/// of the stored width, then sign-extend to 64 bits.
fn decode_signed(raw: u64, width: usize) -> i64 {
    let bits = 8 * width as u32;
    let flipped = raw ^ (1u64 << (bits - 1));
    let shift = 64 - bits;
    ((flipped << shift) as i64) >> shift
}

/// CHAR values are right-padded with 0x20 to their fixed width.
fn trim_char_padding(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|&b| b != b' ')
        .map_or(0, |i| i + 1);
    &bytes[..end]
}
