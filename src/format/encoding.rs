// src/format/encoding.rs

//! Plain encoding of one column chunk, before compression.
//!
//! Layout:
//! - validity flag `u8`: 0 = no nulls, 1 = LSB-first bitmap follows (1 = present)
//! - values, `n` slots, nulls stored as zero / empty:
//!   - int64, timestamp: `i64` LE
//!   - date: `i32` LE
//!   - float64: IEEE-754 bits as `u64` LE
//!   - boolean: LSB-first bit-packed
//!   - string: `n + 1` `u32` LE offsets, then the UTF-8 bytes

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{EngineError, Result};
use crate::table::{Column, LogicalType};

/// Decode failures carry a reason; the reader attaches the chunk offset.
pub type DecodeResult<T> = std::result::Result<T, String>;

/// Fails when a string chunk holds more bytes than a `u32` offset can address.
pub fn encode_column(column: &Column) -> Result<Bytes> {
    let n = column.len();
    let mut buf = BytesMut::with_capacity(1 + n.div_ceil(8) + n * 8);

    if column.null_count() == 0 {
        buf.put_u8(0);
    } else {
        buf.put_u8(1);
        put_bits(&mut buf, (0..n).map(|row| !column.is_null(row)));
    }

    match column {
        Column::Int64(v) | Column::Timestamp(v) => {
            for x in v {
                buf.put_i64_le(x.unwrap_or_default());
            }
        }
        Column::Date(v) => {
            for x in v {
                buf.put_i32_le(x.unwrap_or_default());
            }
        }
        Column::Float64(v) => {
            for x in v {
                buf.put_u64_le(x.unwrap_or_default().to_bits());
            }
        }
        Column::Boolean(v) => put_bits(&mut buf, v.iter().map(|x| x.unwrap_or(false))),
        Column::String(v) => {
            let mut offset = 0u32;
            buf.put_u32_le(offset);
            for s in v {
                offset = string_offset(offset, s.as_deref().map_or(0, str::len))?;
                buf.put_u32_le(offset);
            }
            for s in v.iter().flatten() {
                buf.put_slice(s.as_bytes());
            }
        }
    }

    Ok(buf.freeze())
}

fn string_offset(offset: u32, len: usize) -> Result<u32> {
    u32::try_from(len)
        .ok()
        .and_then(|len| offset.checked_add(len))
        .ok_or_else(|| {
            EngineError::InvalidTable(
                "column chunk exceeds 4 GiB of string data; use a smaller row group size"
                    .to_string(),
            )
        })
}

pub fn decode_column(ty: LogicalType, num_rows: usize, data: &[u8]) -> DecodeResult<Column> {
    let mut buf = data;

    need(&buf, 1, "validity flag")?;
    let validity = match buf.get_u8() {
        0 => None,
        1 => Some(take_bits(&mut buf, num_rows, "validity bitmap")?),
        other => return Err(format!("invalid validity flag {other}")),
    };
    let present = |row: usize| validity.as_ref().map_or(true, |bits| bits[row]);

    let column = match ty {
        LogicalType::Int64 | LogicalType::Timestamp => {
            need(&buf, width(num_rows, 8, "int64 values")?, "int64 values")?;
            let values: Vec<Option<i64>> = (0..num_rows)
                .map(|row| {
                    let x = buf.get_i64_le();
                    present(row).then_some(x)
                })
                .collect();
            if ty == LogicalType::Int64 {
                Column::Int64(values)
            } else {
                Column::Timestamp(values)
            }
        }
        LogicalType::Date => {
            need(&buf, width(num_rows, 4, "date values")?, "date values")?;
            Column::Date(
                (0..num_rows)
                    .map(|row| {
                        let x = buf.get_i32_le();
                        present(row).then_some(x)
                    })
                    .collect(),
            )
        }
        LogicalType::Float64 => {
            need(&buf, width(num_rows, 8, "float64 values")?, "float64 values")?;
            Column::Float64(
                (0..num_rows)
                    .map(|row| {
                        let x = f64::from_bits(buf.get_u64_le());
                        present(row).then_some(x)
                    })
                    .collect(),
            )
        }
        LogicalType::Boolean => {
            let bits = take_bits(&mut buf, num_rows, "boolean values")?;
            Column::Boolean(
                bits.into_iter()
                    .enumerate()
                    .map(|(row, b)| present(row).then_some(b))
                    .collect(),
            )
        }
        LogicalType::String => {
            let slots = num_rows
                .checked_add(1)
                .ok_or_else(|| format!("row count {num_rows} overflows string offsets"))?;
            need(&buf, width(slots, 4, "string offsets")?, "string offsets")?;
            let offsets: Vec<usize> = (0..=num_rows).map(|_| buf.get_u32_le() as usize).collect();
            let total = offsets[num_rows];
            need(&buf, total, "string bytes")?;
            let bytes = &buf[..total];
            let mut values = Vec::with_capacity(num_rows);
            for row in 0..num_rows {
                let (start, end) = (offsets[row], offsets[row + 1]);
                if start > end || end > total {
                    return Err(format!("string offsets out of order at row {row}"));
                }
                if !present(row) {
                    values.push(None);
                    continue;
                }
                let s = std::str::from_utf8(&bytes[start..end])
                    .map_err(|e| format!("invalid UTF-8 at row {row}: {e}"))?;
                values.push(Some(s.to_string()));
            }
            buf.advance(total);
            Column::String(values)
        }
    };

    if buf.has_remaining() {
        return Err(format!("{} trailing bytes after column data", buf.remaining()));
    }
    Ok(column)
}

/// `count * size`, or an error when a footer row count cannot fit in memory.
fn width(count: usize, size: usize, what: &str) -> DecodeResult<usize> {
    count
        .checked_mul(size)
        .ok_or_else(|| format!("{what}: row count {count} overflows the chunk size"))
}

fn need(buf: &&[u8], len: usize, what: &str) -> DecodeResult<()> {
    if buf.remaining() < len {
        return Err(format!(
            "truncated {what}: need {len} bytes, have {}",
            buf.remaining()
        ));
    }
    Ok(())
}

fn put_bits(buf: &mut BytesMut, bits: impl Iterator<Item = bool>) {
    let mut byte = 0u8;
    let mut used = 0;
    for bit in bits {
        if bit {
            byte |= 1 << used;
        }
        used += 1;
        if used == 8 {
            buf.put_u8(byte);
            byte = 0;
            used = 0;
        }
    }
    if used > 0 {
        buf.put_u8(byte);
    }
}

fn take_bits(buf: &mut &[u8], count: usize, what: &str) -> DecodeResult<Vec<bool>> {
    let len = count.div_ceil(8);
    need(buf, len, what)?;
    let bits = (0..count)
        .map(|i| buf[i / 8] & (1 << (i % 8)) != 0)
        .collect();
    buf.advance(len);
    Ok(bits)
}
