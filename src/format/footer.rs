// src/format/footer.rs

//! File footer and fixed-size trailer.
//!
//! ```text
//! "PQTF" | column chunks ... | footer | footer_offset u64 | footer_len u32 | footer_crc u32 | "PQTF"
//! ```
//!
//! Every integer is little-endian. Decoding errors report the absolute file
//! offset of the byte that failed validation.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{EngineError, Result};
use crate::format::compression::Compression;
use crate::table::{Field, LogicalType, Schema};

pub const MAGIC: &[u8; 4] = b"PQTF";
pub const FORMAT_VERSION: u16 = 1;
pub const TRAILER_LEN: usize = 20;

/// Location and shape of one column inside one row group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnChunkMeta {
    pub offset: u64,
    pub compressed_len: u64,
    pub uncompressed_len: u64,
    pub compression: Compression,
    pub null_count: u64,
    /// CRC-32 of the stored (compressed) bytes.
    pub crc32: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowGroupMeta {
    pub num_rows: u64,
    pub columns: Vec<ColumnChunkMeta>,
}

impl RowGroupMeta {
    pub fn compressed_size(&self) -> u64 {
        self.columns.iter().map(|c| c.compressed_len).sum()
    }

    pub fn uncompressed_size(&self) -> u64 {
        self.columns.iter().map(|c| c.uncompressed_len).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footer {
    pub version: u16,
    pub created_by: String,
    pub num_rows: u64,
    pub schema: Schema,
    pub row_groups: Vec<RowGroupMeta>,
}

impl Footer {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(256);
        buf.put_u16_le(self.version);
        put_str(&mut buf, &self.created_by);
        buf.put_u64_le(self.num_rows);

        buf.put_u32_le(self.schema.len() as u32);
        for field in &self.schema.fields {
            put_str(&mut buf, &field.name);
            buf.put_u8(field.logical_type.tag());
        }

        buf.put_u32_le(self.row_groups.len() as u32);
        for rg in &self.row_groups {
            buf.put_u64_le(rg.num_rows);
            for chunk in &rg.columns {
                buf.put_u64_le(chunk.offset);
                buf.put_u64_le(chunk.compressed_len);
                buf.put_u64_le(chunk.uncompressed_len);
                buf.put_u8(chunk.compression.tag());
                buf.put_u64_le(chunk.null_count);
                buf.put_u32_le(chunk.crc32);
            }
        }
        buf.freeze()
    }

    /// Parse footer bytes that start at absolute file offset `base`.
    pub fn decode(data: &[u8], base: u64) -> Result<Footer> {
        let mut cur = Cursor { data, pos: 0, base };

        let version_at = cur.offset();
        let version = cur.u16()?;
        if version != FORMAT_VERSION {
            return Err(EngineError::corrupt(
                version_at,
                format!("unsupported format version {version}"),
            ));
        }
        let created_by = cur.string()?;
        let num_rows = cur.u64()?;

        let num_columns = cur.u32()? as usize;
        let mut fields = Vec::with_capacity(num_columns.min(4096));
        for _ in 0..num_columns {
            let name = cur.string()?;
            let tag_at = cur.offset();
            let tag = cur.u8()?;
            let logical_type = LogicalType::from_tag(tag)
                .ok_or_else(|| EngineError::corrupt(tag_at, format!("unknown type tag {tag}")))?;
            fields.push(Field::new(name, logical_type));
        }

        let num_row_groups = cur.u32()? as usize;
        let mut row_groups = Vec::with_capacity(num_row_groups.min(4096));
        let mut rows_seen = 0u64;
        for _ in 0..num_row_groups {
            let rg_rows = cur.u64()?;
            let mut columns = Vec::with_capacity(num_columns);
            for _ in 0..num_columns {
                let offset = cur.u64()?;
                let compressed_len = cur.u64()?;
                let uncompressed_len = cur.u64()?;
                let codec_at = cur.offset();
                let tag = cur.u8()?;
                let compression = Compression::from_tag(tag).ok_or_else(|| {
                    EngineError::corrupt(codec_at, format!("unknown codec tag {tag}"))
                })?;
                let null_count = cur.u64()?;
                let crc32 = cur.u32()?;
                columns.push(ColumnChunkMeta {
                    offset,
                    compressed_len,
                    uncompressed_len,
                    compression,
                    null_count,
                    crc32,
                });
            }
            rows_seen = rows_seen.saturating_add(rg_rows);
            row_groups.push(RowGroupMeta {
                num_rows: rg_rows,
                columns,
            });
        }

        if cur.pos != data.len() {
            return Err(EngineError::corrupt(
                cur.offset(),
                format!("{} unexpected bytes at end of footer", data.len() - cur.pos),
            ));
        }
        if rows_seen != num_rows {
            return Err(EngineError::corrupt(
                base,
                format!("footer claims {num_rows} rows but row groups hold {rows_seen}"),
            ));
        }

        Ok(Footer {
            version,
            created_by,
            num_rows,
            schema: Schema::new(fields),
            row_groups,
        })
    }
}

/// The fixed 20 bytes at the very end of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    pub footer_offset: u64,
    pub footer_len: u32,
    pub footer_crc: u32,
}

impl Trailer {
    pub fn encode(&self) -> [u8; TRAILER_LEN] {
        let mut out = [0u8; TRAILER_LEN];
        out[0..8].copy_from_slice(&self.footer_offset.to_le_bytes());
        out[8..12].copy_from_slice(&self.footer_len.to_le_bytes());
        out[12..16].copy_from_slice(&self.footer_crc.to_le_bytes());
        out[16..20].copy_from_slice(MAGIC);
        out
    }

    /// Validate and parse a trailer read from absolute offset `at`.
    /// `file_len` bounds the footer it points to.
    pub fn decode(bytes: &[u8; TRAILER_LEN], at: u64, file_len: u64) -> Result<Trailer> {
        if &bytes[16..20] != MAGIC {
            return Err(EngineError::corrupt(at + 16, "bad trailing magic bytes"));
        }
        let mut fields = &bytes[..16];
        let footer_offset = fields.get_u64_le();
        let footer_len = fields.get_u32_le();
        let footer_crc = fields.get_u32_le();

        let data_start = MAGIC.len() as u64;
        let footer_end = footer_offset.checked_add(footer_len as u64);
        if footer_offset < data_start || footer_end != Some(at) {
            return Err(EngineError::corrupt(
                at,
                format!(
                    "footer range {footer_offset}+{footer_len} does not end at the trailer ({at}, file length {file_len})"
                ),
            ));
        }

        Ok(Trailer {
            footer_offset,
            footer_len,
            footer_crc,
        })
    }
}

fn put_str(buf: &mut BytesMut, s: &str) {
    buf.put_u32_le(s.len() as u32);
    buf.put_slice(s.as_bytes());
}

/// Bounds-checked reader over footer bytes.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    base: u64,
}

impl<'a> Cursor<'a> {
    fn offset(&self) -> u64 {
        self.base + self.pos as u64
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|&end| end <= self.data.len());
        match end {
            Some(end) => {
                let out = &self.data[self.pos..end];
                self.pos = end;
                Ok(out)
            }
            None => Err(EngineError::corrupt(
                self.offset(),
                format!(
                    "footer truncated: need {len} bytes, have {}",
                    self.data.len() - self.pos
                ),
            )),
        }
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(self.take(2)?.get_u16_le())
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(self.take(4)?.get_u32_le())
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(self.take(8)?.get_u64_le())
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let at = self.offset();
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec())
            .map_err(|e| EngineError::corrupt(at, format!("invalid UTF-8 in footer: {e}")))
    }
}
