// src/format/writer.rs

use std::fs;
use std::io::{BufWriter, Write};
use std::ops::Range;
use std::path::Path;

use rayon::prelude::*;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

use crate::error::{EngineError, Result};
use crate::format::compression::Compression;
use crate::format::encoding::encode_column;
use crate::format::footer::{ColumnChunkMeta, Footer, RowGroupMeta, Trailer, FORMAT_VERSION, MAGIC};
use crate::table::Table;

/// Knobs for encoding a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    pub compression: Compression,
    /// Rows per row group. `None` writes a single row group.
    pub row_group_size: Option<usize>,
    /// Producer tag stored in the footer.
    pub created_by: String,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            compression: Compression::default(),
            row_group_size: None,
            created_by: default_created_by(),
        }
    }
}

impl WriteOptions {
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_row_group_size(mut self, rows: Option<usize>) -> Self {
        self.row_group_size = rows.filter(|&n| n > 0);
        self
    }
}

pub fn default_created_by() -> String {
    format!("parquet-tools version {}", env!("CARGO_PKG_VERSION"))
}

/// Encode `table` into an in-memory file image.
pub fn encode_table(table: &Table, options: &WriteOptions) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_to(&mut out, table, options)?;
    Ok(out)
}

/// Write `table` to `path`.
///
/// The bytes go to a temporary file in the same directory which is renamed
/// over `path` only once the trailer is written, so a failure never leaves a
/// half-written output behind.
#[instrument(level = "debug", skip_all, fields(path = %path.display(), rows = table.num_rows()))]
pub fn write_table(path: &Path, table: &Table, options: &WriteOptions) -> Result<Footer> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let tmp = NamedTempFile::new_in(dir)?;
    let footer = {
        let mut writer = BufWriter::new(tmp.as_file());
        let footer = write_to(&mut writer, table, options)?;
        writer.flush()?;
        footer
    };
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| EngineError::Io(e.error))?;

    info!(
        path = %path.display(),
        rows = footer.num_rows,
        row_groups = footer.row_groups.len(),
        codec = %options.compression,
        "wrote table"
    );
    Ok(footer)
}

/// Stream the full file image of `table` into `out` and return its footer.
pub fn write_to<W: Write>(mut out: W, table: &Table, options: &WriteOptions) -> Result<Footer> {
    out.write_all(MAGIC)?;
    let mut offset = MAGIC.len() as u64;

    let mut row_groups = Vec::new();
    for range in row_group_ranges(table.num_rows(), options.row_group_size) {
        let slice = table.slice(range.start, range.len());

        // compress columns in parallel, write them in table order
        let chunks = slice
            .iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|(_, column)| {
                let raw = encode_column(column)?;
                let stored = options.compression.compress(&raw)?;
                Ok((raw.len() as u64, column.null_count() as u64, stored))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut columns = Vec::with_capacity(chunks.len());
        for (uncompressed_len, null_count, stored) in chunks {
            out.write_all(&stored)?;
            columns.push(ColumnChunkMeta {
                offset,
                compressed_len: stored.len() as u64,
                uncompressed_len,
                compression: options.compression,
                null_count,
                crc32: crc32fast::hash(&stored),
            });
            offset += stored.len() as u64;
        }

        debug!(rows = range.len(), start = range.start, "encoded row group");
        row_groups.push(RowGroupMeta {
            num_rows: range.len() as u64,
            columns,
        });
    }

    let footer = Footer {
        version: FORMAT_VERSION,
        created_by: options.created_by.clone(),
        num_rows: table.num_rows() as u64,
        schema: table.schema(),
        row_groups,
    };
    let footer_bytes = footer.encode();
    out.write_all(&footer_bytes)?;

    let trailer = Trailer {
        footer_offset: offset,
        footer_len: footer_bytes.len() as u32,
        footer_crc: crc32fast::hash(&footer_bytes),
    };
    out.write_all(&trailer.encode())?;
    out.flush()?;

    Ok(footer)
}

/// Split `num_rows` into consecutive row-group ranges. An empty table has no
/// row groups.
fn row_group_ranges(num_rows: usize, row_group_size: Option<usize>) -> Vec<Range<usize>> {
    if num_rows == 0 {
        return Vec::new();
    }
    let size = row_group_size.filter(|&n| n > 0).unwrap_or(num_rows);
    (0..num_rows)
        .step_by(size)
        .map(|start| start..(start + size).min(num_rows))
        .collect()
}
